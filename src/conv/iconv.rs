//! iconv-backed conversion facility, loaded at runtime with `dlopen2`.
//!
//! The symbols are resolved from the running process first (glibc and musl
//! carry iconv in libc), then from the conventional library names. Nothing
//! links at compile time, so a build of this crate runs unchanged on systems
//! without a usable iconv; [`IconvTranscoder::load`] simply fails and the
//! caller falls back to [`NullTranscoder`](super::NullTranscoder).

use std::{
    ffi::CString,
    os::raw::{c_char, c_int, c_void},
    rc::Rc,
};

use dlopen2::wrapper::{Container, WrapperApi};

use super::transcoder::{Transcode, Transcoder};

#[derive(WrapperApi)]
struct IconvApi {
    iconv_open: unsafe extern "C" fn(tocode: *const c_char, fromcode: *const c_char) -> *mut c_void,
    iconv: unsafe extern "C" fn(
        cd: *mut c_void,
        inbuf: *mut *mut c_char,
        inbytesleft: *mut usize,
        outbuf: *mut *mut c_char,
        outbytesleft: *mut usize,
    ) -> usize,
    iconv_close: unsafe extern "C" fn(cd: *mut c_void) -> c_int,
}

/// Candidate libraries when the process itself does not export iconv.
const LIBRARY_NAMES: &[&str] = &["libc.so.6", "libiconv.so.2", "libiconv.so", "libiconv.dylib"];

/// A [`Transcoder`] backed by the system iconv library.
pub struct IconvTranscoder {
    api: Rc<Container<IconvApi>>,
}

impl std::fmt::Debug for IconvTranscoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconvTranscoder").finish_non_exhaustive()
    }
}

impl IconvTranscoder {
    /// Resolve the iconv symbols from the process or a system library.
    #[must_use]
    pub fn load() -> Option<Self> {
        let mut api = unsafe { Container::load_self() };
        for name in LIBRARY_NAMES {
            if api.is_ok() {
                break;
            }
            api = unsafe { Container::load(name) };
        }
        api.ok().map(|api| Self { api: Rc::new(api) })
    }

    fn open_pair(&self, to: &str, from: &str) -> Option<Box<dyn Transcode>> {
        let to = CString::new(to).ok()?;
        let from = CString::new(from).ok()?;
        let cd = unsafe { self.api.iconv_open(to.as_ptr(), from.as_ptr()) };
        if cd as isize == -1 {
            return None;
        }
        Some(Box::new(IconvConverter {
            api: Rc::clone(&self.api),
            cd,
        }))
    }
}

impl Transcoder for IconvTranscoder {
    fn open(&self, encoding: &str) -> Option<Box<dyn Transcode>> {
        self.open_pair("UTF-8", encoding)
    }

    fn open_reverse(&self, encoding: &str) -> Option<Box<dyn Transcode>> {
        self.open_pair(encoding, "UTF-8")
    }
}

struct IconvConverter {
    api: Rc<Container<IconvApi>>,
    cd: *mut c_void,
}

impl IconvConverter {
    /// Discard any pending shift state after a failed conversion.
    fn reset(&mut self) {
        unsafe {
            self.api.iconv(
                self.cd,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            );
        }
    }
}

impl Transcode for IconvConverter {
    fn transcode(&mut self, input: &[u8]) -> Option<Vec<u8>> {
        let mut in_copy = input.to_vec();
        let mut output = [0u8; 80];

        let mut in_ptr = in_copy.as_mut_ptr().cast::<c_char>();
        let mut in_left = in_copy.len();
        let mut out_ptr = output.as_mut_ptr().cast::<c_char>();
        let mut out_left = output.len();

        let rc = unsafe {
            self.api
                .iconv(self.cd, &mut in_ptr, &mut in_left, &mut out_ptr, &mut out_left)
        };
        if rc == usize::MAX || in_left != 0 {
            self.reset();
            return None;
        }
        Some(output[..output.len() - out_left].to_vec())
    }
}

impl Drop for IconvConverter {
    fn drop(&mut self) {
        unsafe {
            self.api.iconv_close(self.cd);
        }
    }
}
