//! The seam to the string-keyed system conversion facility.
//!
//! A [`Transcoder`] opens converters by encoding name; a [`Transcode`]
//! converts one short byte sequence at a time. The crate only ever feeds
//! single complete units (one legacy byte while probing an 8-bit table, a
//! two- or four-byte multibyte unit, or one UTF-8 sequence), so converters
//! may be stateful but are reset on conversion failure.

/// Opens converters between a named legacy encoding and UTF-8.
pub trait Transcoder {
    /// Open a converter from `encoding` to UTF-8. `None` when the facility
    /// does not recognise the name.
    fn open(&self, encoding: &str) -> Option<Box<dyn Transcode>>;

    /// Open a converter from UTF-8 to `encoding`. Facilities that cannot
    /// convert out of Unicode may leave this unimplemented.
    fn open_reverse(&self, encoding: &str) -> Option<Box<dyn Transcode>> {
        let _ = encoding;
        None
    }

    /// Whether the facility is usable at all. A facility that failed to
    /// load reports `false` and resolution degrades to built-in tables and
    /// placeholders.
    fn available(&self) -> bool {
        true
    }
}

/// One open conversion stream.
pub trait Transcode {
    /// Convert `input` in full, returning the converted bytes or `None`
    /// when any part of the input has no conversion.
    fn transcode(&mut self, input: &[u8]) -> Option<Vec<u8>>;
}

/// The absent facility: every open fails.
///
/// Used when the crate is built without the `iconv` feature or the facility
/// could not be loaded; table construction then falls through to the
/// built-in tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTranscoder;

impl Transcoder for NullTranscoder {
    fn open(&self, _encoding: &str) -> Option<Box<dyn Transcode>> {
        None
    }

    fn available(&self) -> bool {
        false
    }
}
