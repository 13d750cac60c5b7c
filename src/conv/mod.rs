mod builtin;
mod table;
mod transcoder;

#[cfg(feature = "iconv")]
mod iconv;

pub use table::*;
pub use transcoder::*;

#[cfg(feature = "iconv")]
pub use iconv::IconvTranscoder;

/// The default conversion facility: iconv when the feature is enabled and
/// the symbols resolve, the absent facility otherwise.
#[must_use]
pub fn system_transcoder() -> Box<dyn Transcoder> {
    #[cfg(feature = "iconv")]
    if let Some(facility) = IconvTranscoder::load() {
        return Box::new(facility);
    }
    Box::new(NullTranscoder)
}
