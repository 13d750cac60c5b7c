//! Error taxonomy of the resolution and recoding paths.
//!
//! Resolution degrades to well-defined placeholders wherever it can, so the
//! error types here are deliberately small: a table build can fail (and the
//! failure is then sticky in the owning registry), and locale resolution can
//! fail outright when no catalog entry and no synthesized entry fits.

/// Failure to construct a [`RecodeTable`](crate::RecodeTable).
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum TableBuildError {
    /// The conversion facility does not recognise the encoding name, no
    /// alias remap helps, and no built-in table matches.
    #[display("no conversion available for encoding {name:?}")]
    UnknownEncoding { name: String },
}

/// Failure to resolve a locale or charset string to graphic-set designations.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum LocaleError {
    /// The process locale could not be resolved to a name at all.
    #[display("cannot resolve locale {locale:?}")]
    UnresolvedLocale { locale: String },
    /// The charset name matched no catalog entry, no prefix rewrite and no
    /// synthesizable single-byte encoding.
    #[display("unknown locale charset {charset:?}")]
    UnknownCharset { charset: String },
}

/// Result of a locale resolution.
pub type LocaleResult<T> = Result<T, LocaleError>;

/// Result of a table construction.
pub type TableResult<T> = Result<T, TableBuildError>;
