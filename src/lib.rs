//! Overview
//! --------
//! Charset mapping and locale-encoding resolution for terminal
//! locale-translation filters.
//!
//! You can use `termconv` to:
//!
//! - Resolve a locale or MIME charset name to ISO-2022 graphic-set
//!   designations (which character set occupies each of G0..G3, and which
//!   slots GL and GR invoke), or to a stateful non-ISO-2022 multibyte
//!   encoding such as Shift-JIS or GB18030
//! - Recode between a legacy 8-bit or multibyte encoding and Unicode
//!   scalars, in both directions, through tables built once and cached for
//!   the registry's lifetime
//!
//! Tables are built by probing a string-keyed conversion facility; with the
//! default `iconv` feature the system iconv library is loaded at runtime,
//! and a small set of DEC terminal charsets is compiled in. Everything
//! hangs off an explicit [`CharsetRegistry`] rather than process globals,
//! so tests and embedders get full isolation.
//!
//! The ISO-2022 shift-state stream parsing itself is out of scope: a parser
//! drives [`CharsetRegistry::resolve_by_final`] and the per-charset
//! [`Charset::recode`]/[`Charset::reverse`] operations with the codes it
//! extracts from the stream.

mod charset;
mod common;
mod conv;
mod locale;
mod report;

pub use charset::*;
pub use common::*;
pub use conv::*;
pub use locale::*;
pub use report::*;

pub mod prelude;
