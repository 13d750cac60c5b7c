pub use super::charset::{Charset, CharsetRegistry, CharsetType};
pub use super::conv::Transcoder as _;
pub use super::locale::{resolve_locale, LocaleState, ResolverOptions};
