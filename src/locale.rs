//! Locale and charset-name resolution to ISO-2022 graphic-set designations.
//!
//! A locale or MIME charset string is matched against the compiled-in
//! catalog below, falling back through a fixed list of prefix rewrites and,
//! when the conversion facility is available, a synthesized entry for
//! single-byte encodings the catalog does not list. The result names which
//! character set occupies each of G0..G3 and which slots GL and GR invoke;
//! single-shift semantics for composite encodings belong to the stream
//! parser, not here.

use std::{borrow::Cow, rc::Rc, sync::OnceLock};

use regex_lite::Regex;

use crate::{
    charset::{CatalogEntry, Charset, CharsetRegistry, CharsetType},
    common::{names_equal, names_equal_prefix, LocaleError, LocaleResult},
};

/// One compiled-in locale/charset assignment: either ISO-2022 graphic-set
/// designations or a single stateful multibyte encoding.
#[derive(Debug, Clone, Copy)]
pub struct LocaleCharsetEntry {
    /// Locale codeset or MIME charset name.
    pub name: &'static str,
    /// Which G-set GL invokes.
    pub gl: usize,
    /// Which G-set GR invokes.
    pub gr: usize,
    /// Character-set family names for G0..G3.
    pub g: [Option<&'static str>; 4],
    /// A non-ISO-2022 encoding name, exclusive with the G assignments.
    pub other: Option<&'static str>,
}

/// An 8-bit encoding in GR with ASCII in GL.
const fn right_half(name: &'static str, gr_set: &'static str) -> LocaleCharsetEntry {
    LocaleCharsetEntry {
        name,
        gl: 0,
        gr: 2,
        g: [Some("ASCII"), None, Some(gr_set), None],
        other: None,
    }
}

/// An EUC-style composite with up to three multibyte parts.
const fn euc(
    name: &'static str,
    g1: &'static str,
    g2: Option<&'static str>,
    g3: Option<&'static str>,
) -> LocaleCharsetEntry {
    LocaleCharsetEntry {
        name,
        gl: 0,
        gr: 1,
        g: [Some("ASCII"), Some(g1), g2, g3],
        other: None,
    }
}

/// A stateful multibyte encoding outside the ISO-2022 model.
const fn stateful(name: &'static str, encoding: &'static str) -> LocaleCharsetEntry {
    LocaleCharsetEntry {
        name,
        gl: 0,
        gr: 1,
        g: [None; 4],
        other: Some(encoding),
    }
}

/// The compiled-in locale catalog.
pub static LOCALE_CHARSETS: &[LocaleCharsetEntry] = &[
    right_half("C", "ISO 8859-1"),
    right_half("POSIX", "ISO 8859-1"),
    right_half("US-ASCII", "ISO 8859-1"),
    right_half("ISO8859-1", "ISO 8859-1"),
    right_half("ISO8859-2", "ISO 8859-2"),
    right_half("ISO8859-3", "ISO 8859-3"),
    right_half("ISO8859-4", "ISO 8859-4"),
    right_half("ISO8859-5", "ISO 8859-5"),
    right_half("ISO8859-6", "ISO 8859-6"),
    right_half("ISO8859-7", "ISO 8859-7"),
    right_half("ISO8859-8", "ISO 8859-8"),
    right_half("ISO8859-9", "ISO 8859-9"),
    right_half("ISO8859-10", "ISO 8859-10"),
    right_half("ISO8859-11", "ISO 8859-11"),
    right_half("TIS620", "ISO 8859-11"),
    right_half("ISO8859-13", "ISO 8859-13"),
    right_half("ISO8859-14", "ISO 8859-14"),
    right_half("ISO8859-15", "ISO 8859-15"),
    right_half("ISO8859-16", "ISO 8859-16"),
    right_half("KOI8-E", "KOI8-E"),
    right_half("KOI8-R", "KOI8-R"),
    right_half("KOI8-U", "KOI8-U"),
    right_half("KOI8-RU", "KOI8-RU"),
    right_half("CP1250", "CP 1250"),
    right_half("CP1251", "CP 1251"),
    right_half("CP1252", "CP 1252"),
    right_half("CP1255", "CP 1255"),
    right_half("CP437", "CP 437"),
    right_half("CP850", "CP 850"),
    right_half("CP852", "CP 852"),
    right_half("CP865", "CP 865"),
    right_half("CP866", "CP 866"),
    right_half("TCVN", "TCVN"),
    euc("GB2312", "GB 2312", None, None),
    euc("eucJP", "JIS X 0208", Some("JIS X 0201:GR"), Some("JIS X 0212")),
    euc("eucKR", "KSC 5601", None, None),
    euc("eucCN", "GB 2312", None, None),
    euc("eucTW", "CNS11643-1", Some("CNS11643-2"), Some("CNS11643-3")),
    euc("Big5", "Big 5", None, None),
    stateful("gbk", "GBK"),
    stateful("UTF-8", "UTF-8"),
    stateful("SJIS", "SJIS"),
    stateful("Big5-HKSCS", "BIG5-HKSCS"),
    stateful("gb18030", "GB18030"),
];

/// Ordered name-prefix rewrites applied when the catalog misses. The first
/// rewrite whose source prefix matches and whose rewritten name hits wins.
static PREFIXES: &[(&str, &str)] = &[
    ("ISO-", "ISO "),
    ("DEC ", "DEC-"),
    ("IBM-CP", "CP "),
    ("IBM", "CP "),
    ("MICROSOFT-CP", "CP "),
    ("MICROSOFT", "CP "),
    ("CP-", "CP "),
    ("ANSI", "CP "),
];

/// Resolution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverOptions {
    /// Treat the locale string itself as the charset name instead of
    /// resolving the process locale.
    pub ignore_locale: bool,
}

/// The graphic-set designations a locale resolves to.
#[derive(Debug)]
pub struct LocaleState {
    /// G-set index GL invokes.
    pub gl: usize,
    /// G-set index GR invokes.
    pub gr: usize,
    /// Resolved charsets for G0..G3; unassigned slots hold the unknown
    /// placeholder.
    pub g: [Rc<Charset>; 4],
    /// The stateful multibyte encoding, when the locale uses one.
    pub other: Option<Rc<Charset>>,
}

enum ResolvedEntry {
    Catalog(&'static LocaleCharsetEntry),
    /// A one-off entry for a facility-known single-byte encoding:
    /// ASCII in G0, the encoding in G2 invoked via GR.
    Synthesized(String),
}

/// Resolve a locale (or explicit charset override) to graphic-set
/// designations.
///
/// With no override and ignore-locale off, the process locale is resolved
/// to a name and its codeset suffix (the text after the last `.`) is used
/// as the charset.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(registry), ret(level = "debug"))
)]
pub fn resolve_locale(
    registry: &mut CharsetRegistry,
    locale: &str,
    charset: Option<&str>,
    options: ResolverOptions,
) -> LocaleResult<LocaleState> {
    let charset_name: Cow<'_, str> = match charset {
        Some(cs) if !cs.is_empty() => Cow::Borrowed(cs),
        _ if options.ignore_locale => Cow::Borrowed(locale),
        _ => {
            let resolved = resolve_locale_name(locale).ok_or_else(|| LocaleError::UnresolvedLocale {
                locale: locale.to_owned(),
            })?;
            Cow::Owned(codeset_of(&resolved).to_owned())
        }
    };

    match match_locale_charset(registry, &charset_name) {
        Some(entry) => Ok(designations(registry, &entry)),
        None => Err(LocaleError::UnknownCharset {
            charset: charset_name.into_owned(),
        }),
    }
}

/// The process locale as a name, taken from the usual environment
/// variables when the caller passes an empty locale.
fn resolve_locale_name(locale: &str) -> Option<String> {
    if !locale.is_empty() {
        return Some(locale.to_owned());
    }
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
}

/// The codeset suffix of a resolved locale name, or the whole name when no
/// `.` is present.
fn codeset_of(resolved: &str) -> &str {
    static CODESET: OnceLock<Regex> = OnceLock::new();
    let re = CODESET.get_or_init(|| Regex::new(r"\.([^.]*)$").expect("valid codeset pattern"));
    re.captures(resolved)
        .and_then(|captures| captures.get(1))
        .map_or(resolved, |m| m.as_str())
}

fn find_locale_entry(charset: &str) -> Option<&'static LocaleCharsetEntry> {
    LOCALE_CHARSETS.iter().find(|entry| names_equal(entry.name, charset))
}

/// Locale entries whose composite members include `charset`.
fn find_locale_by_charset(charset: &str) -> Option<&'static LocaleCharsetEntry> {
    LOCALE_CHARSETS.iter().find(|entry| {
        (entry.g[1].is_some() || entry.g[2].is_some())
            && [entry.g[3], entry.g[2], entry.g[1]]
                .iter()
                .flatten()
                .any(|member| names_equal(charset, member))
    })
}

fn match_locale_charset(registry: &mut CharsetRegistry, charset: &str) -> Option<ResolvedEntry> {
    if charset.is_empty() {
        return None;
    }

    let source = charset.strip_suffix("@euro").map_or(charset, |stripped| {
        #[cfg(feature = "tracing")]
        tracing::warn!("the euro character may not be supported");
        stripped
    });

    if let Some(entry) = find_locale_entry(source) {
        return Some(ResolvedEntry::Catalog(entry));
    }

    for &(prefix, target) in PREFIXES {
        if source.len() > prefix.len() && names_equal_prefix(source, prefix, prefix.len()) {
            let rewritten = format!("{target}{}", &source[prefix.len()..]);
            if let Some(entry) = find_locale_entry(&rewritten) {
                return Some(ResolvedEntry::Catalog(entry));
            }
        }
    }

    if registry.transcoder().available() {
        // The charset may be a member of a composite encoding the catalog
        // does know, under its catalog name or its facility name.
        if let Some(entry) = closest_locale_entry(registry, source) {
            return Some(ResolvedEntry::Catalog(entry));
        }
        // Otherwise any facility-known single-byte encoding gets a one-off
        // entry of its own.
        if registry.probe_single_byte(source) {
            return Some(ResolvedEntry::Synthesized(source.to_owned()));
        }
    }

    None
}

fn closest_locale_entry(
    registry: &CharsetRegistry,
    charset: &str,
) -> Option<&'static LocaleCharsetEntry> {
    find_catalog_by_name(registry, charset).map_or_else(
        || find_locale_by_charset(charset),
        |entry| find_locale_by_charset(&entry.name),
    )
}

/// Find the ISO-2022 catalog entry for a charset name, matching the
/// display name or the facility name.
///
/// `:GR` marks the right-half rows of split sets in the catalog; a name
/// without a part marker retries with the suffix so that e.g. the JIS X
/// 0201 right half can be named plainly.
#[must_use]
pub fn find_catalog_by_name<'r>(registry: &'r CharsetRegistry, name: &str) -> Option<&'r CatalogEntry> {
    fn lookup<'r>(registry: &'r CharsetRegistry, name: &str) -> Option<&'r CatalogEntry> {
        registry.catalog_entries().find(|entry| {
            names_equal(name, &entry.name)
                || (!entry.name.contains(":GL") && names_equal(name, &entry.encoding))
        })
    }

    lookup(registry, name).or_else(|| {
        if name.contains(':') {
            None
        } else {
            lookup(registry, &format!("{name}:GR"))
        }
    })
}

/// The composite locale entry a charset belongs to, when it is a member of
/// one (for example JIS X 0212 belongs to eucJP).
#[must_use]
pub fn composite_charset(registry: &CharsetRegistry, encoding_name: &str) -> Option<&'static str> {
    let catalog_name = find_catalog_by_name(registry, encoding_name)?.name.clone();
    find_locale_by_charset(&catalog_name).map(|entry| entry.name)
}

/// The catalog descriptor for one G-slot of a composite locale entry.
#[must_use]
pub fn composite_part<'r>(
    registry: &'r CharsetRegistry,
    composite_name: &str,
    g: usize,
) -> Option<&'r CatalogEntry> {
    let entry = LOCALE_CHARSETS
        .iter()
        .find(|entry| names_equal(composite_name, entry.name))?;
    let part = entry.g.get(g).copied().flatten()?;
    registry
        .catalog_entries()
        .find(|candidate| names_equal(part, &candidate.name))
}

fn resolve_slot(registry: &mut CharsetRegistry, name: Option<&str>) -> Rc<Charset> {
    match name {
        None => registry.unknown_charset(CharsetType::Cells94),
        Some(n) => registry.resolve_by_name(n),
    }
}

fn designations(registry: &mut CharsetRegistry, entry: &ResolvedEntry) -> LocaleState {
    match entry {
        ResolvedEntry::Catalog(lc) => LocaleState {
            gl: lc.gl,
            gr: lc.gr,
            g: [
                resolve_slot(registry, lc.g[0]),
                resolve_slot(registry, lc.g[1]),
                resolve_slot(registry, lc.g[2]),
                resolve_slot(registry, lc.g[3]),
            ],
            other: lc.other.map(|name| registry.resolve_by_name(name)),
        },
        ResolvedEntry::Synthesized(name) => LocaleState {
            gl: 0,
            gr: 2,
            g: [
                registry.resolve_by_name("ASCII"),
                registry.unknown_charset(CharsetType::Cells94),
                registry.resolve_by_name(name),
                registry.unknown_charset(CharsetType::Cells94),
            ],
            other: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{codeset_of, composite_charset, composite_part, find_catalog_by_name};

    #[test]
    fn codeset_suffix() {
        assert_eq!(codeset_of("en_US.UTF-8"), "UTF-8");
        assert_eq!(codeset_of("ja_JP.eucJP"), "eucJP");
        assert_eq!(codeset_of("POSIX"), "POSIX");
    }

    #[test]
    fn catalog_by_display_or_facility_name() {
        let reg = crate::CharsetRegistry::with_transcoder(Box::new(crate::NullTranscoder));
        assert_eq!(
            find_catalog_by_name(&reg, "iso8859-2").map(|e| &*e.name),
            Some("ISO 8859-2")
        );
        // The ASCII row borrows the iso8859-1 facility name, so that name
        // resolves to ASCII rather than the 96-cell set.
        assert_eq!(
            find_catalog_by_name(&reg, "iso8859-1").map(|e| &*e.name),
            Some("ASCII")
        );
        assert_eq!(
            find_catalog_by_name(&reg, "JIS X 0212").map(|e| &*e.name),
            Some("JIS X 0212")
        );
        // The bare JIS X 0201 name lands on the right-half row.
        assert_eq!(
            find_catalog_by_name(&reg, "jisx0201.1976-0").map(|e| &*e.name),
            Some("JIS X 0201:GR")
        );
    }

    #[test]
    fn composite_membership() {
        let reg = crate::CharsetRegistry::with_transcoder(Box::new(crate::NullTranscoder));
        assert_eq!(composite_charset(&reg, "JIS X 0212"), Some("eucJP"));
        assert_eq!(composite_charset(&reg, "KSC 5601"), Some("eucKR"));
        assert_eq!(composite_charset(&reg, "DEC Special"), None);

        let part = composite_part(&reg, "eucJP", 2).expect("part");
        assert_eq!(&*part.name, "JIS X 0201:GR");
        assert_eq!(part.shift, 0x80);
    }
}
