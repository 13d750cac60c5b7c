//! The catalog of known character sets and the cache of resolved instances.
//!
//! A [`CharsetRegistry`] is an explicit object owned by the application
//! context rather than process-global state; a fresh registry per test gives
//! full isolation. Resolution never fails outright: every path degrades to
//! a per-type unknown placeholder that recodes as the identity and reverses
//! to nothing.

use std::{
    borrow::Cow,
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    common::names_equal,
    conv::{system_transcoder, TableCache, Transcoder},
};

use super::{other::OtherPlugin, Charset, CharsetKind, CharsetType};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Construction state of a catalog slot. Failure is sticky: a slot whose
/// table could not be built is excluded from every later match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Unbuilt,
    Built,
    Failed,
}

/// One catalog entry: a named ISO-2022 set and the encoding that backs it.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Human-readable name, as used in locale catalog entries.
    pub name: Cow<'static, str>,
    /// Structural type.
    pub ctype: CharsetType,
    /// ISO-2022 designator final byte, 0 when none is registered.
    pub final_byte: u8,
    /// The name the conversion facility (or built-in table) knows.
    pub encoding: Cow<'static, str>,
    /// Offset of the set's codes within the backing table's code space.
    pub shift: u32,
}

struct CatalogSlot {
    entry: CatalogEntry,
    state: Cell<BuildState>,
}

struct StaticCharset(&'static str, CharsetType, u8, &'static str, u32);

/// The compiled-in ISO-2022 catalog. The `encoding` column is the name the
/// conversion facility is asked for; where that differs from what a given
/// facility accepts, the alias map in the table builder bridges the gap.
#[rustfmt::skip]
static ISO2022_CHARSETS: &[StaticCharset] = &[
    StaticCharset("ISO 646 (1973)", CharsetType::Cells94,    b'@', "iso646.1973-0",    0x00),
    StaticCharset("ASCII",          CharsetType::Cells94,    b'B', "iso8859-1",        0x00),
    StaticCharset("JIS X 0201:GL",  CharsetType::Cells94,    b'J', "jisx0201.1976-0",  0x00),
    StaticCharset("JIS X 0201:GR",  CharsetType::Cells94,    b'I', "jisx0201.1976-0",  0x80),
    StaticCharset("DEC Special",    CharsetType::Cells94,    b'0', "dec-special",      0x00),
    StaticCharset("DEC Technical",  CharsetType::Cells94,    b'>', "dec-technical",    0x00),

    StaticCharset("ISO 8859-1",     CharsetType::Cells96,    b'A', "iso8859-1",        0x80),
    StaticCharset("ISO 8859-2",     CharsetType::Cells96,    b'B', "iso8859-2",        0x80),
    StaticCharset("ISO 8859-3",     CharsetType::Cells96,    b'C', "iso8859-3",        0x80),
    StaticCharset("ISO 8859-4",     CharsetType::Cells96,    b'D', "iso8859-4",        0x80),
    StaticCharset("ISO 8859-5",     CharsetType::Cells96,    b'L', "iso8859-5",        0x80),
    StaticCharset("ISO 8859-6",     CharsetType::Cells96,    b'G', "iso8859-6",        0x80),
    StaticCharset("ISO 8859-7",     CharsetType::Cells96,    b'F', "iso8859-7",        0x80),
    StaticCharset("ISO 8859-8",     CharsetType::Cells96,    b'H', "iso8859-8",        0x80),
    StaticCharset("ISO 8859-9",     CharsetType::Cells96,    b'M', "iso8859-9",        0x80),
    StaticCharset("ISO 8859-10",    CharsetType::Cells96,    b'V', "iso8859-10",       0x80),
    StaticCharset("ISO 8859-11",    CharsetType::Cells96,    b'T', "iso8859-11",       0x80),
    StaticCharset("TIS 620",        CharsetType::Cells96,    b'T', "iso8859-11",       0x80),
    StaticCharset("ISO 8859-13",    CharsetType::Cells96,    b'Y', "iso8859-13",       0x80),
    StaticCharset("ISO 8859-14",    CharsetType::Cells96,    b'_', "iso8859-14",       0x80),
    StaticCharset("ISO 8859-15",    CharsetType::Cells96,    b'b', "iso8859-15",       0x80),
    StaticCharset("ISO 8859-16",    CharsetType::Cells96,    b'f', "iso8859-16",       0x80),
    StaticCharset("KOI8-E",         CharsetType::Cells96,    b'@', "koi8-e",           0x80),
    StaticCharset("TCVN",           CharsetType::Cells96,    b'Z', "tcvn-0",           0x80),

    StaticCharset("GB 2312",        CharsetType::Matrix9494, b'A', "gb2312.1980-0",    0x0000),
    StaticCharset("JIS X 0208",     CharsetType::Matrix9494, b'B', "jisx0208.1990-0",  0x0000),
    StaticCharset("KSC 5601",       CharsetType::Matrix9494, b'C', "ksc5601.1987-0",   0x0000),
    StaticCharset("JIS X 0212",     CharsetType::Matrix9494, b'D', "jisx0212.1990-0",  0x0000),

    StaticCharset("GB 2312",        CharsetType::Matrix9696, b'A', "gb2312.1980-0",    0x0000),
    StaticCharset("JIS X 0208",     CharsetType::Matrix9696, b'B', "jisx0208.1990-0",  0x0000),
    StaticCharset("KSC 5601",       CharsetType::Matrix9696, b'C', "ksc5601.1987-0",   0x0000),
    StaticCharset("JIS X 0212",     CharsetType::Matrix9696, b'D', "jisx0212.1990-0",  0x0000),

    StaticCharset("CNS11643-1",     CharsetType::Matrix9494, b'G', "cns11643-1",       0x0000),
    StaticCharset("CNS11643-2",     CharsetType::Matrix9494, b'H', "cns11643-2",       0x0000),
    StaticCharset("CNS11643-3",     CharsetType::Matrix9494, b'I', "cns11643-3",       0x0000),

    StaticCharset("APL2",           CharsetType::Cells128,   0,    "apl2",             0x80),
    StaticCharset("KOI8-R",         CharsetType::Cells128,   0,    "koi8-r",           0x80),
    StaticCharset("KOI8-U",         CharsetType::Cells128,   0,    "koi8-u",           0x80),
    StaticCharset("KOI8-RU",        CharsetType::Cells128,   0,    "koi8-ru",          0x80),
    StaticCharset("CP 1250",        CharsetType::Cells128,   0,    "microsoft-cp1250", 0x80),
    StaticCharset("CP 1251",        CharsetType::Cells128,   0,    "microsoft-cp1251", 0x80),
    StaticCharset("CP 1252",        CharsetType::Cells128,   0,    "microsoft-cp1252", 0x80),
    StaticCharset("CP 1255",        CharsetType::Cells128,   0,    "microsoft-cp1255", 0x80),

    StaticCharset("CP 437",         CharsetType::Cells128,   0,    "ibm-cp437",        0x80),
    StaticCharset("CP 850",         CharsetType::Cells128,   0,    "ibm-cp850",        0x80),
    StaticCharset("CP 852",         CharsetType::Cells128,   0,    "ibm-cp852",        0x80),
    StaticCharset("CP 865",         CharsetType::Cells128,   0,    "ibm-cp865",        0x80),
    StaticCharset("CP 866",         CharsetType::Cells128,   0,    "ibm-cp866",        0x80),

    StaticCharset("Big 5",          CharsetType::Matrix94192, 0,   "big5.eten-0",      0x8000),
];

/// The stateful multibyte catalog.
static OTHER_CHARSETS: &[(&str, OtherPlugin)] = &[
    ("GBK", OtherPlugin::Gbk),
    ("UTF-8", OtherPlugin::Utf8),
    ("SJIS", OtherPlugin::Sjis),
    ("BIG5-HKSCS", OtherPlugin::Hkscs),
    ("GB18030", OtherPlugin::Gb18030),
];

/// Structural description of an encoding found by an external
/// font-description lookup.
#[derive(Debug, Clone, Copy)]
pub struct CharsetProbe {
    /// Number of codes in the encoding.
    pub size: usize,
    /// Offset of the codes within the backing table.
    pub shift: u32,
}

type ProbeFn = dyn Fn(&str) -> Option<CharsetProbe>;

/// Catalog, caches and conversion facility for charset resolution.
pub struct CharsetRegistry {
    transcoder: Box<dyn Transcoder>,
    catalog: Vec<CatalogSlot>,
    other_state: Vec<Cell<BuildState>>,
    tables: TableCache,
    cache: Vec<Rc<Charset>>,
    unknown: [Rc<Charset>; 4],
    probe: Option<Box<ProbeFn>>,
}

fn unknown_charset(name: &'static str, ctype: CharsetType) -> Rc<Charset> {
    Rc::new(Charset::new(Cow::Borrowed(name), ctype, 0, CharsetKind::Unknown))
}

impl Default for CharsetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CharsetRegistry {
    /// A registry backed by the system conversion facility.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transcoder(system_transcoder())
    }

    /// A registry backed by a caller-supplied conversion facility.
    #[must_use]
    pub fn with_transcoder(transcoder: Box<dyn Transcoder>) -> Self {
        Self {
            transcoder,
            catalog: ISO2022_CHARSETS
                .iter()
                .map(|&StaticCharset(name, ctype, final_byte, encoding, shift)| CatalogSlot {
                    entry: CatalogEntry {
                        name: Cow::Borrowed(name),
                        ctype,
                        final_byte,
                        encoding: Cow::Borrowed(encoding),
                        shift,
                    },
                    state: Cell::new(BuildState::Unbuilt),
                })
                .collect(),
            other_state: OTHER_CHARSETS.iter().map(|_| Cell::new(BuildState::Unbuilt)).collect(),
            tables: TableCache::default(),
            cache: Vec::new(),
            unknown: [
                unknown_charset("Unknown (94)", CharsetType::Cells94),
                unknown_charset("Unknown (96)", CharsetType::Cells96),
                unknown_charset("Unknown (94x94)", CharsetType::Matrix9494),
                unknown_charset("Unknown (96x96)", CharsetType::Matrix9696),
            ],
            probe: None,
        }
    }

    /// Install an external font-description lookup consulted when a name
    /// matches neither catalog.
    pub fn set_probe(&mut self, probe: impl Fn(&str) -> Option<CharsetProbe> + 'static) {
        self.probe = Some(Box::new(probe));
    }

    /// The conversion facility backing this registry.
    #[must_use]
    pub fn transcoder(&self) -> &dyn Transcoder {
        self.transcoder.as_ref()
    }

    /// Number of recode tables constructed so far.
    #[must_use]
    pub fn table_builds(&self) -> usize {
        self.tables.build_count()
    }

    /// The per-type placeholder for unresolvable requests. Placeholders are
    /// allocated once per registry, so repeated calls return the same
    /// instance.
    #[must_use]
    pub fn unknown_charset(&self, ctype: CharsetType) -> Rc<Charset> {
        let index = match ctype {
            CharsetType::Cells96 => 1,
            CharsetType::Matrix9494 => 2,
            CharsetType::Matrix9696 => 3,
            _ => 0,
        };
        Rc::clone(&self.unknown[index])
    }

    /// Iterate the catalog entries, compiled-in and appended alike.
    pub fn catalog_entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.catalog.iter().map(|slot| &slot.entry)
    }

    /// Names of the stateful multibyte encodings.
    pub fn other_names(&self) -> impl Iterator<Item = &'static str> {
        OTHER_CHARSETS.iter().map(|&(name, _)| name)
    }

    /// Whether `name` names a stateful multibyte encoding, including the
    /// recognised-but-unsupported `Big5` and `JOHAB`.
    #[must_use]
    pub fn is_other_charset(&self, name: &str) -> bool {
        OTHER_CHARSETS.iter().any(|&(n, _)| names_equal(n, name))
            || names_equal(name, "Big5")
            || names_equal(name, "JOHAB")
    }

    /// Resolve a charset by ISO-2022 final byte and structural type.
    ///
    /// Never fails: an unregistered pair degrades to the unknown
    /// placeholder for the type.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn resolve_by_final(&mut self, final_byte: u8, ctype: CharsetType) -> Rc<Charset> {
        if let Some(cached) = self
            .cache
            .iter()
            .find(|c| c.charset_type() == ctype && c.final_byte() == final_byte)
        {
            return Rc::clone(cached);
        }

        let found = self
            .catalog
            .iter()
            .position(|slot| {
                slot.entry.ctype == ctype
                    && slot.entry.final_byte == final_byte
                    && slot.state.get() != BuildState::Failed
            });
        if let Some(index) = found {
            if let Some(charset) = self.build_catalog_charset(index) {
                return charset;
            }
        }

        self.unknown_charset(ctype)
    }

    /// Resolve a charset by name.
    ///
    /// Search order: resolved cache, ISO-2022 catalog, stateful multibyte
    /// catalog, external probe (appending a new catalog entry), and finally
    /// the unknown 94-cell placeholder.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn resolve_by_name(&mut self, name: &str) -> Rc<Charset> {
        if let Some(cached) = self.cache.iter().find(|c| names_equal(c.name(), name)) {
            return Rc::clone(cached);
        }

        if let Some(charset) = self.resolve_catalog_by_name(name) {
            return charset;
        }

        if let Some(charset) = self.resolve_other(name) {
            return charset;
        }

        if self.probe_and_append(name) {
            if let Some(charset) = self.resolve_catalog_by_name(name) {
                return charset;
            }
        }

        self.unknown_charset(CharsetType::Cells94)
    }

    fn resolve_catalog_by_name(&mut self, name: &str) -> Option<Rc<Charset>> {
        let index = self.catalog.iter().position(|slot| {
            names_equal(&slot.entry.name, name) && slot.state.get() != BuildState::Failed
        })?;
        self.build_catalog_charset(index)
    }

    /// Build the table for catalog slot `index` and cache the descriptor.
    /// A construction failure marks the slot permanently failed.
    fn build_catalog_charset(&mut self, index: usize) -> Option<Rc<Charset>> {
        let entry = self.catalog[index].entry.clone();
        match self
            .tables
            .get_or_build(&entry.encoding, entry.ctype.code_space(), self.transcoder.as_ref())
        {
            Ok(table) => {
                self.catalog[index].state.set(BuildState::Built);
                let charset = Rc::new(Charset::new(
                    entry.name,
                    entry.ctype,
                    entry.final_byte,
                    CharsetKind::Table {
                        table,
                        shift: entry.shift,
                    },
                ));
                self.cache.push(Rc::clone(&charset));
                Some(charset)
            }
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::event!(
                    tracing::Level::DEBUG,
                    name = %entry.name,
                    encoding = %entry.encoding,
                    error = %_error,
                    "charset table construction failed"
                );
                self.catalog[index].state.set(BuildState::Failed);
                None
            }
        }
    }

    fn resolve_other(&mut self, name: &str) -> Option<Rc<Charset>> {
        let index = OTHER_CHARSETS.iter().position(|&(n, _)| names_equal(n, name))?;
        if self.other_state[index].get() == BuildState::Failed {
            return None;
        }
        let (other_name, plugin) = OTHER_CHARSETS[index];

        match plugin.init(&mut self.tables, self.transcoder.as_ref()) {
            Some(state) => {
                self.other_state[index].set(BuildState::Built);
                let charset = Rc::new(Charset::new(
                    Cow::Borrowed(other_name),
                    CharsetType::Other,
                    0,
                    CharsetKind::Other {
                        plugin,
                        state: RefCell::new(state),
                    },
                ));
                self.cache.push(Rc::clone(&charset));
                Some(charset)
            }
            None => {
                #[cfg(feature = "tracing")]
                tracing::event!(
                    tracing::Level::DEBUG,
                    name = other_name,
                    "multibyte charset initialization failed"
                );
                self.other_state[index].set(BuildState::Failed);
                None
            }
        }
    }

    /// Consult the external probe, then the conversion facility itself, for
    /// a structural description of `name`; append a catalog entry on
    /// success.
    fn probe_and_append(&mut self, name: &str) -> bool {
        let described = self.probe.as_deref().and_then(|probe| probe(name));
        if let Some(described) = described {
            return self.add_charset(name, described.size, described.shift);
        }
        if self.probe_single_byte(name) {
            self.append_entry(name, CharsetType::Cells128, name, 0x80);
            return true;
        }
        false
    }

    /// Whether the conversion facility maps `name` as a genuinely
    /// single-byte encoding. A facility will often open a multibyte
    /// encoding's name and then fail every lone high byte; an empty high
    /// half is taken as that hint.
    pub(crate) fn probe_single_byte(&mut self, name: &str) -> bool {
        if !self.transcoder.available() {
            return false;
        }
        self.tables
            .get_or_build(name, 0x100, self.transcoder.as_ref())
            .is_ok_and(|table| table.mapped_in(0x80..0x100) > 0)
    }

    /// Append a discovered character set to the catalog. The size picks the
    /// structural type; sizes beyond 128 cells have no ISO-2022 structure
    /// and are rejected.
    pub fn add_charset(&mut self, name: &str, size: usize, shift: u32) -> bool {
        let ctype = match size {
            0..=94 => CharsetType::Cells94,
            95..=96 => CharsetType::Cells96,
            97..=128 => CharsetType::Cells128,
            _ => {
                #[cfg(feature = "tracing")]
                tracing::event!(tracing::Level::DEBUG, name, size, "unexpected character-set size");
                return false;
            }
        };
        self.append_entry(name, ctype, name, shift);
        true
    }

    fn append_entry(&mut self, name: &str, ctype: CharsetType, encoding: &str, shift: u32) {
        self.catalog.push(CatalogSlot {
            entry: CatalogEntry {
                name: Cow::Owned(name.to_owned()),
                ctype,
                final_byte: 0,
                encoding: Cow::Owned(encoding.to_owned()),
                shift,
            },
            state: Cell::new(BuildState::Unbuilt),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{CharsetProbe, CharsetRegistry, CharsetType};
    use crate::conv::{NullTranscoder, Transcode, Transcoder};

    /// A facility covering the Latin-1 family names the catalog asks for.
    struct Latin1Facility;

    struct Latin1Converter;

    impl Transcoder for Latin1Facility {
        fn open(&self, encoding: &str) -> Option<Box<dyn Transcode>> {
            matches!(encoding, "iso8859-1" | "US-ASCII")
                .then(|| Box::new(Latin1Converter) as Box<dyn Transcode>)
        }
    }

    impl Transcode for Latin1Converter {
        fn transcode(&mut self, input: &[u8]) -> Option<Vec<u8>> {
            let &[byte] = input else { return None };
            let mut buf = [0u8; 6];
            let len = crate::common::utf8::encode(u32::from(byte), &mut buf)?;
            Some(buf[..len].to_vec())
        }
    }

    fn registry() -> CharsetRegistry {
        CharsetRegistry::with_transcoder(Box::new(Latin1Facility))
    }

    #[test]
    fn unknown_final_returns_cached_placeholder() {
        let mut reg = registry();
        let first = reg.resolve_by_final(b'~', CharsetType::Cells94);
        let second = reg.resolve_by_final(b'~', CharsetType::Cells94);
        assert!(first.is_unknown());
        assert!(Rc::ptr_eq(&first, &second));
        assert!(Rc::ptr_eq(&first, &reg.unknown_charset(CharsetType::Cells94)));
    }

    #[test]
    fn ascii_transparency() {
        let mut reg = registry();
        let ascii = reg.resolve_by_final(b'B', CharsetType::Cells94);
        assert!(!ascii.is_unknown());
        for code in 0x20..0x7f {
            assert_eq!(ascii.recode(code), code);
        }
    }

    #[test]
    fn resolve_by_name_hits_cache_second_time() {
        let mut reg = registry();
        let first = reg.resolve_by_name("ISO 8859-1");
        assert_eq!(reg.table_builds(), 1);
        let second = reg.resolve_by_name("iso8859_1");
        assert_eq!(reg.table_builds(), 1);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn shared_table_between_charsets() {
        let mut reg = registry();
        // ASCII (94-cell) and ISO 8859-1 (96-cell) share the iso8859-1
        // table; only one build happens.
        let _ = reg.resolve_by_name("ASCII");
        let _ = reg.resolve_by_name("ISO 8859-1");
        assert_eq!(reg.table_builds(), 1);
    }

    #[test]
    fn failure_is_sticky() {
        let mut reg = registry();
        let first = reg.resolve_by_name("KOI8-R");
        assert!(first.is_unknown());
        let builds = reg.table_builds();
        let second = reg.resolve_by_name("KOI8-R");
        assert!(second.is_unknown());
        // The failed slot is excluded; no rebuild is attempted.
        assert_eq!(reg.table_builds(), builds);
    }

    #[test]
    fn gr_charset_reverse_validates_range() {
        let mut reg = registry();
        let latin1 = reg.resolve_by_name("ISO 8859-1");
        // 0xE9 in Latin-1 GR is U+00E9; the GR set sees code 0x69.
        assert_eq!(latin1.recode(0x69), 0xe9);
        assert_eq!(latin1.reverse(0x00e9), Some(0x69));
        // A scalar mapping below the shift is out of this set's range.
        assert_eq!(latin1.reverse(0x0041), None);
    }

    #[test]
    fn unknown_placeholder_recode_identity() {
        let reg = registry();
        let unknown = reg.unknown_charset(CharsetType::Cells96);
        assert_eq!(unknown.recode(0x42), 0x42);
        assert_eq!(unknown.reverse(0x42), None);
    }

    #[test]
    fn other_catalog_utf8_without_facility() {
        let mut reg = CharsetRegistry::with_transcoder(Box::new(NullTranscoder));
        let utf8 = reg.resolve_by_name("UTF-8");
        assert_eq!(utf8.charset_type(), CharsetType::Other);
        assert_eq!(utf8.stack(0xc2), None);
        assert_eq!(utf8.stack(0xa9), Some(0xa9));
        assert_eq!(utf8.recode(0xa9), 0xa9);
    }

    #[test]
    fn other_init_failure_is_sticky() {
        let mut reg = CharsetRegistry::with_transcoder(Box::new(NullTranscoder));
        assert!(reg.resolve_by_name("SJIS").is_unknown());
        assert!(reg.resolve_by_name("SJIS").is_unknown());
    }

    #[test]
    fn is_other_charset_names() {
        let reg = registry();
        assert!(reg.is_other_charset("utf8"));
        assert!(reg.is_other_charset("Big5"));
        assert!(reg.is_other_charset("JOHAB"));
        assert!(!reg.is_other_charset("ISO 8859-1"));
    }

    #[test]
    fn probe_appends_catalog_entry() {
        let mut reg = CharsetRegistry::with_transcoder(Box::new(NullTranscoder));
        reg.set_probe(|name| (name == "x-custom").then_some(CharsetProbe { size: 96, shift: 0x80 }));
        // The probe finds it, but the facility cannot build its table, so
        // resolution still degrades to the placeholder.
        assert!(reg.resolve_by_name("x-custom").is_unknown());
        assert!(reg.catalog_entries().any(|e| e.name == "x-custom"));
    }

    #[test]
    fn facility_probe_synthesizes_single_byte_entry() {
        let mut reg = registry();
        // Not in any catalog, but the facility maps it as 8-bit.
        let charset = reg.resolve_by_name("US-ASCII");
        assert!(!charset.is_unknown());
        assert_eq!(charset.charset_type(), CharsetType::Cells128);
        assert_eq!(charset.recode(0x21), 0xa1);
    }

    #[test]
    fn add_charset_rejects_wide_sizes() {
        let mut reg = registry();
        assert!(reg.add_charset("x-gl", 94, 0));
        assert!(reg.add_charset("x-gr", 128, 0x80));
        // Two-byte code spaces have no single ISO-2022 cell structure.
        assert!(!reg.add_charset("x-wide", 256, 0));
    }
}
