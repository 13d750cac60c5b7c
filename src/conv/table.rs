//! Forward and reverse code mappings for one legacy encoding.
//!
//! A [`RecodeTable`] is built once per distinct encoding name by probing the
//! conversion facility with every code in the source space, decoding the
//! UTF-8 result back to a scalar. The forward table is dense: every code in
//! `0..size` has an entry, unmappable codes holding the replacement scalar.
//! The reverse index is sorted by scalar after population for binary-search
//! lookup.

use std::rc::Rc;

use crate::common::{utf8, TableBuildError, TableResult};

use super::{builtin, transcoder::Transcoder};

/// Encoding-name remaps tried when the facility rejects the catalog name.
/// Keys are lower case; values are names the facility is likely to accept.
static ENCODING_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "koi8-e" => "ISO-IR-111",
    "tcvn-0" => "TCVN5712-1:1993",
    "ibm-cp437" => "cp437",
    "ibm-cp850" => "cp850",
    "ibm-cp852" => "cp852",
    "ibm-cp865" => "cp865",
    "ibm-cp866" => "cp866",
    "iso646.1973-0" => "US-ASCII",
    "microsoft-cp1250" => "windows-1250",
    "microsoft-cp1251" => "windows-1251",
    "microsoft-cp1252" => "windows-1252",
    "microsoft-cp1255" => "windows-1255",
};

/// One forward cell: the scalar and its UTF-8 form, kept so a translation
/// filter can emit the bytes without re-encoding.
#[derive(Debug, Clone, Copy)]
struct ForwardCell {
    scalar: u32,
    utf8_len: u8,
    utf8: [u8; 6],
}

impl ForwardCell {
    fn unmapped() -> Self {
        Self {
            scalar: utf8::REPLACEMENT,
            utf8_len: 0,
            utf8: [0; 6],
        }
    }

    fn mapped(scalar: u32) -> Self {
        let mut cell = Self {
            scalar,
            utf8_len: 0,
            utf8: [0; 6],
        };
        if let Some(len) = utf8::encode(scalar, &mut cell.utf8) {
            #[allow(clippy::cast_possible_truncation)]
            {
                cell.utf8_len = len as u8;
            }
        }
        cell
    }
}

/// Bidirectional mapping between one encoding's code space and Unicode.
pub struct RecodeTable {
    name: String,
    forward: Vec<ForwardCell>,
    /// `(scalar, code)` sorted by scalar; one entry per mapped forward cell.
    reverse: Vec<(u32, u32)>,
}

impl std::fmt::Debug for RecodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecodeTable")
            .field("name", &self.name)
            .field("size", &self.forward.len())
            .field("mapped", &self.reverse.len())
            .finish()
    }
}

impl RecodeTable {
    /// Build the table for `name` over a code space of `size` entries.
    ///
    /// Codes below 0x100 are probed as single bytes, larger codes as
    /// big-endian byte pairs (the 16-bit spaces of the stateful multibyte
    /// encodings). When the facility rejects the name, the alias map is
    /// consulted and the open retried once; failing that, the built-in
    /// tables are checked by exact name.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn build(name: &str, size: usize, transcoder: &dyn Transcoder) -> TableResult<Self> {
        let conv = transcoder.open(name).or_else(|| {
            ENCODING_ALIASES
                .get(name.to_ascii_lowercase().as_str())
                .and_then(|alias| transcoder.open(alias))
        });

        if let Some(mut conv) = conv {
            let mut forward = Vec::with_capacity(size);
            for code in 0..size {
                let unit = if code < 0x100 {
                    vec![code as u8]
                } else {
                    vec![(code >> 8) as u8, (code & 0xff) as u8]
                };
                let cell = conv
                    .transcode(&unit)
                    .and_then(|out| utf8::decode(&out).map(|(scalar, _)| scalar))
                    .map_or_else(ForwardCell::unmapped, ForwardCell::mapped);
                forward.push(cell);
            }
            return Ok(Self::finish(name, forward));
        }

        builtin::find(name).map_or_else(
            || {
                Err(TableBuildError::UnknownEncoding {
                    name: name.to_owned(),
                })
            },
            |table| {
                let forward = (0..size)
                    .map(|code| ForwardCell::mapped(table.scalar(code as u32)))
                    .collect();
                Ok(Self::finish(name, forward))
            },
        )
    }

    #[allow(clippy::cast_possible_truncation)]
    fn finish(name: &str, forward: Vec<ForwardCell>) -> Self {
        let mut reverse: Vec<(u32, u32)> = forward
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.scalar != utf8::REPLACEMENT)
            .map(|(code, cell)| (cell.scalar, code as u32))
            .collect();
        // Keep the lowest code when several map to one scalar, so reverse
        // lookup is deterministic.
        reverse.sort_unstable();
        reverse.dedup_by_key(|&mut (scalar, _)| scalar);

        Self {
            name: name.to_owned(),
            forward,
            reverse,
        }
    }

    /// The encoding name this table was built for.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of codes in the source space.
    #[must_use]
    pub fn size(&self) -> usize {
        self.forward.len()
    }

    /// The scalar for `code`; the code itself when out of range.
    #[must_use]
    pub fn lookup(&self, code: u32) -> u32 {
        self.forward
            .get(code as usize)
            .map_or(code, |cell| cell.scalar)
    }

    /// The UTF-8 form of `code`'s scalar, when the code is mapped.
    #[must_use]
    pub fn utf8_of(&self, code: u32) -> Option<&[u8]> {
        self.forward
            .get(code as usize)
            .filter(|cell| cell.utf8_len > 0)
            .map(|cell| &cell.utf8[..cell.utf8_len as usize])
    }

    /// The code mapping to `scalar`; the scalar itself on a miss.
    ///
    /// The passthrough on miss is deliberate and lossy: a scalar that
    /// happens to coincide with a valid code is indistinguishable from a
    /// hit. Callers that must distinguish use [`Self::reverse_find`].
    #[must_use]
    pub fn reverse_lookup(&self, scalar: u32) -> u32 {
        self.reverse_find(scalar).unwrap_or(scalar)
    }

    /// The code mapping to `scalar`, or `None`.
    #[must_use]
    pub fn reverse_find(&self, scalar: u32) -> Option<u32> {
        self.reverse
            .binary_search_by_key(&scalar, |&(s, _)| s)
            .ok()
            .map(|index| self.reverse[index].1)
    }

    /// Count of mapped codes in `range` (used to judge whether a probed
    /// encoding is genuinely single-byte).
    pub(crate) fn mapped_in(&self, range: std::ops::Range<usize>) -> usize {
        self.forward[range.start.min(self.forward.len())..range.end.min(self.forward.len())]
            .iter()
            .filter(|cell| cell.scalar != utf8::REPLACEMENT)
            .count()
    }
}

/// Built tables keyed by exact encoding name; never evicted.
#[derive(Default)]
pub struct TableCache {
    tables: Vec<Rc<RecodeTable>>,
    builds: usize,
}

impl TableCache {
    /// The cached table for `name`, building it on first use.
    pub(crate) fn get_or_build(
        &mut self,
        name: &str,
        size: usize,
        transcoder: &dyn Transcoder,
    ) -> TableResult<Rc<RecodeTable>> {
        if let Some(table) = self.tables.iter().find(|t| t.name == name) {
            return Ok(Rc::clone(table));
        }
        let table = Rc::new(RecodeTable::build(name, size, transcoder)?);
        self.builds += 1;
        self.tables.push(Rc::clone(&table));
        Ok(table)
    }

    /// Number of tables constructed so far (cache hits do not count).
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::{RecodeTable, TableCache};
    use crate::common::utf8::REPLACEMENT;
    use crate::conv::transcoder::{NullTranscoder, Transcode, Transcoder};

    /// Facility that knows a single fictitious encoding mapping byte `n` to
    /// scalar `0x100 + n` for the high half, identity below 0x80, with
    /// 0xA0..0xA4 unmappable.
    struct FakeFacility;

    struct FakeConverter;

    impl Transcoder for FakeFacility {
        fn open(&self, encoding: &str) -> Option<Box<dyn Transcode>> {
            (encoding == "x-test").then(|| Box::new(FakeConverter) as Box<dyn Transcode>)
        }
    }

    impl Transcode for FakeConverter {
        fn transcode(&mut self, input: &[u8]) -> Option<Vec<u8>> {
            let &[byte] = input else { return None };
            let scalar = match byte {
                0xa0..=0xa3 => return None,
                0x00..=0x7f => u32::from(byte),
                _ => 0x100 + u32::from(byte),
            };
            let mut buf = [0u8; 6];
            let len = crate::common::utf8::encode(scalar, &mut buf)?;
            Some(buf[..len].to_vec())
        }
    }

    #[test]
    fn dense_forward_with_replacement_default() {
        let table = RecodeTable::build("x-test", 256, &FakeFacility).expect("builds");
        assert_eq!(table.size(), 256);
        assert_eq!(table.lookup(0x41), 0x41);
        assert_eq!(table.lookup(0xc0), 0x1c0);
        assert_eq!(table.lookup(0xa1), REPLACEMENT);
        // Out of range codes pass through unchanged.
        assert_eq!(table.lookup(0x1234), 0x1234);
    }

    #[test]
    fn reverse_round_trip() {
        let table = RecodeTable::build("x-test", 256, &FakeFacility).expect("builds");
        for code in 0..256u32 {
            let scalar = table.lookup(code);
            if scalar != REPLACEMENT {
                assert_eq!(table.reverse_lookup(scalar), code);
            }
        }
    }

    #[test]
    fn reverse_miss_passthrough() {
        let table = RecodeTable::build("x-test", 256, &FakeFacility).expect("builds");
        assert_eq!(table.reverse_lookup(0x3042), 0x3042);
        assert_eq!(table.reverse_find(0x3042), None);
    }

    #[test]
    fn utf8_bytes_kept() {
        let table = RecodeTable::build("x-test", 256, &FakeFacility).expect("builds");
        assert_eq!(table.utf8_of(0x41), Some(b"\x41".as_slice()));
        assert_eq!(table.utf8_of(0xc0), Some(b"\xc7\x80".as_slice()));
        assert_eq!(table.utf8_of(0xa1), None);
    }

    #[test]
    fn unknown_name_fails() {
        assert!(RecodeTable::build("x-unknown", 256, &FakeFacility).is_err());
        assert!(RecodeTable::build("x-test", 256, &NullTranscoder).is_err());
    }

    #[test]
    fn builtin_without_facility() {
        let table = RecodeTable::build("dec-special", 256, &NullTranscoder).expect("built in");
        assert_eq!(table.lookup(0x71), 0x2500);
        assert_eq!(table.reverse_lookup(0x2500), 0x71);
    }

    #[test]
    fn cache_builds_once() {
        let mut cache = TableCache::default();
        let first = cache.get_or_build("x-test", 256, &FakeFacility).expect("builds");
        assert_eq!(cache.build_count(), 1);
        let second = cache.get_or_build("x-test", 256, &FakeFacility).expect("cached");
        assert_eq!(cache.build_count(), 1);
        assert!(std::rc::Rc::ptr_eq(&first, &second));
    }
}
