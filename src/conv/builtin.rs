//! Built-in tables for encodings no conversion facility provides.
//!
//! The DEC terminal sets predate the registries the system facility knows
//! about, so their mappings are compiled in. A built-in table lists only the
//! cells that differ from its default policy: either the source byte value
//! (for sets that keep the ASCII block) or the replacement scalar (for sets
//! whose unlisted cells are genuinely undefined).

use crate::common::utf8::REPLACEMENT;

/// What an unlisted cell maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotDefault {
    /// The source byte value itself.
    Identity,
    /// U+FFFD.
    Replacement,
}

pub(crate) struct BuiltinTable {
    pub name: &'static str,
    pub default: SlotDefault,
    /// `(code, scalar)` pairs, ascending by code.
    pub entries: &'static [(u32, u32)],
}

impl BuiltinTable {
    /// The scalar for `code` under this table's default policy.
    pub(crate) fn scalar(&self, code: u32) -> u32 {
        self.entries
            .binary_search_by_key(&code, |&(c, _)| c)
            .map_or_else(
                |_| match self.default {
                    SlotDefault::Identity => code,
                    SlotDefault::Replacement => REPLACEMENT,
                },
                |index| self.entries[index].1,
            )
    }
}

/// Find a built-in table by its exact (case-insensitive) encoding name.
pub(crate) fn find(name: &str) -> Option<&'static BuiltinTable> {
    BUILTIN_TABLES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

static BUILTIN_TABLES: &[BuiltinTable] = &[
    BuiltinTable {
        name: "dec-special",
        default: SlotDefault::Identity,
        entries: DEC_SPECIAL,
    },
    BuiltinTable {
        name: "dec-technical",
        default: SlotDefault::Replacement,
        entries: DEC_TECHNICAL,
    },
];

/// VT100 special graphics: line drawing in the 0x5F..0x7E range, ASCII below.
static DEC_SPECIAL: &[(u32, u32)] = &[
    (0x5f, 0x00a0), // blank
    (0x60, 0x25c6), // black diamond
    (0x61, 0x2592), // medium shade
    (0x62, 0x2409), // HT symbol
    (0x63, 0x240c), // FF symbol
    (0x64, 0x240d), // CR symbol
    (0x65, 0x240a), // LF symbol
    (0x66, 0x00b0), // degree sign
    (0x67, 0x00b1), // plus-minus
    (0x68, 0x2424), // NL symbol
    (0x69, 0x240b), // VT symbol
    (0x6a, 0x2518), // lower-right corner
    (0x6b, 0x2510), // upper-right corner
    (0x6c, 0x250c), // upper-left corner
    (0x6d, 0x2514), // lower-left corner
    (0x6e, 0x253c), // crossing lines
    (0x6f, 0x23ba), // scan line 1
    (0x70, 0x23bb), // scan line 3
    (0x71, 0x2500), // horizontal line
    (0x72, 0x23bc), // scan line 7
    (0x73, 0x23bd), // scan line 9
    (0x74, 0x251c), // left tee
    (0x75, 0x2524), // right tee
    (0x76, 0x2534), // bottom tee
    (0x77, 0x252c), // top tee
    (0x78, 0x2502), // vertical line
    (0x79, 0x2264), // less than or equal
    (0x7a, 0x2265), // greater than or equal
    (0x7b, 0x03c0), // greek pi
    (0x7c, 0x2260), // not equal
    (0x7d, 0x00a3), // pound sterling
    (0x7e, 0x00b7), // middle dot
];

/// VT330/VT340 technical character set. Cells without a Unicode equivalent
/// are left undefined.
static DEC_TECHNICAL: &[(u32, u32)] = &[
    (0x21, 0x23b7), // radical symbol bottom
    (0x22, 0x250c), // top-left radical corner
    (0x23, 0x2500), // horizontal connector
    (0x24, 0x2320), // top half integral
    (0x25, 0x2321), // bottom half integral
    (0x26, 0x2502), // vertical connector
    (0x27, 0x23a1), // top-left square bracket
    (0x28, 0x23a3), // bottom-left square bracket
    (0x29, 0x23a4), // top-right square bracket
    (0x2a, 0x23a6), // bottom-right square bracket
    (0x2b, 0x239b), // top-left parenthesis
    (0x2c, 0x239d), // bottom-left parenthesis
    (0x2d, 0x239e), // top-right parenthesis
    (0x2e, 0x23a0), // bottom-right parenthesis
    (0x2f, 0x23a8), // left brace middle piece
    (0x30, 0x23ac), // right brace middle piece
    (0x3c, 0x2264), // less than or equal
    (0x3d, 0x2260), // not equal
    (0x3e, 0x2265), // greater than or equal
    (0x3f, 0x222b), // integral
    (0x40, 0x2234), // therefore
    (0x41, 0x221d), // proportional to
    (0x42, 0x221e), // infinity
    (0x43, 0x00f7), // division
    (0x44, 0x0394), // capital delta
    (0x45, 0x2207), // nabla
    (0x46, 0x03a6), // capital phi
    (0x47, 0x0393), // capital gamma
    (0x48, 0x223c), // similar to
    (0x49, 0x2243), // asymptotically equal
    (0x4a, 0x0398), // capital theta
    (0x4b, 0x00d7), // multiplication
    (0x4c, 0x039b), // capital lambda
    (0x4d, 0x21d4), // left-right double arrow
    (0x4e, 0x21d2), // rightwards double arrow
    (0x4f, 0x2261), // identical to
    (0x50, 0x03a0), // capital pi
    (0x51, 0x03a8), // capital psi
    (0x53, 0x03a3), // capital sigma
    (0x56, 0x221a), // square root
    (0x57, 0x03a9), // capital omega
    (0x58, 0x039e), // capital xi
    (0x59, 0x03a5), // capital upsilon
    (0x5a, 0x2282), // subset of
    (0x5b, 0x2283), // superset of
    (0x5c, 0x2229), // intersection
    (0x5d, 0x222a), // union
    (0x5e, 0x2227), // logical and
    (0x5f, 0x2228), // logical or
    (0x60, 0x00ac), // not sign
    (0x61, 0x03b1), // alpha
    (0x62, 0x03b2), // beta
    (0x63, 0x03c7), // chi
    (0x64, 0x03b4), // delta
    (0x65, 0x03b5), // epsilon
    (0x66, 0x03c6), // phi
    (0x67, 0x03b3), // gamma
    (0x68, 0x03b7), // eta
    (0x69, 0x03b9), // iota
    (0x6a, 0x03b8), // theta
    (0x6b, 0x03ba), // kappa
    (0x6c, 0x03bb), // lambda
    (0x6e, 0x03bd), // nu
    (0x6f, 0x2202), // partial differential
    (0x70, 0x03c0), // pi
    (0x71, 0x03c8), // psi
    (0x72, 0x03c1), // rho
    (0x73, 0x03c3), // sigma
    (0x74, 0x03c4), // tau
    (0x76, 0x0192), // function symbol
    (0x77, 0x03c9), // omega
    (0x78, 0x03be), // xi
    (0x79, 0x03c5), // upsilon
    (0x7a, 0x03b6), // zeta
    (0x7b, 0x2190), // leftwards arrow
    (0x7c, 0x2191), // upwards arrow
    (0x7d, 0x2192), // rightwards arrow
    (0x7e, 0x2193), // downwards arrow
];
