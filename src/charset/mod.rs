//! ISO-2022 character-set descriptors.
//!
//! A [`Charset`] pairs a structural type (how many cells, one or two bytes
//! per code) with one of a closed set of recoding strategies: a recode
//! table with a byte shift, a stateful multibyte plugin, or the identity
//! placeholder used when nothing better resolves.

mod other;
mod registry;

pub use other::OtherState;
pub use registry::*;

use std::{borrow::Cow, cell::RefCell, rc::Rc};

use crate::conv::RecodeTable;

use other::OtherPlugin;

/// Structural type of a character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharsetType {
    /// 94 printable cells, GL columns 02..07.
    Cells94,
    /// 96 cells, the full GR range.
    Cells96,
    /// 128 cells, the full high half.
    Cells128,
    /// Two-byte, 94 rows of 94 cells.
    Matrix9494,
    /// Two-byte, 96 rows of 96 cells.
    Matrix9696,
    /// Two-byte, 94 rows of 192 cells (Big 5 layout).
    Matrix94192,
    /// Outside the ISO-2022 model entirely; handled by a stateful plugin.
    Other,
}

impl CharsetType {
    /// Number of codes a recode table for this type spans.
    #[must_use]
    pub const fn code_space(self) -> usize {
        match self {
            Self::Cells94 | Self::Cells96 | Self::Cells128 => 0x100,
            Self::Matrix9494 | Self::Matrix9696 | Self::Matrix94192 | Self::Other => 0x1_0000,
        }
    }

    /// Short structural description, used by the diagnostic report.
    #[must_use]
    pub const fn cells(self) -> &'static str {
        match self {
            Self::Cells94 => "94 codes",
            Self::Cells96 => "96 codes",
            Self::Cells128 => "128 codes",
            Self::Matrix9494 => "94x94 codes",
            Self::Matrix9696 => "96x96 codes",
            Self::Matrix94192 => "94x192 codes",
            Self::Other => "non-ISO-2022",
        }
    }
}

pub(crate) enum CharsetKind {
    /// Placeholder: identity recode, reverse always misses.
    Unknown,
    /// An ISO-2022 set backed by a recode table; `shift` positions the
    /// set's codes within the table's code space (0x80 for GR sets,
    /// 0x8000 for shifted two-byte sets).
    Table { table: Rc<RecodeTable>, shift: u32 },
    /// A stateful multibyte encoding with per-instance state.
    Other {
        plugin: OtherPlugin,
        state: RefCell<OtherState>,
    },
}

/// One resolved character set.
pub struct Charset {
    name: Cow<'static, str>,
    ctype: CharsetType,
    final_byte: u8,
    kind: CharsetKind,
}

const fn is_gl(code: u32) -> bool {
    code >= 0x20 && code < 0x80
}

impl Charset {
    pub(crate) fn new(name: Cow<'static, str>, ctype: CharsetType, final_byte: u8, kind: CharsetKind) -> Self {
        Self {
            name,
            ctype,
            final_byte,
            kind,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structural type; fixed at construction.
    #[must_use]
    pub const fn charset_type(&self) -> CharsetType {
        self.ctype
    }

    /// The ISO-2022 designator final byte, 0 when not applicable.
    #[must_use]
    pub const fn final_byte(&self) -> u8 {
        self.final_byte
    }

    /// Whether this is the unresolved placeholder.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self.kind, CharsetKind::Unknown)
    }

    /// Map a code in this set's code space to a Unicode scalar.
    #[must_use]
    pub fn recode(&self, code: u32) -> u32 {
        match &self.kind {
            CharsetKind::Unknown => code,
            CharsetKind::Table { table, shift } => table.lookup(code + shift),
            CharsetKind::Other { plugin, state } => plugin.mapping(code, &mut state.borrow_mut()),
        }
    }

    /// Map a Unicode scalar back to a code in this set, or `None`.
    ///
    /// For ISO-2022 sets the raw reverse-table result is validated against
    /// the structural type's legal range; the table may legitimately map to
    /// codes outside the graphic range, and those are rejected here.
    #[must_use]
    pub fn reverse(&self, scalar: u32) -> Option<u32> {
        match &self.kind {
            CharsetKind::Unknown => None,
            CharsetKind::Table { table, shift } => {
                let raw = table.reverse_lookup(scalar);
                if raw == 0 || raw < *shift {
                    return None;
                }
                let code = raw - shift;
                let valid = match self.ctype {
                    CharsetType::Cells94 | CharsetType::Cells96 => is_gl(code),
                    CharsetType::Cells128 => code < 0x80,
                    CharsetType::Matrix9494 | CharsetType::Matrix9696 => {
                        is_gl(code >> 8) && is_gl(code & 0xff)
                    }
                    CharsetType::Matrix94192 => is_gl(code >> 8) && is_gl(code & 0x7f),
                    // A table-backed charset is never constructed with the
                    // Other structural type.
                    CharsetType::Other => unreachable!("table-backed charset with Other type"),
                };
                valid.then_some(code)
            }
            CharsetKind::Other { plugin, state } => plugin.reverse(scalar, &mut state.borrow_mut()),
        }
    }

    /// Feed one input byte to a stateful multibyte set.
    ///
    /// Returns the completed unit's code when the byte finishes a unit,
    /// `None` while more bytes are pending. For non-stateful sets the byte
    /// itself is the unit.
    #[must_use]
    pub fn stack(&self, byte: u8) -> Option<u32> {
        match &self.kind {
            CharsetKind::Other { plugin, state } => plugin.stack(byte, &mut state.borrow_mut()),
            _ => Some(u32::from(byte)),
        }
    }
}

impl std::fmt::Debug for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Charset")
            .field("name", &self.name)
            .field("type", &self.ctype)
            .field("final", &(self.final_byte as char))
            .finish_non_exhaustive()
    }
}
