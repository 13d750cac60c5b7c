//! Stateful plugins for the genuinely non-ISO-2022 multibyte encodings.
//!
//! These bypass the ISO-2022 shift-state model: the stream parser feeds
//! bytes through [`OtherPlugin::stack`] until a complete unit is composed,
//! then maps the unit code with [`OtherPlugin::mapping`]. Unit codes are the
//! encoding's own code space: single bytes as themselves, two-byte units as
//! `(hi << 8) | lo`, GB18030 four-byte units packed big-endian into a `u32`.
//! For UTF-8 the unit code is the decoded scalar itself, so mapping is the
//! identity.

use std::rc::Rc;

use crate::{
    common::utf8,
    conv::{RecodeTable, TableCache, Transcode, Transcoder},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OtherPlugin {
    Utf8,
    Sjis,
    Gbk,
    Gb18030,
    Hkscs,
}

/// Per-instance state: the pending-byte buffer plus whatever conversion
/// resources the plugin opened at init.
pub struct OtherState {
    buffer: [u8; 6],
    len: usize,
    need: usize,
    table: Option<Rc<RecodeTable>>,
    forward: Option<Box<dyn Transcode>>,
    reverse: Option<Box<dyn Transcode>>,
}

impl std::fmt::Debug for OtherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtherState")
            .field("pending", &self.len)
            .finish_non_exhaustive()
    }
}

impl OtherState {
    fn new() -> Self {
        Self {
            buffer: [0; 6],
            len: 0,
            need: 0,
            table: None,
            forward: None,
            reverse: None,
        }
    }

    fn reset(&mut self) {
        self.len = 0;
        self.need = 0;
    }

    fn push(&mut self, byte: u8) {
        self.buffer[self.len] = byte;
        self.len += 1;
    }

    fn table_lookup(&self, code: u32) -> u32 {
        self.table.as_ref().map_or(utf8::REPLACEMENT, |t| t.lookup(code))
    }

    fn table_reverse(&self, scalar: u32) -> Option<u32> {
        self.table.as_ref().and_then(|t| t.reverse_find(scalar))
    }
}

const fn sjis_lead(byte: u8) -> bool {
    matches!(byte, 0x81..=0x9f | 0xe0..=0xef)
}

const fn gbk_lead(byte: u8) -> bool {
    matches!(byte, 0x81..=0xfe)
}

const fn hkscs_lead(byte: u8) -> bool {
    matches!(byte, 0x88..=0xfe)
}

impl OtherPlugin {
    /// The facility encoding name backing this plugin's mapping table.
    const fn table_encoding(self) -> Option<&'static str> {
        match self {
            Self::Utf8 => None,
            Self::Sjis => Some("SHIFT_JIS"),
            Self::Gbk => Some("GBK"),
            Self::Gb18030 => Some("GB18030"),
            Self::Hkscs => Some("BIG5-HKSCS"),
        }
    }

    /// Build the plugin's per-instance state. `None` when the conversion
    /// resources the plugin needs are unavailable; the caller marks the
    /// catalog slot failed.
    pub(crate) fn init(self, tables: &mut TableCache, transcoder: &dyn Transcoder) -> Option<OtherState> {
        let mut state = OtherState::new();
        if let Some(encoding) = self.table_encoding() {
            state.table = Some(tables.get_or_build(encoding, 0x1_0000, transcoder).ok()?);
            if self == Self::Gb18030 {
                state.forward = Some(transcoder.open(encoding)?);
                state.reverse = transcoder.open_reverse(encoding);
            }
        }
        Some(state)
    }

    /// Feed one byte; `Some(code)` when a unit completes.
    pub(crate) fn stack(self, byte: u8, state: &mut OtherState) -> Option<u32> {
        match self {
            Self::Utf8 => Self::stack_utf8(byte, state),
            Self::Sjis => Self::stack_dbcs(byte, state, sjis_lead),
            Self::Gbk | Self::Hkscs => Self::stack_dbcs(
                byte,
                state,
                if self == Self::Gbk { gbk_lead } else { hkscs_lead },
            ),
            Self::Gb18030 => Self::stack_gb18030(byte, state),
        }
    }

    fn stack_utf8(byte: u8, state: &mut OtherState) -> Option<u32> {
        if state.len == 0 {
            return match utf8::sequence_len(byte) {
                Some(1) => Some(u32::from(byte)),
                Some(need) => {
                    state.push(byte);
                    state.need = need;
                    None
                }
                // Stray continuation byte or invalid lead.
                None => Some(utf8::REPLACEMENT),
            };
        }
        if byte & 0xc0 == 0x80 {
            state.push(byte);
            if state.len < state.need {
                return None;
            }
            let decoded = utf8::decode(&state.buffer[..state.len]).map(|(scalar, _)| scalar);
            state.reset();
            return Some(decoded.unwrap_or(utf8::REPLACEMENT));
        }
        // The pending sequence was cut short; drop it and treat this byte
        // as a fresh lead.
        state.reset();
        Self::stack_utf8(byte, state)
    }

    fn stack_dbcs(byte: u8, state: &mut OtherState, lead: fn(u8) -> bool) -> Option<u32> {
        if state.len == 1 {
            let hi = state.buffer[0];
            state.reset();
            return Some((u32::from(hi) << 8) | u32::from(byte));
        }
        if lead(byte) {
            state.push(byte);
            return None;
        }
        Some(u32::from(byte))
    }

    fn stack_gb18030(byte: u8, state: &mut OtherState) -> Option<u32> {
        match state.len {
            0 => {
                if gbk_lead(byte) {
                    state.push(byte);
                    None
                } else {
                    Some(u32::from(byte))
                }
            }
            1 => {
                if byte.is_ascii_digit() {
                    // Second byte 0x30..0x39 selects the four-byte form.
                    state.push(byte);
                    None
                } else {
                    let hi = state.buffer[0];
                    state.reset();
                    Some((u32::from(hi) << 8) | u32::from(byte))
                }
            }
            2 => {
                if gbk_lead(byte) {
                    state.push(byte);
                    None
                } else {
                    state.reset();
                    Some(utf8::REPLACEMENT)
                }
            }
            _ => {
                let unit = if byte.is_ascii_digit() {
                    (u32::from(state.buffer[0]) << 24)
                        | (u32::from(state.buffer[1]) << 16)
                        | (u32::from(state.buffer[2]) << 8)
                        | u32::from(byte)
                } else {
                    utf8::REPLACEMENT
                };
                state.reset();
                Some(unit)
            }
        }
    }

    /// Map a completed unit code to a Unicode scalar.
    pub(crate) fn mapping(self, code: u32, state: &mut OtherState) -> u32 {
        match self {
            Self::Utf8 => code,
            Self::Gb18030 if code > 0xffff => {
                let bytes = code.to_be_bytes();
                state
                    .forward
                    .as_mut()
                    .and_then(|conv| conv.transcode(&bytes))
                    .and_then(|out| utf8::decode(&out).map(|(scalar, _)| scalar))
                    .unwrap_or(utf8::REPLACEMENT)
            }
            _ => state.table_lookup(code),
        }
    }

    /// Map a Unicode scalar back to a unit code, or `None`.
    pub(crate) fn reverse(self, scalar: u32, state: &mut OtherState) -> Option<u32> {
        match self {
            Self::Utf8 => Some(scalar),
            Self::Gb18030 => state.table_reverse(scalar).or_else(|| {
                let mut buf = [0u8; 6];
                let len = utf8::encode(scalar, &mut buf)?;
                let out = state.reverse.as_mut()?.transcode(&buf[..len])?;
                match out.as_slice() {
                    &[b] => Some(u32::from(b)),
                    &[hi, lo] => Some((u32::from(hi) << 8) | u32::from(lo)),
                    &[b0, b1, b2, b3] => Some(u32::from_be_bytes([b0, b1, b2, b3])),
                    _ => None,
                }
            }),
            _ => state.table_reverse(scalar),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OtherPlugin, OtherState};
    use crate::common::utf8::REPLACEMENT;

    fn state() -> OtherState {
        OtherState::new()
    }

    #[test]
    fn utf8_single_bytes() {
        let mut s = state();
        assert_eq!(OtherPlugin::Utf8.stack(b'A', &mut s), Some(0x41));
        assert_eq!(OtherPlugin::Utf8.mapping(0x41, &mut s), 0x41);
    }

    #[test]
    fn utf8_multibyte_unit() {
        let mut s = state();
        assert_eq!(OtherPlugin::Utf8.stack(0xc2, &mut s), None);
        assert_eq!(OtherPlugin::Utf8.stack(0xa9, &mut s), Some(0x00a9));
    }

    #[test]
    fn utf8_stray_continuation() {
        let mut s = state();
        assert_eq!(OtherPlugin::Utf8.stack(0xa9, &mut s), Some(REPLACEMENT));
    }

    #[test]
    fn utf8_interrupted_sequence() {
        let mut s = state();
        assert_eq!(OtherPlugin::Utf8.stack(0xe2, &mut s), None);
        // An ASCII byte aborts the pending sequence and stands alone.
        assert_eq!(OtherPlugin::Utf8.stack(b'X', &mut s), Some(0x58));
    }

    #[test]
    fn utf8_reverse_is_identity() {
        let mut s = state();
        assert_eq!(OtherPlugin::Utf8.reverse(0x3042, &mut s), Some(0x3042));
    }

    #[test]
    fn sjis_lead_and_trail() {
        let mut s = state();
        assert_eq!(OtherPlugin::Sjis.stack(0x82, &mut s), None);
        assert_eq!(OtherPlugin::Sjis.stack(0xa0, &mut s), Some(0x82a0));
        // Halfwidth katakana is a single-byte code.
        assert_eq!(OtherPlugin::Sjis.stack(0xb1, &mut s), Some(0xb1));
        assert_eq!(OtherPlugin::Sjis.stack(b'A', &mut s), Some(0x41));
    }

    #[test]
    fn gb18030_four_byte_unit() {
        let mut s = state();
        assert_eq!(OtherPlugin::Gb18030.stack(0x81, &mut s), None);
        assert_eq!(OtherPlugin::Gb18030.stack(0x30, &mut s), None);
        assert_eq!(OtherPlugin::Gb18030.stack(0x81, &mut s), None);
        assert_eq!(OtherPlugin::Gb18030.stack(0x30, &mut s), Some(0x8130_8130));
    }

    #[test]
    fn gb18030_two_byte_unit() {
        let mut s = state();
        assert_eq!(OtherPlugin::Gb18030.stack(0xb0, &mut s), None);
        assert_eq!(OtherPlugin::Gb18030.stack(0xa1, &mut s), Some(0xb0a1));
    }

    #[test]
    fn mapping_without_table_is_replacement() {
        // Init failed upstream; a unit still maps, to the replacement.
        let mut s = state();
        assert_eq!(OtherPlugin::Gbk.mapping(0x8140, &mut s), REPLACEMENT);
        assert_eq!(OtherPlugin::Gbk.reverse(0x4e00, &mut s), None);
    }
}
