//! Human-readable enumeration of the compiled-in catalogs.
//!
//! Diagnostic output only; the exact text is not contractual.

use std::io::{self, Write};

use crate::{charset::CharsetRegistry, locale::LOCALE_CHARSETS};

/// Write the known locale encodings and charsets to `out`.
pub fn report_charsets(registry: &CharsetRegistry, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Known locale encodings:")?;
    writeln!(out)?;
    for entry in LOCALE_CHARSETS {
        if let Some(other) = entry.other {
            writeln!(out, "  {other} (non-ISO-2022 encoding)")?;
            continue;
        }
        write!(out, "  {}: GL -> G{}, GR -> G{}", entry.name, entry.gl, entry.gr)?;
        for (index, name) in entry.g.iter().enumerate() {
            if let Some(name) = name {
                write!(out, ", G{index}: {name}")?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "Known charsets (not all may be available):")?;
    writeln!(out)?;
    for entry in registry.catalog_entries() {
        write!(out, "  {}", entry.name)?;
        if entry.final_byte != 0 {
            write!(out, " (ISO 2022, {})", entry.ctype.cells())?;
        } else {
            write!(out, " ({})", entry.ctype.cells())?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::report_charsets;
    use crate::{CharsetRegistry, NullTranscoder};

    #[test]
    fn report_lists_catalogs() {
        let registry = CharsetRegistry::with_transcoder(Box::new(NullTranscoder));
        let mut out = Vec::new();
        report_charsets(&registry, &mut out).expect("writes");
        let text = String::from_utf8(out).expect("utf-8");

        assert!(text.contains("eucJP: GL -> G0, GR -> G1"));
        assert!(text.contains("G3: JIS X 0212"));
        assert!(text.contains("UTF-8 (non-ISO-2022 encoding)"));
        assert!(text.contains("ISO 8859-1 (ISO 2022, 96 codes)"));
        assert!(text.contains("CP 437 (128 codes)"));
    }
}
