//! Shared test code.

use crate::glyph::RawGlyph;
use crate::layout::SubstLookupRecord;

/// A run of glyphs, each standing for the character `'a'` offset by its glyph index.
pub fn glyph_run(glyph_indices: &[u16]) -> Vec<RawGlyph<()>> {
    glyph_indices
        .iter()
        .map(|&glyph_index| {
            let ch = char::from_u32(u32::from('a') + u32::from(glyph_index)).unwrap_or('a');
            RawGlyph::new(ch, glyph_index, ())
        })
        .collect()
}

pub fn record(sequence_index: u16, lookup_index: u16) -> SubstLookupRecord {
    SubstLookupRecord {
        sequence_index,
        lookup_index,
    }
}
