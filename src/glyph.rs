//! Glyphs making up a glyph run.
//!
//! A glyph run is a `Vec<RawGlyph<T>>` owned by a single shaping call. Substitutions rewrite it
//! in place by replacing contiguous spans; glyphs are never reordered.

use bitflags::bitflags;
use itertools::Itertools;
use tinyvec::{tiny_vec, TinyVec};

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct RawGlyphFlags: u8 {
        /// Glyph was produced by a multiple substitution after the first output glyph.
        const MULTI_SUBST_DUP = 1 << 0;
        /// Glyph is the result of a ligature substitution.
        const LIGATURE = 1 << 1;
    }
}

#[derive(Clone, Debug)]
pub struct RawGlyph<T> {
    pub unicodes: TinyVec<[char; 1]>,
    pub glyph_index: u16,
    pub liga_component_pos: u16,
    pub glyph_origin: GlyphOrigin,
    pub flags: RawGlyphFlags,
    pub extra_data: T,
}

/// `merge` is called during ligature substitution (i.e. merging of glyphs),
/// and determines how the `RawGlyph.extra_data` field should be merged
pub trait GlyphData: Clone {
    fn merge(data1: Self, data2: Self) -> Self;
}

impl GlyphData for () {
    fn merge(_data1: (), _data2: ()) {}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GlyphOrigin {
    Char(char),
    Direct,
}

/// Anything that can be matched against a rule.
pub trait Glyph {
    fn get_glyph_index(&self) -> u16;
}

impl<T> Glyph for RawGlyph<T> {
    fn get_glyph_index(&self) -> u16 {
        self.glyph_index
    }
}

impl Glyph for u16 {
    fn get_glyph_index(&self) -> u16 {
        *self
    }
}

impl<T: GlyphData> RawGlyph<T> {
    pub fn new(ch: char, glyph_index: u16, extra_data: T) -> RawGlyph<T> {
        RawGlyph {
            unicodes: tiny_vec![[char; 1] => ch],
            glyph_index,
            liga_component_pos: 0,
            glyph_origin: GlyphOrigin::Char(ch),
            flags: RawGlyphFlags::empty(),
            extra_data,
        }
    }

    /// A glyph with no associated character, e.g. one inserted by the caller.
    pub fn direct(glyph_index: u16, extra_data: T) -> RawGlyph<T> {
        RawGlyph {
            unicodes: TinyVec::new(),
            glyph_index,
            liga_component_pos: 0,
            glyph_origin: GlyphOrigin::Direct,
            flags: RawGlyphFlags::empty(),
            extra_data,
        }
    }

    /// Copy of this glyph carrying a different glyph index, used for the extra output glyphs
    /// of a multiple substitution.
    pub(crate) fn duplicate_as(&self, glyph_index: u16) -> RawGlyph<T> {
        RawGlyph {
            unicodes: self.unicodes.clone(),
            glyph_index,
            liga_component_pos: 0,
            glyph_origin: GlyphOrigin::Direct,
            flags: self.flags | RawGlyphFlags::MULTI_SUBST_DUP,
            extra_data: self.extra_data.clone(),
        }
    }

    pub(crate) fn replace_index(&mut self, glyph_index: u16) {
        self.glyph_index = glyph_index;
        self.glyph_origin = GlyphOrigin::Direct;
    }

    pub fn is_multi_subst_dup(&self) -> bool {
        self.flags.contains(RawGlyphFlags::MULTI_SUBST_DUP)
    }

    pub fn is_ligature(&self) -> bool {
        self.flags.contains(RawGlyphFlags::LIGATURE)
    }
}

/// The glyph indices of a run, in order.
pub fn glyph_indices<G: Glyph>(glyphs: &[G]) -> Vec<u16> {
    glyphs.iter().map(Glyph::get_glyph_index).collect_vec()
}
