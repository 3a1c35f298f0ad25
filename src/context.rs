//! Utilities for performing contextual lookup in gsub.
//!
//! Matching walks the glyph run outwards from a start position. Glyphs the active skip predicate
//! ignores are stepped over and do not count towards a pattern.

use tinyvec::{tiny_vec, TinyVec};

use crate::gdef::{self, GDEFTable, GLYPH_CLASS_BASE, GLYPH_CLASS_LIGATURE, GLYPH_CLASS_MARK};
use crate::glyph::Glyph;
use crate::layout::SubstLookupRecord;

/// Run positions of the glyphs matched by a rule's input sequence.
pub type MatchPositions = TinyVec<[usize; 8]>;

/// Lookup flag of a lookup table, together with its mark filtering set when
/// `USE_MARK_FILTERING_SET` is present.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupFlag {
    flag: u16,
    mark_filtering_set: Option<u16>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IgnoreMarks {
    NoIgnoreMarks,
    IgnoreAllMarks,
    IgnoreMarksExcept(u8),
    IgnoreMarksNotInSet(u16),
}

/// Decides whether a glyph is ignored while scanning context under a lookup flag.
pub trait SkipGlyph {
    fn skip_glyph(&self, glyph: u16, lookup_flag: LookupFlag) -> bool;
}

/// Skip predicate that ignores nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoSkip;

#[derive(Copy, Clone)]
pub struct MatchType<'a> {
    lookup_flag: LookupFlag,
    skip: &'a dyn SkipGlyph,
}

/// The patterns a rule requires around its start glyph. Backtrack is in the order encountered
/// scanning backwards, lookahead in forward order. An absent pattern always matches.
#[derive(Copy, Clone, Debug)]
pub struct MatchContext<'a> {
    pub backtrack_table: Option<&'a [u16]>,
    pub input_table: &'a [u16],
    pub lookahead_table: Option<&'a [u16]>,
}

/// A successful match of a rule's context at some run position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextMatch {
    positions: MatchPositions,
}

pub struct ContextLookupHelper<'a> {
    pub context_match: ContextMatch,
    pub lookup_array: &'a [SubstLookupRecord],
}

impl<'a> ContextLookupHelper<'a> {
    pub fn new(
        context_match: ContextMatch,
        lookup_array: &'a [SubstLookupRecord],
    ) -> ContextLookupHelper<'a> {
        ContextLookupHelper {
            context_match,
            lookup_array,
        }
    }
}

impl LookupFlag {
    pub const RIGHT_TO_LEFT: u16 = 0x0001;
    pub const IGNORE_BASE_GLYPHS: u16 = 0x0002;
    pub const IGNORE_LIGATURES: u16 = 0x0004;
    pub const IGNORE_MARKS: u16 = 0x0008;
    pub const USE_MARK_FILTERING_SET: u16 = 0x0010;

    pub fn new(flag: u16) -> LookupFlag {
        LookupFlag {
            flag,
            mark_filtering_set: None,
        }
    }

    pub fn with_mark_filtering_set(flag: u16, mark_filtering_set: u16) -> LookupFlag {
        LookupFlag {
            flag: flag | LookupFlag::USE_MARK_FILTERING_SET,
            mark_filtering_set: Some(mark_filtering_set),
        }
    }

    pub fn get_rtl(self) -> bool {
        (self.flag & LookupFlag::RIGHT_TO_LEFT) != 0
    }

    pub fn get_ignore_bases(self) -> bool {
        (self.flag & LookupFlag::IGNORE_BASE_GLYPHS) != 0
    }

    pub fn get_ignore_ligatures(self) -> bool {
        (self.flag & LookupFlag::IGNORE_LIGATURES) != 0
    }

    pub fn get_ignore_marks(self) -> IgnoreMarks {
        if (self.flag & LookupFlag::IGNORE_MARKS) != 0 {
            IgnoreMarks::IgnoreAllMarks
        } else if let Some(set_index) = self.mark_filtering_set {
            IgnoreMarks::IgnoreMarksNotInSet(set_index)
        } else if self.flag & 0xFF00 != 0 {
            IgnoreMarks::IgnoreMarksExcept((self.flag >> 8) as u8)
        } else {
            IgnoreMarks::NoIgnoreMarks
        }
    }
}

impl SkipGlyph for NoSkip {
    fn skip_glyph(&self, _glyph: u16, _lookup_flag: LookupFlag) -> bool {
        false
    }
}

impl<F> SkipGlyph for F
where
    F: Fn(u16, LookupFlag) -> bool,
{
    fn skip_glyph(&self, glyph: u16, lookup_flag: LookupFlag) -> bool {
        self(glyph, lookup_flag)
    }
}

impl SkipGlyph for GDEFTable {
    fn skip_glyph(&self, glyph: u16, lookup_flag: LookupFlag) -> bool {
        let ignore_marks = lookup_flag.get_ignore_marks();
        if !lookup_flag.get_ignore_bases()
            && !lookup_flag.get_ignore_ligatures()
            && ignore_marks == IgnoreMarks::NoIgnoreMarks
        {
            // fast path that doesn't require checking glyph_class
            return false;
        }
        let glyph_class = gdef::glyph_class(Some(self), glyph);
        if lookup_flag.get_ignore_bases() && glyph_class == GLYPH_CLASS_BASE {
            return true;
        }
        if lookup_flag.get_ignore_ligatures() && glyph_class == GLYPH_CLASS_LIGATURE {
            return true;
        }
        if glyph_class != GLYPH_CLASS_MARK {
            return false;
        }
        match ignore_marks {
            IgnoreMarks::NoIgnoreMarks => false,
            IgnoreMarks::IgnoreAllMarks => true,
            IgnoreMarks::IgnoreMarksExcept(keep_class) => {
                gdef::mark_attach_class(Some(self), glyph) != u16::from(keep_class)
            }
            IgnoreMarks::IgnoreMarksNotInSet(set_index) => {
                !gdef::glyph_is_mark_in_set(Some(self), glyph, usize::from(set_index))
            }
        }
    }
}

impl<'a> MatchType<'a> {
    pub fn new(lookup_flag: LookupFlag, skip: &'a dyn SkipGlyph) -> MatchType<'a> {
        MatchType { lookup_flag, skip }
    }

    /// True when the glyph takes part in matching, i.e. it is not skipped.
    pub fn match_glyph<G: Glyph>(self, glyph: &G) -> bool {
        !self
            .skip
            .skip_glyph(glyph.get_glyph_index(), self.lookup_flag)
    }

    // searches backwards from glyphs[index-1]
    pub fn find_prev<G: Glyph>(self, glyphs: &[G], mut index: usize) -> Option<usize> {
        index = index.min(glyphs.len());
        while index > 0 {
            index -= 1;
            if self.match_glyph(&glyphs[index]) {
                return Some(index);
            }
        }
        None
    }

    // searches forwards from glyphs[index+1]
    pub fn find_next<G: Glyph>(self, glyphs: &[G], mut index: usize) -> Option<usize> {
        while index + 1 < glyphs.len() {
            index += 1;
            if self.match_glyph(&glyphs[index]) {
                return Some(index);
            }
        }
        None
    }

    // searches backwards from glyphs[index-1]
    pub fn match_back<G: Glyph>(self, glyph_table: &[u16], glyphs: &[G], mut index: usize) -> bool {
        for &expected in glyph_table {
            match self.find_prev(glyphs, index) {
                Some(prev_index) => {
                    index = prev_index;
                    if glyphs[index].get_glyph_index() != expected {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    // searches forwards from glyphs[index+1], returns the index of the last glyph matched
    pub fn match_front<G: Glyph>(
        self,
        glyph_table: &[u16],
        glyphs: &[G],
        mut index: usize,
        mut positions: Option<&mut MatchPositions>,
    ) -> Option<usize> {
        for &expected in glyph_table {
            index = self.find_next(glyphs, index)?;
            if glyphs[index].get_glyph_index() != expected {
                return None;
            }
            if let Some(positions) = positions.as_deref_mut() {
                positions.push(index);
            }
        }
        Some(index)
    }
}

impl<'a> MatchContext<'a> {
    /// Match this context with its start glyph at `glyphs[index]`.
    ///
    /// The start glyph itself is not compared; it was selected by coverage. Backtrack is
    /// checked first, then input, then lookahead.
    pub fn matches<G: Glyph>(
        &self,
        match_type: MatchType<'_>,
        glyphs: &[G],
        index: usize,
    ) -> Option<ContextMatch> {
        if index >= glyphs.len() {
            return None;
        }
        if let Some(backtrack_table) = self.backtrack_table {
            if !match_type.match_back(backtrack_table, glyphs, index) {
                return None;
            }
        }
        let mut positions = tiny_vec![[usize; 8] => index];
        let last_index =
            match_type.match_front(self.input_table, glyphs, index, Some(&mut positions))?;
        if let Some(lookahead_table) = self.lookahead_table {
            match_type.match_front(lookahead_table, glyphs, last_index, None)?;
        }
        Some(ContextMatch { positions })
    }
}

impl ContextMatch {
    /// Position of the start glyph.
    pub fn start(&self) -> usize {
        self.positions[0]
    }

    /// Positions of the start glyph and each matched input glyph, in order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of run slots from the start glyph to the last input glyph, including any skipped
    /// glyphs between them.
    pub fn context_length(&self) -> usize {
        let last = self.positions[self.positions.len() - 1];
        last - self.start() + 1
    }

    /// Adjust the positions after input glyph `subst_index` once a nested lookup at that glyph
    /// changed the run length by `delta`. Inserted glyphs are taken to follow the edited glyph
    /// and removed glyphs to be the input glyphs after it; no position moves before it.
    pub(crate) fn shift_after(&mut self, subst_index: usize, delta: isize) {
        let floor = match self.positions.get(subst_index) {
            Some(&position) => position as isize,
            None => return,
        };
        for position in self.positions.iter_mut().skip(subst_index + 1) {
            *position = (*position as isize + delta).max(floor) as usize;
        }
    }
}
