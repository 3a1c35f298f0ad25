//! Glyph substitution (`gsub`) implementation.
//!
//! > The Glyph Substitution (GSUB) table provides data for substition of glyphs for appropriate
//! > rendering of scripts, such as cursively-connecting forms in Arabic script, or for advanced
//! > typographic effects, such as ligatures.
//!
//! — <https://docs.microsoft.com/en-us/typography/opentype/spec/gsub>
//!
//! Contextual lookups (types 5 and 6) match a rule around a start glyph and then invoke other
//! lookups on single glyphs inside the matched input. Those nested invocations go through
//! [ApplyLookup], which carries a recursion limit so that cyclic lookup references are rejected
//! instead of recursing without bound.

use log::{debug, warn};

use crate::context::{ContextLookupHelper, MatchType, SkipGlyph};
use crate::error::ParseError;
use crate::glyph::{Glyph, GlyphData, GlyphOrigin, RawGlyph, RawGlyphFlags};
use crate::layout::{
    ContextSubst, Ligature, LigatureSubst, LookupList, MultipleSubst, SequenceTable, SingleSubst,
    SubstLookup,
};

/// Default depth to which contextual lookups may invoke other contextual lookups.
pub const SUBST_RECURSION_LIMIT: usize = 2;

/// Largest accepted recursion limit. Each level is a stack frame of nested application.
pub const MAX_RECURSION_LIMIT: usize = 6;

type SubstContext<'a> = ContextLookupHelper<'a>;

/// Applies a lookup to the single glyph at `index`, on behalf of a contextual substitution.
///
/// Implementations may replace the glyph with any number of glyphs. Contextual lookups reached
/// through this call must fail with `ParseError::LimitExceeded` when `recursion_limit` is zero,
/// and otherwise pass `recursion_limit - 1` to their own nested lookups.
pub trait ApplyLookup<T> {
    fn apply_lookup(
        &self,
        lookup_index: usize,
        recursion_limit: usize,
        glyphs: &mut Vec<RawGlyph<T>>,
        index: usize,
    ) -> Result<bool, ParseError>;
}

/// Nested lookup invoker backed by a font's lookup list.
#[derive(Copy, Clone)]
pub struct SubstApplier<'a> {
    lookup_list: &'a LookupList,
    skip: &'a dyn SkipGlyph,
}

impl<'a> SubstApplier<'a> {
    pub fn new(lookup_list: &'a LookupList, skip: &'a dyn SkipGlyph) -> SubstApplier<'a> {
        SubstApplier { lookup_list, skip }
    }
}

impl<'a, T: GlyphData> ApplyLookup<T> for SubstApplier<'a> {
    fn apply_lookup(
        &self,
        lookup_index: usize,
        recursion_limit: usize,
        glyphs: &mut Vec<RawGlyph<T>>,
        index: usize,
    ) -> Result<bool, ParseError> {
        let lookup = self.lookup_list.lookup(lookup_index)?;
        let match_type = MatchType::new(lookup.lookup_flag, self.skip);
        if index >= glyphs.len() {
            return Ok(false);
        }
        match lookup.lookup_subtables {
            SubstLookup::SingleSubst(ref subtables) => Ok(singlesubst(subtables, index, glyphs)),
            SubstLookup::MultipleSubst(ref subtables) => {
                Ok(multiplesubst(subtables, index, glyphs).is_some())
            }
            SubstLookup::LigatureSubst(ref subtables) => {
                Ok(ligaturesubst(match_type, subtables, index, glyphs)?.is_some())
            }
            SubstLookup::ContextSubst(ref subtables)
            | SubstLookup::ChainContextSubst(ref subtables) => {
                if recursion_limit > 0 {
                    let result = contextsubst(
                        recursion_limit - 1,
                        self,
                        subtables,
                        match_type,
                        index,
                        glyphs,
                    )?;
                    Ok(result.map_or(false, |(_length, changes)| changes))
                } else {
                    debug!("nested lookup {} exceeds recursion limit", lookup_index);
                    Err(ParseError::LimitExceeded)
                }
            }
        }
    }
}

/// Apply one lookup to the whole glyph run in a single left-to-right pass.
///
/// Returns whether any substitution occurred.
pub fn gsub_apply_lookup<T: GlyphData>(
    lookup_list: &LookupList,
    skip: &dyn SkipGlyph,
    lookup_index: usize,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Result<bool, ParseError> {
    let lookup = lookup_list.lookup(lookup_index)?;
    let match_type = MatchType::new(lookup.lookup_flag, skip);
    let mut changes = false;
    match lookup.lookup_subtables {
        SubstLookup::SingleSubst(ref subtables) => {
            for i in 0..glyphs.len() {
                if match_type.match_glyph(&glyphs[i]) {
                    changes |= singlesubst(subtables, i, glyphs);
                }
            }
        }
        SubstLookup::MultipleSubst(ref subtables) => {
            let mut i = 0;
            while i < glyphs.len() {
                if match_type.match_glyph(&glyphs[i]) {
                    match multiplesubst(subtables, i, glyphs) {
                        Some(replace_count) => {
                            changes = true;
                            i += replace_count;
                        }
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
        SubstLookup::LigatureSubst(ref subtables) => {
            let mut i = 0;
            while i < glyphs.len() {
                if match_type.match_glyph(&glyphs[i]) {
                    match ligaturesubst(match_type, subtables, i, glyphs)? {
                        Some((_removed_count, skip_count)) => {
                            changes = true;
                            i += skip_count + 1;
                        }
                        None => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
        }
        SubstLookup::ContextSubst(ref subtables)
        | SubstLookup::ChainContextSubst(ref subtables) => {
            let applier = SubstApplier::new(lookup_list, skip);
            changes = gsub_apply_context_lookup(
                subtables,
                match_type,
                &applier,
                lookup_list.recursion_limit(),
                glyphs,
            )?;
        }
    }
    Ok(changes)
}

/// Scan the run with a contextual lookup, applying the first matching rule at each position.
///
/// A start glyph the lookup flag skips is passed over. After a match the scan resumes at the
/// start position plus the context length measured before any nested lookup ran, whatever the
/// nested lookups did to the run length. Otherwise it moves on by one glyph.
pub fn gsub_apply_context_lookup<T: GlyphData>(
    subtables: &[ContextSubst],
    match_type: MatchType<'_>,
    nested: &impl ApplyLookup<T>,
    recursion_limit: usize,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Result<bool, ParseError> {
    let mut changes = false;
    let mut i = 0;
    while i < glyphs.len() {
        if match_type.match_glyph(&glyphs[i]) {
            match contextsubst(recursion_limit, nested, subtables, match_type, i, glyphs)? {
                Some((length, changed)) => {
                    changes |= changed;
                    i += length;
                }
                None => i += 1,
            }
        } else {
            i += 1;
        }
    }
    Ok(changes)
}

/// Would the lookup change the glyph at `i`? The run is not modified.
pub fn gsub_lookup_would_apply<G: Glyph>(
    lookup_list: &LookupList,
    skip: &dyn SkipGlyph,
    lookup_index: usize,
    glyphs: &[G],
    i: usize,
) -> Result<bool, ParseError> {
    let lookup = lookup_list.lookup(lookup_index)?;
    let match_type = MatchType::new(lookup.lookup_flag, skip);
    if i >= glyphs.len() || !match_type.match_glyph(&glyphs[i]) {
        return Ok(false);
    }
    let glyph_index = glyphs[i].get_glyph_index();
    let would_apply = match lookup.lookup_subtables {
        SubstLookup::SingleSubst(ref subtables) => {
            singlesubst_would_apply(subtables, glyph_index).is_some()
        }
        SubstLookup::MultipleSubst(ref subtables) => {
            multiplesubst_would_apply(subtables, glyph_index).is_some()
        }
        SubstLookup::LigatureSubst(ref subtables) => {
            ligaturesubst_would_apply(match_type, subtables, i, glyphs).is_some()
        }
        SubstLookup::ContextSubst(ref subtables)
        | SubstLookup::ChainContextSubst(ref subtables) => {
            contextsubst_would_apply(subtables, match_type, i, glyphs).is_some()
        }
    };
    Ok(would_apply)
}

/// Apply a sequence of lookups to the run in order, then replace any glyph index the font does
/// not have with glyph 0.
pub fn gsub_apply_lookups<T: GlyphData>(
    lookup_list: &LookupList,
    skip: &dyn SkipGlyph,
    lookup_indices: &[usize],
    num_glyphs: u16,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Result<bool, ParseError> {
    let mut changes = false;
    for &lookup_index in lookup_indices {
        changes |= gsub_apply_lookup(lookup_list, skip, lookup_index, glyphs)?;
    }
    replace_missing_glyphs(glyphs, num_glyphs);
    Ok(changes)
}

pub fn replace_missing_glyphs<T: GlyphData>(glyphs: &mut [RawGlyph<T>], num_glyphs: u16) {
    for glyph in glyphs.iter_mut() {
        if glyph.glyph_index >= num_glyphs {
            glyph.unicodes.clear();
            glyph.glyph_index = 0;
            glyph.liga_component_pos = 0;
            glyph.glyph_origin = GlyphOrigin::Direct;
            glyph.flags = RawGlyphFlags::empty();
        }
    }
}

fn singlesubst_would_apply(subtables: &[SingleSubst], glyph_index: u16) -> Option<u16> {
    subtables
        .iter()
        .find_map(|single_subst| single_subst.apply_glyph(glyph_index))
}

fn singlesubst<T: GlyphData>(
    subtables: &[SingleSubst],
    i: usize,
    glyphs: &mut [RawGlyph<T>],
) -> bool {
    match singlesubst_would_apply(subtables, glyphs[i].glyph_index) {
        Some(output_glyph) => {
            glyphs[i].replace_index(output_glyph);
            true
        }
        None => false,
    }
}

fn multiplesubst_would_apply(
    subtables: &[MultipleSubst],
    glyph_index: u16,
) -> Option<&SequenceTable> {
    subtables
        .iter()
        .find_map(|multiple_subst| multiple_subst.apply_glyph(glyph_index))
}

/// Returns the number of glyphs now in place of `glyphs[i]`.
fn multiplesubst<T: GlyphData>(
    subtables: &[MultipleSubst],
    i: usize,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Option<usize> {
    let sequence_table = multiplesubst_would_apply(subtables, glyphs[i].glyph_index)?;
    match sequence_table.substitute_glyphs.split_first() {
        Some((&first_glyph_index, rest)) => {
            let duplicates = rest
                .iter()
                .map(|&output_glyph_index| glyphs[i].duplicate_as(output_glyph_index))
                .collect::<Vec<_>>();
            glyphs[i].replace_index(first_glyph_index);
            for (j, glyph) in duplicates.into_iter().enumerate() {
                glyphs.insert(i + 1 + j, glyph);
            }
            Some(sequence_table.substitute_glyphs.len())
        }
        None => {
            // OpenType forbids empty sequences but shapers accept them
            glyphs.remove(i);
            Some(0)
        }
    }
}

fn ligaturesubst_would_apply<'a, G: Glyph>(
    match_type: MatchType<'_>,
    subtables: &'a [LigatureSubst],
    i: usize,
    glyphs: &[G],
) -> Option<&'a Ligature> {
    let glyph_index = glyphs[i].get_glyph_index();
    subtables
        .iter()
        .filter_map(|ligature_subst| ligature_subst.apply_glyph(glyph_index))
        .flat_map(|ligatureset| &ligatureset.ligatures)
        .find(|ligature| ligature.matches(match_type, i, glyphs))
}

/// Returns the number of component glyphs merged and the number of skipped glyphs passed over.
fn ligaturesubst<T: GlyphData>(
    match_type: MatchType<'_>,
    subtables: &[LigatureSubst],
    i: usize,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Result<Option<(usize, usize)>, ParseError> {
    match ligaturesubst_would_apply(match_type, subtables, i, &glyphs[..]) {
        Some(ligature) => Ok(Some((
            ligature.component_glyphs.len(),
            ligature.apply(match_type, i, glyphs)?,
        ))),
        None => Ok(None),
    }
}

impl Ligature {
    pub fn matches<G: Glyph>(&self, match_type: MatchType<'_>, i: usize, glyphs: &[G]) -> bool {
        match_type
            .match_front(&self.component_glyphs, glyphs, i, None)
            .is_some()
    }

    /// Merge the components into `glyphs[i]`, returning how many skipped glyphs were passed over.
    /// Must only be called after `matches` succeeded at `i`.
    pub fn apply<T: GlyphData>(
        &self,
        match_type: MatchType<'_>,
        i: usize,
        glyphs: &mut Vec<RawGlyph<T>>,
    ) -> Result<usize, ParseError> {
        let mut index = i + 1;
        let mut matched = 0;
        let mut skip = 0;
        while matched < self.component_glyphs.len() && index < glyphs.len() {
            if match_type.match_glyph(&glyphs[index]) {
                matched += 1;
                let component = glyphs.remove(index);
                glyphs[i].unicodes.extend(component.unicodes);
                glyphs[i].extra_data =
                    GlyphData::merge(glyphs[i].extra_data.clone(), component.extra_data);
            } else {
                glyphs[index].liga_component_pos = u16::try_from(matched)?;
                skip += 1;
                index += 1;
            }
        }
        glyphs[i].replace_index(self.ligature_glyph);
        glyphs[i].flags |= RawGlyphFlags::LIGATURE;
        Ok(skip)
    }
}

/// First rule, across subtables in order and rules in priority order, whose context matches at
/// `i`. The glyph at `i` selects candidate rules through each subtable's coverage.
pub fn contextsubst_would_apply<'a, G: Glyph>(
    subtables: &'a [ContextSubst],
    match_type: MatchType<'_>,
    i: usize,
    glyphs: &[G],
) -> Option<SubstContext<'a>> {
    let glyph_index = glyphs.get(i)?.get_glyph_index();
    subtables
        .iter()
        .flat_map(|context_subst| context_subst.rules_for_glyph(glyph_index))
        .find_map(|rule| {
            rule.match_context()
                .matches(match_type, glyphs, i)
                .map(|context_match| SubstContext::new(context_match, rule.lookup_records()))
        })
}

/// Try the lookup's rules at `i` and apply the first that matches.
///
/// Returns the context length of the match as it was before any nested lookup ran, and whether
/// the run changed, or `None` if no rule matched.
pub fn contextsubst<T: GlyphData>(
    recursion_limit: usize,
    nested: &impl ApplyLookup<T>,
    subtables: &[ContextSubst],
    match_type: MatchType<'_>,
    i: usize,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Result<Option<(usize, bool)>, ParseError> {
    match contextsubst_would_apply(subtables, match_type, i, &glyphs[..]) {
        Some(subst) => apply_subst_context(recursion_limit, nested, &subst, glyphs).map(Some),
        None => Ok(None),
    }
}

fn apply_subst_context<T: GlyphData>(
    recursion_limit: usize,
    nested: &impl ApplyLookup<T>,
    subst: &SubstContext<'_>,
    glyphs: &mut Vec<RawGlyph<T>>,
) -> Result<(usize, bool), ParseError> {
    let len = subst.context_match.context_length();
    let mut changes = false;
    let mut positions = subst.context_match.clone();
    for record in subst.lookup_array {
        let subst_index = usize::from(record.sequence_index);
        let index = match positions.positions().get(subst_index) {
            Some(&index) => index,
            None => continue,
        };
        if index >= glyphs.len() {
            // earlier nested lookups removed glyphs from the end of the match
            warn!(
                "skipping substitution at input position {}: run has {} glyphs",
                subst_index,
                glyphs.len()
            );
            continue;
        }
        let orig_len = glyphs.len();
        changes |= nested.apply_lookup(
            usize::from(record.lookup_index),
            recursion_limit,
            glyphs,
            index,
        )?;
        let delta = glyphs.len() as isize - orig_len as isize;
        if delta != 0 {
            changes = true;
            positions.shift_after(subst_index, delta);
        }
    }
    Ok((len, changes))
}
