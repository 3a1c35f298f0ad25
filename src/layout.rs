//! Decoded substitution lookup tables.
//!
//! These structures are built once by the font table decoder and are read-only afterwards, so a
//! [LookupList] can be shared between threads shaping with the same font. All index validation
//! happens when they are constructed; an invalid table is never handed to the matching code.

use log::debug;
use rustc_hash::FxHashMap;

use crate::context::{LookupFlag, MatchContext};
use crate::error::ParseError;
use crate::gsub::{MAX_RECURSION_LIMIT, SUBST_RECURSION_LIMIT};

/// Invoke lookup `lookup_index` on the glyph at `sequence_index` within the matched input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubstLookupRecord {
    pub sequence_index: u16,
    pub lookup_index: u16,
}

/// Plain context rule: input glyphs following the start glyph.
#[derive(Clone, Debug)]
pub struct SubRule {
    input_sequence: Vec<u16>,
    lookup_records: Vec<SubstLookupRecord>,
}

/// Chaining context rule: input glyphs plus the glyphs required before and after them.
#[derive(Clone, Debug)]
pub struct ChainSubRule {
    backtrack_sequence: Vec<u16>,
    input_sequence: Vec<u16>,
    lookahead_sequence: Vec<u16>,
    lookup_records: Vec<SubstLookupRecord>,
}

#[derive(Clone, Debug)]
pub enum ContextRule {
    Simple(SubRule),
    Chaining(ChainSubRule),
}

/// Rules of a contextual subtable keyed by start glyph. The rules under a glyph are tried in
/// order and the first that matches wins.
#[derive(Clone, Debug, Default)]
pub struct ContextSubst {
    rulesets: FxHashMap<u16, Vec<ContextRule>>,
}

#[derive(Clone, Debug, Default)]
pub struct SingleSubst {
    mapping: FxHashMap<u16, u16>,
}

#[derive(Clone, Debug, Default)]
pub struct MultipleSubst {
    sequences: FxHashMap<u16, SequenceTable>,
}

#[derive(Clone, Debug)]
pub struct SequenceTable {
    pub substitute_glyphs: Vec<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LigatureSubst {
    ligaturesets: FxHashMap<u16, LigatureSet>,
}

#[derive(Clone, Debug, Default)]
pub struct LigatureSet {
    pub ligatures: Vec<Ligature>,
}

/// A ligature replacing its first glyph and `component_glyphs` with `ligature_glyph`.
#[derive(Clone, Debug)]
pub struct Ligature {
    pub ligature_glyph: u16,
    pub component_glyphs: Vec<u16>,
}

#[derive(Clone, Debug)]
pub enum SubstLookup {
    SingleSubst(Vec<SingleSubst>),
    MultipleSubst(Vec<MultipleSubst>),
    LigatureSubst(Vec<LigatureSubst>),
    ContextSubst(Vec<ContextSubst>),
    ChainContextSubst(Vec<ContextSubst>),
}

#[derive(Clone, Debug)]
pub struct Lookup {
    pub lookup_flag: LookupFlag,
    pub lookup_subtables: SubstLookup,
}

#[derive(Clone, Debug)]
pub struct LookupList {
    lookups: Vec<Lookup>,
    recursion_limit: usize,
}

impl SubRule {
    pub fn new(input_sequence: Vec<u16>, lookup_records: Vec<SubstLookupRecord>) -> SubRule {
        SubRule {
            input_sequence,
            lookup_records,
        }
    }
}

impl ChainSubRule {
    pub fn new(
        backtrack_sequence: Vec<u16>,
        input_sequence: Vec<u16>,
        lookahead_sequence: Vec<u16>,
        lookup_records: Vec<SubstLookupRecord>,
    ) -> ChainSubRule {
        ChainSubRule {
            backtrack_sequence,
            input_sequence,
            lookahead_sequence,
            lookup_records,
        }
    }
}

impl ContextRule {
    /// Input glyphs after the start glyph. The start glyph is selected by coverage and is not
    /// part of this sequence.
    pub fn input_sequence(&self) -> &[u16] {
        match self {
            ContextRule::Simple(rule) => &rule.input_sequence,
            ContextRule::Chaining(rule) => &rule.input_sequence,
        }
    }

    pub fn backtrack_sequence(&self) -> Option<&[u16]> {
        match self {
            ContextRule::Simple(_) => None,
            ContextRule::Chaining(rule) => Some(&rule.backtrack_sequence),
        }
    }

    pub fn lookahead_sequence(&self) -> Option<&[u16]> {
        match self {
            ContextRule::Simple(_) => None,
            ContextRule::Chaining(rule) => Some(&rule.lookahead_sequence),
        }
    }

    pub fn lookup_records(&self) -> &[SubstLookupRecord] {
        match self {
            ContextRule::Simple(rule) => &rule.lookup_records,
            ContextRule::Chaining(rule) => &rule.lookup_records,
        }
    }

    /// Number of input glyphs including the start glyph.
    pub fn context_length(&self) -> usize {
        self.input_sequence().len() + 1
    }

    pub fn match_context(&self) -> MatchContext<'_> {
        MatchContext {
            backtrack_table: self.backtrack_sequence(),
            input_table: self.input_sequence(),
            lookahead_table: self.lookahead_sequence(),
        }
    }

    fn is_chaining(&self) -> bool {
        matches!(self, ContextRule::Chaining(_))
    }

    fn check_records(&self, num_lookups: usize) -> Result<(), ParseError> {
        let context_length = self.context_length();
        for record in self.lookup_records() {
            if usize::from(record.sequence_index) >= context_length
                || usize::from(record.lookup_index) >= num_lookups
            {
                return Err(ParseError::BadIndex);
            }
        }
        Ok(())
    }
}

impl ContextSubst {
    /// Build the index from the rule sets of each covered start glyph.
    ///
    /// Fails with `BadIndex` if a substitution record addresses a glyph outside its rule's input.
    pub fn new(
        rulesets: impl IntoIterator<Item = (u16, Vec<ContextRule>)>,
    ) -> Result<ContextSubst, ParseError> {
        let mut map = FxHashMap::default();
        for (glyph, rules) in rulesets {
            for rule in &rules {
                rule.check_records(usize::from(u16::MAX) + 1)?;
            }
            map.entry(glyph).or_insert_with(Vec::new).extend(rules);
        }
        Ok(ContextSubst { rulesets: map })
    }

    /// Candidate rules for a start glyph in priority order; empty if the glyph is not covered.
    pub fn rules_for_glyph(&self, glyph: u16) -> &[ContextRule] {
        self.rulesets
            .get(&glyph)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn covers(&self, glyph: u16) -> bool {
        self.rulesets.contains_key(&glyph)
    }

    fn rules(&self) -> impl Iterator<Item = &ContextRule> {
        self.rulesets.values().flatten()
    }
}

impl SingleSubst {
    pub fn new(mapping: impl IntoIterator<Item = (u16, u16)>) -> SingleSubst {
        SingleSubst {
            mapping: mapping.into_iter().collect(),
        }
    }

    /// Map each covered glyph by adding `delta_glyph_index`, modulo 65536.
    pub fn with_delta(
        coverage: impl IntoIterator<Item = u16>,
        delta_glyph_index: i16,
    ) -> SingleSubst {
        SingleSubst::new(
            coverage
                .into_iter()
                .map(|glyph| (glyph, glyph.wrapping_add_signed(delta_glyph_index))),
        )
    }

    pub fn apply_glyph(&self, glyph: u16) -> Option<u16> {
        self.mapping.get(&glyph).copied()
    }
}

impl MultipleSubst {
    pub fn new(sequences: impl IntoIterator<Item = (u16, Vec<u16>)>) -> MultipleSubst {
        MultipleSubst {
            sequences: sequences
                .into_iter()
                .map(|(glyph, substitute_glyphs)| (glyph, SequenceTable { substitute_glyphs }))
                .collect(),
        }
    }

    pub fn apply_glyph(&self, glyph: u16) -> Option<&SequenceTable> {
        self.sequences.get(&glyph)
    }
}

impl LigatureSubst {
    pub fn new(ligaturesets: impl IntoIterator<Item = (u16, Vec<Ligature>)>) -> LigatureSubst {
        LigatureSubst {
            ligaturesets: ligaturesets
                .into_iter()
                .map(|(glyph, ligatures)| (glyph, LigatureSet { ligatures }))
                .collect(),
        }
    }

    pub fn apply_glyph(&self, glyph: u16) -> Option<&LigatureSet> {
        self.ligaturesets.get(&glyph)
    }
}

impl Lookup {
    pub fn new(lookup_flag: LookupFlag, lookup_subtables: SubstLookup) -> Lookup {
        Lookup {
            lookup_flag,
            lookup_subtables,
        }
    }

    fn validate(&self, num_lookups: usize) -> Result<(), ParseError> {
        let (subtables, chaining) = match self.lookup_subtables {
            SubstLookup::ContextSubst(ref subtables) => (subtables, false),
            SubstLookup::ChainContextSubst(ref subtables) => (subtables, true),
            _ => return Ok(()),
        };
        for rule in subtables.iter().flat_map(|subtable| subtable.rules()) {
            if rule.is_chaining() != chaining {
                return Err(ParseError::BadValue);
            }
            rule.check_records(num_lookups)?;
        }
        Ok(())
    }
}

impl LookupList {
    /// Validate and take ownership of the lookups of a substitution table.
    ///
    /// Every substitution record must name a lookup in this list, and contextual lookups may
    /// only hold rules of their own kind.
    pub fn new(lookups: Vec<Lookup>) -> Result<LookupList, ParseError> {
        let num_lookups = lookups.len();
        for lookup in &lookups {
            lookup.validate(num_lookups)?;
        }
        debug!("built lookup list with {} lookups", num_lookups);
        Ok(LookupList {
            lookups,
            recursion_limit: SUBST_RECURSION_LIMIT,
        })
    }

    /// Set how deeply contextual lookups may invoke other contextual lookups. Values above
    /// `MAX_RECURSION_LIMIT` are clamped to it.
    pub fn with_recursion_limit(mut self, recursion_limit: usize) -> LookupList {
        self.recursion_limit = recursion_limit.min(MAX_RECURSION_LIMIT);
        self
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn lookup(&self, lookup_index: usize) -> Result<&Lookup, ParseError> {
        self.lookups.get(lookup_index).ok_or(ParseError::BadIndex)
    }

    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence_index: u16, lookup_index: u16) -> SubstLookupRecord {
        SubstLookupRecord {
            sequence_index,
            lookup_index,
        }
    }

    fn single_lookup() -> Lookup {
        Lookup::new(
            LookupFlag::default(),
            SubstLookup::SingleSubst(vec![SingleSubst::new([(1, 2)])]),
        )
    }

    #[test]
    fn test_context_length() {
        let simple = ContextRule::Simple(SubRule::new(vec![5, 6], vec![]));
        let chaining =
            ContextRule::Chaining(ChainSubRule::new(vec![3], vec![5, 6], vec![7], vec![]));
        assert_eq!(simple.context_length(), 3);
        assert_eq!(chaining.context_length(), 3);
        assert_eq!(simple.backtrack_sequence(), None);
        assert_eq!(chaining.backtrack_sequence(), Some(&[3][..]));
        assert_eq!(chaining.lookahead_sequence(), Some(&[7][..]));
    }

    #[test]
    fn test_rules_for_glyph_priority() {
        let subst = ContextSubst::new([
            (4, vec![ContextRule::Simple(SubRule::new(vec![5], vec![]))]),
            (4, vec![ContextRule::Simple(SubRule::new(vec![6], vec![]))]),
        ])
        .unwrap();
        let rules = subst.rules_for_glyph(4);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].input_sequence(), &[5]);
        assert_eq!(rules[1].input_sequence(), &[6]);
        assert!(subst.rules_for_glyph(5).is_empty());
        assert!(subst.covers(4));
        assert!(!subst.covers(5));
    }

    #[test]
    fn test_sequence_index_out_of_range() {
        let rule = ContextRule::Simple(SubRule::new(vec![5, 6], vec![record(3, 0)]));
        assert_eq!(
            ContextSubst::new([(4, vec![rule])]).unwrap_err(),
            ParseError::BadIndex
        );
        let rule = ContextRule::Simple(SubRule::new(vec![5, 6], vec![record(2, 0)]));
        assert!(ContextSubst::new([(4, vec![rule])]).is_ok());
    }

    #[test]
    fn test_lookup_index_out_of_range() {
        let rule = ContextRule::Simple(SubRule::new(vec![5], vec![record(1, 2)]));
        let context = Lookup::new(
            LookupFlag::default(),
            SubstLookup::ContextSubst(vec![ContextSubst::new([(4, vec![rule])]).unwrap()]),
        );
        match LookupList::new(vec![single_lookup(), context]) {
            Err(ParseError::BadIndex) => {}
            Err(err) => panic!("expected ParseError::BadIndex got {:?}", err),
            Ok(_) => panic!("expected error got success"),
        }
    }

    #[test]
    fn test_rule_kind_mismatch() {
        let rule = ContextRule::Chaining(ChainSubRule::new(vec![], vec![5], vec![], vec![]));
        let context = Lookup::new(
            LookupFlag::default(),
            SubstLookup::ContextSubst(vec![ContextSubst::new([(4, vec![rule])]).unwrap()]),
        );
        assert_eq!(LookupList::new(vec![context]).unwrap_err(), ParseError::BadValue);
    }

    #[test]
    fn test_lookup_list() {
        let lookup_list = LookupList::new(vec![single_lookup()])
            .unwrap()
            .with_recursion_limit(5);
        assert_eq!(lookup_list.len(), 1);
        assert_eq!(lookup_list.recursion_limit(), 5);
        assert!(lookup_list.lookup(0).is_ok());
        assert_eq!(lookup_list.lookup(1).unwrap_err(), ParseError::BadIndex);
        let lookup_list = lookup_list.with_recursion_limit(usize::MAX);
        assert_eq!(lookup_list.recursion_limit(), MAX_RECURSION_LIMIT);
    }

    #[test]
    fn test_single_subst_delta() {
        let subst = SingleSubst::with_delta([10, 65535], 2);
        assert_eq!(subst.apply_glyph(10), Some(12));
        assert_eq!(subst.apply_glyph(65535), Some(1));
        assert_eq!(subst.apply_glyph(11), None);
    }

    #[test]
    fn test_lookup_list_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LookupList>();
    }
}
