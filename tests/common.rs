#![allow(dead_code)]

use contextual_subst::context::LookupFlag;
use contextual_subst::glyph::RawGlyph;
use contextual_subst::layout::{
    ChainSubRule, ContextRule, ContextSubst, Lookup, SingleSubst, SubRule, SubstLookup,
    SubstLookupRecord,
};

pub fn make_glyph(glyph_index: u16) -> RawGlyph<()> {
    let ch = char::from_u32(0x41 + u32::from(glyph_index)).unwrap_or('A');
    RawGlyph::new(ch, glyph_index, ())
}

pub fn glyph_run(glyph_indices: &[u16]) -> Vec<RawGlyph<()>> {
    glyph_indices.iter().copied().map(make_glyph).collect()
}

pub fn record(sequence_index: u16, lookup_index: u16) -> SubstLookupRecord {
    SubstLookupRecord {
        sequence_index,
        lookup_index,
    }
}

pub fn simple_rule(input: &[u16], records: &[SubstLookupRecord]) -> ContextRule {
    ContextRule::Simple(SubRule::new(input.to_vec(), records.to_vec()))
}

pub fn chain_rule(
    backtrack: &[u16],
    input: &[u16],
    lookahead: &[u16],
    records: &[SubstLookupRecord],
) -> ContextRule {
    ContextRule::Chaining(ChainSubRule::new(
        backtrack.to_vec(),
        input.to_vec(),
        lookahead.to_vec(),
        records.to_vec(),
    ))
}

pub fn single_lookup(mapping: &[(u16, u16)]) -> Lookup {
    Lookup::new(
        LookupFlag::default(),
        SubstLookup::SingleSubst(vec![SingleSubst::new(mapping.iter().copied())]),
    )
}

pub fn context_lookup(lookup_flag: LookupFlag, start_glyph: u16, rules: Vec<ContextRule>) -> Lookup {
    let subst = ContextSubst::new([(start_glyph, rules)]).expect("invalid context rules");
    Lookup::new(lookup_flag, SubstLookup::ContextSubst(vec![subst]))
}

pub fn chain_context_lookup(
    lookup_flag: LookupFlag,
    start_glyph: u16,
    rules: Vec<ContextRule>,
) -> Lookup {
    let subst = ContextSubst::new([(start_glyph, rules)]).expect("invalid context rules");
    Lookup::new(lookup_flag, SubstLookup::ChainContextSubst(vec![subst]))
}
