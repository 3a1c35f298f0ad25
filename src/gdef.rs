//! `gdef` glyph class data used to evaluate lookup flags.
//!
//! <https://docs.microsoft.com/en-us/typography/opentype/spec/gdef>
//!
//! These are the decoded, in-memory forms. Reading them from font data is the job of the table
//! decoder.

pub const GLYPH_CLASS_NONE: u16 = 0;
pub const GLYPH_CLASS_BASE: u16 = 1;
pub const GLYPH_CLASS_LIGATURE: u16 = 2;
pub const GLYPH_CLASS_MARK: u16 = 3;

#[derive(Clone, Debug)]
pub enum ClassDef {
    Format1 {
        start_glyph: u16,
        class_value_array: Vec<u16>,
    },
    Format2 {
        class_range_array: Vec<ClassRangeRecord>,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct ClassRangeRecord {
    pub start_glyph: u16,
    pub end_glyph: u16,
    pub class_value: u16,
}

/// Glyphs of one mark filtering set, sorted by glyph index.
#[derive(Clone, Debug)]
pub struct MarkGlyphSet(Vec<u16>);

#[derive(Clone, Debug, Default)]
pub struct GDEFTable {
    pub opt_glyph_classdef: Option<ClassDef>,
    pub opt_mark_attach_classdef: Option<ClassDef>,
    pub opt_mark_glyph_sets: Option<Vec<MarkGlyphSet>>,
}

impl ClassDef {
    pub fn glyph_class_value(&self, glyph: u16) -> u16 {
        match *self {
            ClassDef::Format1 {
                start_glyph,
                ref class_value_array,
            } => {
                if glyph >= start_glyph {
                    class_value_array
                        .get(usize::from(glyph - start_glyph))
                        .copied()
                        .unwrap_or(0)
                } else {
                    0
                }
            }
            ClassDef::Format2 {
                ref class_range_array,
            } => {
                for class_range in class_range_array {
                    if (glyph >= class_range.start_glyph) && (glyph <= class_range.end_glyph) {
                        return class_range.class_value;
                    }
                }
                0
            }
        }
    }
}

impl MarkGlyphSet {
    pub fn new(mut glyphs: Vec<u16>) -> MarkGlyphSet {
        glyphs.sort_unstable();
        glyphs.dedup();
        MarkGlyphSet(glyphs)
    }

    pub fn contains(&self, glyph: u16) -> bool {
        self.0.binary_search(&glyph).is_ok()
    }
}

pub fn gdef_is_mark(opt_gdef_table: Option<&GDEFTable>, glyph_index: u16) -> bool {
    glyph_class(opt_gdef_table, glyph_index) == GLYPH_CLASS_MARK
}

pub fn glyph_class(opt_gdef_table: Option<&GDEFTable>, glyph: u16) -> u16 {
    opt_gdef_table
        .and_then(|gdef| gdef.opt_glyph_classdef.as_ref())
        .map(|glyph_classdef| glyph_classdef.glyph_class_value(glyph))
        .unwrap_or(GLYPH_CLASS_NONE)
}

pub fn mark_attach_class(opt_gdef_table: Option<&GDEFTable>, glyph: u16) -> u16 {
    opt_gdef_table
        .and_then(|gdef| gdef.opt_mark_attach_classdef.as_ref())
        .map(|mark_attach_classdef| mark_attach_classdef.glyph_class_value(glyph))
        .unwrap_or(GLYPH_CLASS_NONE)
}

pub fn glyph_is_mark_in_set(opt_gdef_table: Option<&GDEFTable>, glyph: u16, index: usize) -> bool {
    gdef_is_mark(opt_gdef_table, glyph)
        && opt_gdef_table
            .and_then(|gdef| gdef.opt_mark_glyph_sets.as_ref())
            .and_then(|mark_glyph_sets| mark_glyph_sets.get(index))
            .is_some_and(|mark_set| mark_set.contains(glyph))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gdef() -> GDEFTable {
        GDEFTable {
            opt_glyph_classdef: Some(ClassDef::Format2 {
                class_range_array: vec![
                    ClassRangeRecord {
                        start_glyph: 1,
                        end_glyph: 9,
                        class_value: GLYPH_CLASS_BASE,
                    },
                    ClassRangeRecord {
                        start_glyph: 20,
                        end_glyph: 29,
                        class_value: GLYPH_CLASS_MARK,
                    },
                ],
            }),
            opt_mark_attach_classdef: Some(ClassDef::Format1 {
                start_glyph: 20,
                class_value_array: vec![1, 1, 2, 2],
            }),
            opt_mark_glyph_sets: Some(vec![MarkGlyphSet::new(vec![25, 21])]),
        }
    }

    #[test]
    fn test_glyph_class() {
        let gdef = gdef();
        assert_eq!(glyph_class(Some(&gdef), 5), GLYPH_CLASS_BASE);
        assert_eq!(glyph_class(Some(&gdef), 20), GLYPH_CLASS_MARK);
        assert_eq!(glyph_class(Some(&gdef), 15), GLYPH_CLASS_NONE);
        assert_eq!(glyph_class(None, 20), GLYPH_CLASS_NONE);
    }

    #[test]
    fn test_mark_attach_class_format1_bounds() {
        let gdef = gdef();
        assert_eq!(mark_attach_class(Some(&gdef), 19), 0);
        assert_eq!(mark_attach_class(Some(&gdef), 21), 1);
        assert_eq!(mark_attach_class(Some(&gdef), 23), 2);
        assert_eq!(mark_attach_class(Some(&gdef), 24), 0);
    }

    #[test]
    fn test_mark_in_set() {
        let gdef = gdef();
        assert!(glyph_is_mark_in_set(Some(&gdef), 21, 0));
        assert!(!glyph_is_mark_in_set(Some(&gdef), 22, 0));
        assert!(!glyph_is_mark_in_set(Some(&gdef), 21, 1));
    }
}
