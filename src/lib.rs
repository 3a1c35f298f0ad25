#![warn(rust_2018_idioms)]

//! OpenType contextual and chaining contextual glyph substitution.
//!
//! A [layout::LookupList] holds a font's decoded substitution lookups. [gsub::gsub_apply_lookup]
//! runs one of them over a glyph run, matching rules through [context] and invoking nested
//! lookups at the matched positions.

pub mod context;
pub mod error;
pub mod gdef;
pub mod glyph;
pub mod gsub;
pub mod layout;
/// Shared test code.
#[cfg(test)]
pub mod tests;
