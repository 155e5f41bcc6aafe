//! Name normalization and canonical id helpers.

use super::spec::SpecKind;

/// Separator between a kind and a slug in canonical ids.
pub const ID_SEPARATOR: char = ':';

/// Separator used between words of a slug.
const WORD_SEPARATOR: &str = "_";

/// Normalizes a human name for lookups: trims, collapses internal
/// whitespace to single `_` separators and lower-cases.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(WORD_SEPARATOR)
        .to_lowercase()
}

/// Slug form of a human name, as used in canonical ids.
#[must_use]
pub fn slugify(name: &str) -> String {
    normalize_name(name)
}

/// Builds the canonical `"<kind>:<slug>"` id for a name.
#[must_use]
pub fn canonical_id(kind: SpecKind, name: &str) -> String {
    format!("{kind}{ID_SEPARATOR}{}", slugify(name))
}

/// Returns `true` if the string has the shape of an id rather than a name.
#[must_use]
pub fn looks_like_id(query: &str) -> bool {
    query.contains(ID_SEPARATOR)
}
