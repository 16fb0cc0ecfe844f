//! Identifier validation for layout entity names.
//!
//! Table, locality group, family, and group-type column names share a single
//! restricted identifier ruleset: ASCII letters, digits, and underscores,
//! not starting with a digit. Aliases follow the same ruleset, and primary
//! names are additionally run through the alias predicate by the builders.
//!
//! Both predicates are pure; the calling builder is responsible for raising
//! `InvalidLayout` on rejection.

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns whether `name` is a valid primary name for a layout entity.
pub fn is_valid_layout_name(name: &str) -> bool {
    is_identifier(name)
}

/// Returns whether `alias` is a valid alias for a layout entity.
pub fn is_valid_alias(alias: &str) -> bool {
    is_identifier(alias)
}
