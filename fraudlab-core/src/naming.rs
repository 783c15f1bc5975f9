//! Identifier normalization for display names.

use crate::error::FraudlabError;
use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Turn a display name (table, feature, catalog) into a lower-case
/// identifier.
///
/// Spaces and hyphens become underscores, a leading numeric character (any
/// script, not only ASCII) gets a `digit_` prefix, and each run of remaining non-word characters collapses to one
/// underscore.
pub fn to_identifier(name: &str) -> Result<String, FraudlabError> {
    let mut result = name.to_lowercase().replace([' ', '-'], "_");
    let first = result
        .chars()
        .next()
        .ok_or_else(|| FraudlabError::invalid_input("cannot build an identifier from an empty name"))?;
    if first.is_numeric() {
        result.insert_str(0, "digit_");
    }
    Ok(NON_WORD.replace_all(&result, "_").to_lowercase())
}
