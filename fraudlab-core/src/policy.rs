//! Catalog classification.
//!
//! Decides which catalogs are disposable tutorial catalogs that a cleanup
//! pass may strip of derived objects, and which are protected.

const PROTECTED_MARKER: &str = "playground";
const TUTORIAL_PREFIXES: [&str; 2] = ["quick start ", "deep dive "];
const DEMO_PREFIXES: [&str; 2] = ["healthcare demo ", "credit card demo "];

/// Classification of a catalog by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogClass {
    Disposable,
    Protected,
}

impl CatalogClass {
    pub fn of(name: &str) -> Self {
        if is_disposable(name) {
            CatalogClass::Disposable
        } else {
            CatalogClass::Protected
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogClass::Disposable => "disposable",
            CatalogClass::Protected => "protected",
        }
    }
}

/// Whether a cleanup pass may clean the named catalog.
///
/// Any name containing "playground" (case-insensitive) is protected. Every
/// other name is disposable: the prefix checks below all resolve to
/// disposable, including the final fall-through.
// TODO: decide whether names outside the tutorial and demo prefixes should be protected; the tiers currently collapse to "not playground".
pub fn is_disposable(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower.contains(PROTECTED_MARKER) {
        return false;
    }
    if !TUTORIAL_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    if !DEMO_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playground_is_protected() {
        assert!(!is_disposable("playground creditcard"));
        assert!(!is_disposable("credit card playground 20240101:1200_abc"));
        assert!(!is_disposable("My PlayGround"));
        assert!(!is_disposable("quick start PLAYGROUND"));
    }

    #[test]
    fn test_tutorial_prefixes_are_disposable() {
        assert!(is_disposable("Quick Start Demo"));
        assert!(is_disposable("quick start feature engineering"));
        assert!(is_disposable("Deep Dive Data Modeling"));
    }

    #[test]
    fn test_everything_else_falls_through_to_disposable() {
        assert!(is_disposable("Healthcare Demo Intro"));
        assert!(is_disposable("credit card demo 2"));
        assert!(is_disposable("default"));
        assert!(is_disposable(""));
        assert!(is_disposable("quickstart"));
    }

    #[test]
    fn test_catalog_class() {
        assert_eq!(CatalogClass::of("deep dive x"), CatalogClass::Disposable);
        assert_eq!(CatalogClass::of("playground"), CatalogClass::Protected);
        assert_eq!(CatalogClass::Protected.as_str(), "protected");
    }
}
