//! # Lookup Engine
//!
//! Resolves a scan or a typed name fragment to catalog entries.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        resolve(input)                                   │
//! │                                                                         │
//! │  input.trim() ──► barcode == input? ──yes──► that product               │
//! │                         │ no                                            │
//! │                         ▼                                               │
//! │              name contains input (case-insensitive)?                    │
//! │                   │ yes                  │ none                         │
//! │                   ▼                      ▼                              │
//! │        first `limit`, catalog     matcher.similarity() available?       │
//! │              order                 │ yes                │ no            │
//! │                                    ▼                    ▼               │
//! │                          ranked by score, desc       empty              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The fuzzy stage is a capability, not a requirement: [`SubstringMatcher`]
//! reports no similarity at all and name search then stops at stage one.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// Longest name query, in characters, that is searched at all. Longer input
/// cannot be a product name and finds nothing.
pub const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// Matcher Trait
// =============================================================================

/// Similarity scoring used when substring search finds nothing.
pub trait NameMatcher: fmt::Debug + Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Similarity of `candidate` to `query` in `0.0..=100.0`, or `None` when
    /// this matcher does no similarity ranking.
    fn similarity(&self, query: &str, candidate: &str) -> Option<f64>;
}

/// Substring-only lookup. Never ranks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl NameMatcher for SubstringMatcher {
    fn name(&self) -> &'static str {
        "substring"
    }

    fn similarity(&self, _query: &str, _candidate: &str) -> Option<f64> {
        None
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Exact barcode lookup. The input is trimmed; empty input finds nothing.
///
/// Returns the first match in catalog order.
pub fn search_by_barcode<'a>(products: &'a [Product], code: &str) -> Option<&'a Product> {
    let code = code.trim();
    if code.is_empty() {
        return None;
    }
    products.iter().find(|p| p.matches_barcode(code))
}

/// Index of the first entry carrying `code`, for in-place edits.
pub fn position_by_barcode(products: &[Product], code: &str) -> CoreResult<usize> {
    let code = code.trim();
    products
        .iter()
        .position(|p| p.matches_barcode(code))
        .ok_or_else(|| CoreError::ProductNotFound(code.to_string()))
}

/// Name lookup returning at most `limit` products.
///
/// Substring hits win outright. Only when there are none does the matcher
/// rank the whole catalog; scores below `cutoff` are dropped and ties keep
/// catalog order.
pub fn search_by_name<'a>(
    products: &'a [Product],
    query: &str,
    limit: usize,
    matcher: &dyn NameMatcher,
    cutoff: f64,
) -> Vec<&'a Product> {
    let query = query.trim();
    if query.is_empty() || limit == 0 || query.chars().count() > MAX_QUERY_LEN {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    let hits: Vec<&Product> = products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .take(limit)
        .collect();
    if !hits.is_empty() {
        return hits;
    }

    let mut scored: Vec<(f64, &Product)> = Vec::with_capacity(products.len());
    for product in products {
        match matcher.similarity(query, &product.name) {
            Some(score) if score >= cutoff => scored.push((score, product)),
            Some(_) => {}
            None => return Vec::new(),
        }
    }

    // Stable sort keeps catalog order among equal scores.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().take(limit).map(|(_, p)| p).collect()
}

/// Barcode first, then the single best name match.
pub fn resolve<'a>(
    products: &'a [Product],
    input: &str,
    matcher: &dyn NameMatcher,
    cutoff: f64,
) -> Option<&'a Product> {
    search_by_barcode(products, input)
        .or_else(|| search_by_name(products, input, 1, matcher, cutoff).into_iter().next())
}

// =============================================================================
// Fuzzy Matcher
// =============================================================================

#[cfg(feature = "fuzzy")]
pub use fuzzy::FuzzyMatcher;

#[cfg(feature = "fuzzy")]
mod fuzzy {
    use super::NameMatcher;

    /// Weighted-ratio similarity.
    ///
    /// Combines a plain edit ratio with partial (best window) and token
    /// (order-insensitive) ratios, scaling the partial scores down as the
    /// lengths diverge. Comparison is case-insensitive.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FuzzyMatcher;

    impl NameMatcher for FuzzyMatcher {
        fn name(&self) -> &'static str {
            "fuzzy"
        }

        fn similarity(&self, query: &str, candidate: &str) -> Option<f64> {
            Some(weighted_ratio(
                &query.trim().to_lowercase(),
                &candidate.trim().to_lowercase(),
            ))
        }
    }

    const UNBASE_SCALE: f64 = 0.95;

    pub(super) fn weighted_ratio(a: &str, b: &str) -> f64 {
        let len_a = a.chars().count();
        let len_b = b.chars().count();
        if len_a == 0 || len_b == 0 {
            return 0.0;
        }

        let (short, long) = if len_a <= len_b { (len_a, len_b) } else { (len_b, len_a) };
        let len_ratio = long as f64 / short as f64;

        let mut best = ratio(a, b);
        if len_ratio < 1.5 {
            let token = token_sort_ratio(a, b).max(token_set_ratio(a, b));
            return best.max(token * UNBASE_SCALE);
        }

        let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        best = best.max(partial_ratio(a, b) * partial_scale);

        let sorted_a = sorted_tokens(a).join(" ");
        let sorted_b = sorted_tokens(b).join(" ");
        let partial_token = partial_ratio(&sorted_a, &sorted_b);
        best.max(partial_token * UNBASE_SCALE * partial_scale)
    }

    pub(super) fn ratio(a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b) * 100.0
    }

    /// Best ratio of the shorter string against every equal-length window of
    /// the longer one.
    pub(super) fn partial_ratio(a: &str, b: &str) -> f64 {
        let (short, long): (Vec<char>, Vec<char>) = {
            let a: Vec<char> = a.chars().collect();
            let b: Vec<char> = b.chars().collect();
            if a.len() <= b.len() { (a, b) } else { (b, a) }
        };
        if short.is_empty() {
            return 0.0;
        }

        let needle: String = short.iter().collect();
        let mut best: f64 = 0.0;
        for window in long.windows(short.len()) {
            let hay: String = window.iter().collect();
            best = best.max(ratio(&needle, &hay));
            if best >= 100.0 {
                break;
            }
        }
        best
    }

    pub(super) fn token_sort_ratio(a: &str, b: &str) -> f64 {
        ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
    }

    pub(super) fn token_set_ratio(a: &str, b: &str) -> f64 {
        let ta = sorted_tokens(a);
        let tb = sorted_tokens(b);

        let common: Vec<&str> = ta.iter().copied().filter(|t| tb.contains(t)).collect();
        let only_a: Vec<&str> = ta.iter().copied().filter(|t| !tb.contains(t)).collect();
        let only_b: Vec<&str> = tb.iter().copied().filter(|t| !ta.contains(t)).collect();

        if !common.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
            return 100.0;
        }

        let join = |head: &[&str], tail: &[&str]| -> String {
            head.iter()
                .chain(tail.iter())
                .copied()
                .collect::<Vec<_>>()
                .join(" ")
        };
        let base = common.join(" ");
        let with_a = join(&common, &only_a);
        let with_b = join(&common, &only_b);

        ratio(&base, &with_a)
            .max(ratio(&base, &with_b))
            .max(ratio(&with_a, &with_b))
    }

    fn sorted_tokens(s: &str) -> Vec<&str> {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.dedup();
        tokens
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Product> {
        [
            ("6901234567890", "Mineral Water 500ml"),
            ("6909876543210", "Instant Noodles"),
            ("6900000000001", "Sparkling Water"),
            ("", "Loose Candy"),
        ]
        .into_iter()
        .map(|(barcode, name)| Product {
            id: format!("id-{}", name),
            barcode: barcode.to_string(),
            name: name.to_string(),
            ..Default::default()
        })
        .collect()
    }

    #[test]
    fn test_barcode_exact_and_trimmed() {
        let products = catalog();
        let hit = search_by_barcode(&products, " 6909876543210 ").unwrap();
        assert_eq!(hit.name, "Instant Noodles");

        assert!(search_by_barcode(&products, "690987654321").is_none());
        assert!(search_by_barcode(&products, "").is_none());
        assert!(search_by_barcode(&products, "   ").is_none());
    }

    #[test]
    fn test_substring_is_case_insensitive_in_catalog_order() {
        let products = catalog();
        let hits = search_by_name(&products, "WATER", 5, &SubstringMatcher, 0.0);
        let names: Vec<_> = hits.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Mineral Water 500ml", "Sparkling Water"]);

        let hits = search_by_name(&products, "water", 1, &SubstringMatcher, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Mineral Water 500ml");
    }

    #[test]
    fn test_empty_query_and_zero_limit() {
        let products = catalog();
        assert!(search_by_name(&products, "  ", 5, &SubstringMatcher, 0.0).is_empty());
        assert!(search_by_name(&products, "water", 0, &SubstringMatcher, 0.0).is_empty());
    }

    #[test]
    fn test_overlong_query_finds_nothing() {
        let mut products = catalog();
        products[3].name = "糖".repeat(MAX_QUERY_LEN + 1);

        let at_limit = "糖".repeat(MAX_QUERY_LEN);
        assert_eq!(search_by_name(&products, &at_limit, 5, &SubstringMatcher, 0.0).len(), 1);

        let overlong = "糖".repeat(MAX_QUERY_LEN + 1);
        assert!(search_by_name(&products, &overlong, 5, &FixedScore(90.0), 0.0).is_empty());
        assert!(resolve(&products, &overlong, &SubstringMatcher, 0.0).is_none());
    }

    #[test]
    fn test_position_by_barcode() {
        let products = catalog();
        assert_eq!(position_by_barcode(&products, " 6900000000001 ").unwrap(), 2);
        assert!(matches!(
            position_by_barcode(&products, "404"),
            Err(CoreError::ProductNotFound(ref b)) if b == "404"
        ));
        assert!(position_by_barcode(&products, "").is_err());
    }

    #[test]
    fn test_substring_only_has_no_fallback() {
        let products = catalog();
        assert!(search_by_name(&products, "watr", 5, &SubstringMatcher, 0.0).is_empty());
    }

    #[test]
    fn test_resolve_prefers_barcode() {
        let mut products = catalog();
        products[1].name = "6901234567890 noodles".to_string();

        let hit = resolve(&products, "6901234567890", &SubstringMatcher, 0.0).unwrap();
        assert_eq!(hit.barcode, "6901234567890");
        assert_eq!(hit.name, "Mineral Water 500ml");

        let hit = resolve(&products, "candy", &SubstringMatcher, 0.0).unwrap();
        assert_eq!(hit.name, "Loose Candy");
    }

    #[derive(Debug)]
    struct FixedScore(f64);

    impl NameMatcher for FixedScore {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn similarity(&self, _query: &str, _candidate: &str) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_fuzzy_ties_keep_catalog_order_and_respect_cutoff() {
        let products = catalog();
        let hits = search_by_name(&products, "zzz", 2, &FixedScore(40.0), 0.0);
        let names: Vec<_> = hits.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Mineral Water 500ml", "Instant Noodles"]);

        assert!(search_by_name(&products, "zzz", 2, &FixedScore(40.0), 50.0).is_empty());
    }

    #[cfg(feature = "fuzzy")]
    mod fuzzy_tests {
        use super::*;
        use crate::lookup::fuzzy::{partial_ratio, ratio, token_set_ratio, token_sort_ratio};

        #[test]
        fn test_component_ratios() {
            assert_eq!(ratio("water", "water"), 100.0);
            assert_eq!(partial_ratio("water", "mineral water"), 100.0);
            assert_eq!(token_sort_ratio("water mineral", "mineral water"), 100.0);
            assert_eq!(token_set_ratio("water", "mineral water"), 100.0);
            assert_eq!(ratio("", "water"), 0.0);
        }

        #[test]
        fn test_fuzzy_ranks_closest_name_first() {
            let products = catalog();
            let hits = search_by_name(&products, "mineral watr", 2, &FuzzyMatcher, 0.0);
            assert_eq!(hits.len(), 2);
            assert_eq!(hits[0].name, "Mineral Water 500ml");
        }

        #[test]
        fn test_fuzzy_only_when_substring_misses() {
            let products = catalog();
            let hits = search_by_name(&products, "noodles", 5, &FuzzyMatcher, 0.0);
            assert_eq!(hits.len(), 1);
        }

        #[test]
        fn test_resolve_falls_back_to_fuzzy() {
            let products = catalog();
            let hit = resolve(&products, "instnt noodle", &FuzzyMatcher, 0.0).unwrap();
            assert_eq!(hit.name, "Instant Noodles");
        }
    }
}
