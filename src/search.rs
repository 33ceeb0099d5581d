//! In-process ranked search over saved items.
//!
//! Items are fetched with a plain ownership-filtered query and then
//! tokenized terms are matched and scored here, so user input is never
//! interpolated into SQL.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// Per-field multipliers, checked in priority order.
const TITLE_MULTIPLIER: u64 = 3;
const CONTENT_MULTIPLIER: u64 = 2;
const DESCRIPTION_MULTIPLIER: u64 = 1;

/// The searchable fields of a document. Absent fields never match.
#[derive(Debug, Clone, Copy)]
pub struct SearchFields<'a> {
    pub title: Option<&'a str>,
    pub content: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// Splits a raw query into normalized terms: trimmed, lowercased, split on
/// runs of whitespace, empty tokens dropped. Term order is preserved since
/// it drives the positional weighting in [`score`].
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .trim()
        .to_lowercase()
        .split_whitespace()
        .map(|term| term.to_string())
        .collect()
}

fn field_contains(field: Option<&str>, term: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase().contains(term))
}

/// A document qualifies when every term appears as a case-insensitive
/// substring of at least one searchable field. Conjunction across terms,
/// disjunction across fields.
pub fn qualifies(fields: &SearchFields, terms: &[String]) -> bool {
    terms.iter().all(|term| {
        field_contains(fields.title, term)
            || field_contains(fields.content, term)
            || field_contains(fields.description, term)
    })
}

/// Relevance score for a document. Term `i` of `N` carries weight `N - i`,
/// so earlier query terms weigh more. Each term awards points for the first
/// matching field only, title > content > description, with multipliers
/// 3 / 2 / 1. A document that qualifies always scores above zero.
pub fn score(fields: &SearchFields, terms: &[String]) -> u64 {
    let term_count = terms.len();
    terms
        .iter()
        .enumerate()
        .fold(0u64, |total, (index, term)| {
            let weight = (term_count - index) as u64;
            let multiplier = if field_contains(fields.title, term) {
                TITLE_MULTIPLIER
            } else if field_contains(fields.content, term) {
                CONTENT_MULTIPLIER
            } else if field_contains(fields.description, term) {
                DESCRIPTION_MULTIPLIER
            } else {
                0
            };
            total.saturating_add(weight.saturating_mul(multiplier))
        })
}

/// Result ordering for ranked searches: higher score first, equal scores
/// broken by the most recently saved item.
pub fn cmp_ranked(a: (u64, DateTime<Utc>), b: (u64, DateTime<Utc>)) -> Ordering {
    b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(
        title: Option<&'a str>,
        content: Option<&'a str>,
        description: Option<&'a str>,
    ) -> SearchFields<'a> {
        SearchFields {
            title,
            content,
            description,
        }
    }

    #[test]
    fn tokenize_normalizes_and_splits() {
        assert_eq!(tokenize("  Apple   PIE \t recipe\n"), ["apple", "pie", "recipe"]);
    }

    #[test]
    fn tokenize_blank_query_yields_no_terms() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n ").is_empty());
    }

    #[test]
    fn qualifies_requires_every_term_somewhere() {
        let terms = tokenize("apple pie");
        let doc = fields(Some("Apple tart"), Some("making a pie today"), None);
        assert!(qualifies(&doc, &terms));

        // "pie" absent from all fields excludes the document entirely.
        let missing = fields(Some("Apple tart"), Some("a fine dessert"), None);
        assert!(!qualifies(&missing, &terms));
    }

    #[test]
    fn qualifies_is_case_insensitive_and_null_safe() {
        let terms = tokenize("RUST");
        assert!(qualifies(&fields(None, None, Some("Learning Rust slowly")), &terms));
        assert!(!qualifies(&fields(None, None, None), &terms));
    }

    #[test]
    fn score_weights_earlier_terms_and_field_priority() {
        let terms = tokenize("apple pie");

        // "apple" in title (2*3), "pie" in content (1*2).
        let doc_a = fields(Some("Apple tart"), Some("making a pie today"), None);
        assert_eq!(score(&doc_a, &terms), 8);

        // Both terms only in description: 2*1 + 1*1.
        let doc_b = fields(None, None, Some("apple pie"));
        assert_eq!(score(&doc_b, &terms), 3);

        assert!(score(&doc_a, &terms) > score(&doc_b, &terms));
    }

    #[test]
    fn score_counts_first_matching_field_only() {
        // Term present in every field still only earns the title multiplier.
        let doc = fields(Some("apple"), Some("apple"), Some("apple"));
        assert_eq!(score(&doc, &tokenize("apple")), 3);
    }

    #[test]
    fn qualifying_documents_score_above_zero() {
        let terms = tokenize("one two three");
        let doc = fields(None, Some("one two"), Some("three"));
        assert!(qualifies(&doc, &terms));
        assert!(score(&doc, &terms) > 0);
    }

    #[test]
    fn ranking_orders_by_score_before_recency() {
        let terms = tokenize("apple pie");
        let doc_a = fields(Some("Apple tart"), Some("making a pie today"), None);
        let doc_b = fields(None, None, Some("apple pie"));

        let newer = Utc::now();
        let older = newer - chrono::Duration::days(1);
        // The lower-scoring document is newer; score still wins.
        let mut results = vec![
            ("b", score(&doc_b, &terms), newer),
            ("a", score(&doc_a, &terms), older),
        ];
        results.sort_by(|x, y| cmp_ranked((x.1, x.2), (y.1, y.2)));
        assert_eq!(results.iter().map(|r| r.0).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn equal_scores_rank_most_recent_first() {
        let newer = Utc::now();
        let older = newer - chrono::Duration::hours(2);
        let mut results = vec![("old", 5u64, older), ("new", 5u64, newer)];
        results.sort_by(|x, y| cmp_ranked((x.1, x.2), (y.1, y.2)));
        assert_eq!(results[0].0, "new");
        assert_eq!(results[1].0, "old");
    }

    #[test]
    fn huge_queries_do_not_overflow_the_score() {
        let terms: Vec<String> = std::iter::repeat_with(|| "a".to_string())
            .take(200_000)
            .collect();
        let doc = fields(Some("a"), None, None);
        // Every term hits the title, so the total is 3 * N*(N+1)/2, well past
        // u32::MAX; accumulation must stay exact instead of wrapping.
        assert!(score(&doc, &terms) > u64::from(u32::MAX));
    }

    #[test]
    fn non_matching_terms_contribute_nothing() {
        let terms = tokenize("apple pie");
        let doc = fields(Some("apple"), None, None);
        // "apple" scores 2*3, "pie" scores 0; document fails qualification anyway.
        assert_eq!(score(&doc, &terms), 6);
        assert!(!qualifies(&doc, &terms));
    }
}
