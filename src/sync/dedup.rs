//! Action-item deduplication: pure text similarity, no I/O.
//!
//! Suppresses AI-derived items that restate a provider-native one so repeated
//! analysis passes over the same meeting never create duplicate tasks.

use std::collections::HashSet;

/// Token-set overlap above this ratio counts as the same task.
const OVERLAP_THRESHOLD: f64 = 0.6;

/// Does `candidate` restate any of the existing item texts?
pub fn is_duplicate(candidate: &str, existing: &[String]) -> bool {
    existing.iter().any(|item| texts_match(candidate, item))
}

/// Two item texts describe the same task when, after normalization, they are
/// equal, one contains the other, or their word sets overlap above the
/// threshold (`|A∩B| / |A∪B|`).
pub fn texts_match(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    token_overlap_ratio(&a, &b) > OVERLAP_THRESHOLD
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            out.push(c);
        } else if c.is_whitespace() && !out.ends_with(' ') {
            out.push(' ');
        }
    }
    out.trim().to_string()
}

/// Jaccard ratio over word sets.
fn token_overlap_ratio(a: &str, b: &str) -> f64 {
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_after_normalization() {
        assert!(texts_match(
            "Send the proposal to Acme!",
            "send the proposal to acme"
        ));
    }

    #[test]
    fn test_substring_containment_either_direction() {
        assert!(texts_match(
            "Send proposal",
            "Send proposal to the Acme procurement team by Friday"
        ));
        assert!(texts_match(
            "Send proposal to the Acme procurement team by Friday",
            "Send proposal"
        ));
    }

    #[test]
    fn test_high_token_overlap_is_suppressed() {
        // 4 shared tokens of 5 distinct: ratio 0.8 > 0.6
        assert!(texts_match(
            "schedule follow up call Thursday",
            "schedule follow up call Friday"
        ));
    }

    #[test]
    fn test_disjoint_texts_are_retained() {
        assert!(!texts_match(
            "Send pricing deck",
            "Book a room for the offsite"
        ));
    }

    #[test]
    fn test_moderate_overlap_below_threshold() {
        // 2 shared of 6 distinct: ratio ~0.33
        assert!(!texts_match(
            "review the contract terms",
            "review the onboarding milestones doc"
        ));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!texts_match("", "send proposal"));
        assert!(!texts_match("!!!", "send proposal"));
    }

    #[test]
    fn test_is_duplicate_against_list() {
        let native = vec![
            "Send the proposal to Acme".to_string(),
            "Schedule the next QBR".to_string(),
        ];
        assert!(is_duplicate("send the proposal to acme.", &native));
        assert!(!is_duplicate("Investigate the API latency spike", &native));
        assert!(!is_duplicate("anything", &[]));
    }
}
