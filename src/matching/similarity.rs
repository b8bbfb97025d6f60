// src/matching/similarity.rs
use strsim::normalized_levenshtein;

/// Lowercased whitespace tokens, sorted and re-joined.
fn sorted_tokens(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Token-order-insensitive similarity on a 0-100 scale, rounded to two decimals.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (sorted_tokens(a), sorted_tokens(b));
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    (normalized_levenshtein(&a, &b) * 10_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_reordered() {
        assert_eq!(token_sort_ratio("10 Village Ln", "10 village ln"), 100.0);
        assert_eq!(token_sort_ratio("Safety Harbor 10 Village Ln", "10 Village Ln Safety Harbor"), 100.0);
    }

    #[test]
    fn test_street_type_variation_scores_high() {
        let score = token_sort_ratio("10 Village Ln Safety Harbor", "10 Village Road Safety Harbor");
        assert!(score > 85.0 && score < 90.0, "Score was {}", score);
    }

    #[test]
    fn test_unrelated_addresses_score_low() {
        let score = token_sort_ratio("10 Village Ln Safety Harbor", "4471 Ulmerton Rd Largo");
        assert!(score < 50.0, "Score was {}", score);
        assert_eq!(token_sort_ratio("", "anything"), 0.0);
    }
}
