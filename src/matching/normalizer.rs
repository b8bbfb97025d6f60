// src/matching/normalizer.rs - Street number, street core and fuzzy-compare cleanup
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::SearchCriteria;

/// Street type words and their common abbreviations, lowercase.
pub const STREET_TYPES: &[&str] = &[
    "street", "st", "str", "avenue", "ave", "av", "road", "rd", "lane", "ln", "drive", "dr",
    "boulevard", "blvd", "court", "ct", "place", "pl", "circle", "cir", "way", "wy", "terrace",
    "ter", "parkway", "pkwy", "highway", "hwy", "trail", "trl", "square", "sq", "loop", "path",
    "point", "pt", "alley", "aly", "cove", "cv", "run", "pike",
];

const US_STATE_CODES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH",
    "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "PR", "RI", "SC", "SD", "TN", "TX",
    "UT", "VT", "VA", "WA", "WV", "WI", "WY",
];

static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").unwrap());

static STATE_CODES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| US_STATE_CODES.iter().copied().collect());

pub fn is_street_type(token: &str) -> bool {
    let lowered = token.trim_end_matches('.').to_lowercase();
    STREET_TYPES.contains(&lowered.as_str())
}

fn is_zip(token: &str) -> bool {
    ZIP_RE.is_match(token)
}

fn is_directional(token: &str) -> bool {
    matches!(
        token.trim_end_matches('.').to_uppercase().as_str(),
        "NE" | "NW" | "SE" | "SW"
    )
}

fn is_state_code(token: &str) -> bool {
    token.len() == 2 && STATE_CODES.contains(token.to_uppercase().as_str())
}

/// Leading digits plus an optional single attached letter (`123A`), uppercased.
pub fn extract_street_number(text: &str) -> Option<String> {
    let trimmed = text.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let mut rest = trimmed[digits.len()..].chars();
    let suffix = match (rest.next(), rest.next()) {
        (Some(letter), next) if letter.is_ascii_alphabetic() && !next.map_or(false, |c| c.is_alphabetic()) => {
            Some(letter.to_ascii_uppercase())
        }
        _ => None,
    };

    Some(match suffix {
        Some(letter) => format!("{}{}", digits, letter),
        None => digits,
    })
}

/// Street name with the house number and a trailing street type removed, so
/// `10 Village Ln` and `10 Village Road` both yield `VILLAGE`.
pub fn extract_core_street_name(text: &str) -> Option<String> {
    let street_line = text.split(',').next().unwrap_or_default();
    let mut tokens: Vec<&str> = street_line.split_whitespace().collect();

    if tokens
        .first()
        .map_or(false, |t| t.starts_with(|c: char| c.is_ascii_digit()))
    {
        tokens.remove(0);
    }
    if tokens.len() > 1 && tokens.last().map_or(false, |t| is_street_type(t)) {
        tokens.pop();
    }

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" ").to_uppercase())
    }
}

struct Token<'a> {
    text: &'a str,
    segment: usize,
    starts_segment: bool,
}

/// Drops postal codes and state codes and collapses commas/whitespace. Only
/// used ahead of similarity scoring; the leading token is always kept so a
/// five-digit house number survives.
pub fn clean_for_fuzzy_compare(text: &str) -> String {
    let tokens: Vec<Token> = text
        .split(',')
        .enumerate()
        .flat_map(|(segment, part)| {
            part.split_whitespace().enumerate().map(move |(i, t)| Token {
                text: t,
                segment,
                starts_segment: i == 0,
            })
        })
        .collect();

    let last = tokens.len().saturating_sub(1);
    tokens
        .iter()
        .enumerate()
        .filter(|(i, token)| {
            if *i == 0 {
                return true;
            }
            if is_zip(token.text) {
                return false;
            }
            if is_state_code(token.text) {
                let next_is_zip = tokens.get(i + 1).map_or(false, |n| is_zip(n.text));
                let trailing_part = token.segment > 0 && (token.starts_segment || *i == last);
                // Without commas only a final token that cannot be part of the street counts.
                let bare_trailing =
                    *i == last && !is_street_type(token.text) && !is_directional(token.text);
                return !(next_is_zip || trailing_part || bare_trailing);
            }
            true
        })
        .map(|(_, token)| token.text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Best-effort criteria read straight from the text: street parts from the
/// first comma segment, zip and state from trailing tokens, and city from the
/// second segment once those are removed.
pub fn local_search_criteria(text: &str) -> SearchCriteria {
    let segments: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let street_line = segments.first().copied().unwrap_or_default();
    let street_tokens: Vec<&str> = street_line.split_whitespace().collect();

    let street_type = street_tokens
        .last()
        .filter(|t| street_tokens.len() > 2 && is_street_type(t))
        .map(|t| t.trim_end_matches('.').to_string());

    let trailing: Vec<&str> = segments
        .iter()
        .skip(1)
        .flat_map(|s| s.split_whitespace())
        .collect();
    let zip_code = trailing.iter().find(|t| is_zip(t)).map(|t| t.to_string());
    let state = trailing
        .iter()
        .rev()
        .find(|t| is_state_code(t))
        .map(|t| t.to_uppercase());

    let city = if segments.len() > 2 {
        Some(segments[1].to_string())
    } else {
        segments.get(1).and_then(|s| {
            let words: Vec<&str> = s
                .split_whitespace()
                .filter(|t| !is_zip(t) && !is_state_code(t))
                .collect();
            if words.is_empty() {
                None
            } else {
                Some(words.join(" "))
            }
        })
    };

    let search_terms = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();

    SearchCriteria {
        street_number: extract_street_number(street_line),
        street_name: extract_core_street_name(street_line),
        street_type,
        city,
        state,
        zip_code,
        search_terms,
        confidence: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_street_number() {
        assert_eq!(extract_street_number("123 Main St").as_deref(), Some("123"));
        assert_eq!(extract_street_number("123a Main St").as_deref(), Some("123A"));
        assert_eq!(extract_street_number("  42B, Oak Ave").as_deref(), Some("42B"));
        assert_eq!(extract_street_number("77").as_deref(), Some("77"));
        assert_eq!(extract_street_number("123Main St").as_deref(), Some("123"));
        assert_eq!(extract_street_number("Main St 123"), None);
        assert_eq!(extract_street_number(""), None);
    }

    #[test]
    fn test_core_street_name_ignores_street_type() {
        let ln = extract_core_street_name("10 Village Ln");
        assert_eq!(ln.as_deref(), Some("VILLAGE"));
        assert_eq!(extract_core_street_name("10 Village Road"), ln);
        assert_eq!(extract_core_street_name("10 village rd."), ln);
        assert_eq!(
            extract_core_street_name("200 Lake Shore Blvd, Safety Harbor, FL").as_deref(),
            Some("LAKE SHORE")
        );
    }

    #[test]
    fn test_core_street_name_keeps_lone_type_word() {
        assert_eq!(extract_core_street_name("5 Loop").as_deref(), Some("LOOP"));
        assert_eq!(extract_core_street_name("12"), None);
    }

    #[test]
    fn test_clean_for_fuzzy_compare() {
        assert_eq!(
            clean_for_fuzzy_compare("10 Village Ln, Safety Harbor, FL 34695"),
            "10 Village Ln Safety Harbor"
        );
        assert_eq!(
            clean_for_fuzzy_compare("10 Village Road, Safety Harbor, FL"),
            "10 Village Road Safety Harbor"
        );
        assert_eq!(
            clean_for_fuzzy_compare("10 Village Ln FL 34695-1234"),
            "10 Village Ln"
        );
        assert_eq!(
            clean_for_fuzzy_compare("10 Village Ln Safety Harbor FL"),
            "10 Village Ln Safety Harbor"
        );
        assert_eq!(
            clean_for_fuzzy_compare("10 Village Ln Safety Harbor FL"),
            clean_for_fuzzy_compare("10 Village Ln, Safety Harbor, FL")
        );
    }

    #[test]
    fn test_clean_keeps_trailing_directional() {
        assert_eq!(clean_for_fuzzy_compare("200 Main St NE"), "200 Main St NE");
    }

    #[test]
    fn test_clean_keeps_street_words_that_look_like_states() {
        // "Ct" is Connecticut but here it is the street type.
        assert_eq!(clean_for_fuzzy_compare("5 Oak Ct"), "5 Oak Ct");
        assert_eq!(
            clean_for_fuzzy_compare("5 Oak Ct, Hartford, CT 06103"),
            "5 Oak Ct Hartford"
        );
        assert_eq!(clean_for_fuzzy_compare("34695 Main St"), "34695 Main St");
    }

    #[test]
    fn test_local_search_criteria() {
        let criteria = local_search_criteria("10 Village Ln, Safety Harbor, FL 34695");
        assert_eq!(criteria.street_number.as_deref(), Some("10"));
        assert_eq!(criteria.street_name.as_deref(), Some("VILLAGE"));
        assert_eq!(criteria.street_type.as_deref(), Some("Ln"));
        assert_eq!(criteria.city.as_deref(), Some("Safety Harbor"));
        assert_eq!(criteria.state.as_deref(), Some("FL"));
        assert_eq!(criteria.zip_code.as_deref(), Some("34695"));
        assert!(criteria.search_terms.contains(&"harbor".to_string()));

        let bare = local_search_criteria("10 Village Ln");
        assert_eq!(bare.city, None);
        assert_eq!(bare.state, None);
        assert!(bare.has_filters());

        let city_state = local_search_criteria("4471 Ulmerton Rd, Largo FL");
        assert_eq!(city_state.city.as_deref(), Some("Largo"));
        assert_eq!(city_state.state.as_deref(), Some("FL"));
    }
}
