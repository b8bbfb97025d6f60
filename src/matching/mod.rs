pub mod candidate_filter;
pub mod fuzzy;
pub mod normalizer;
pub mod similarity;

pub use candidate_filter::{build_candidate_query, GoldenColumns};
pub use fuzzy::{
    candidate_text, find_exact_matches, find_fuzzy_matches, CandidateOrigin, FuzzyMatchEngine,
    MIN_SIMILARITY_FLOOR,
};
pub use normalizer::{
    clean_for_fuzzy_compare, extract_core_street_name, extract_street_number, local_search_criteria,
};
