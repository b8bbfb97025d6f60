// src/pipeline/mod.rs - End-to-end address resolution against the golden source and internal tables
use log::{debug, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::collaborator::{Extraction, ExtractionCollaborator};
use crate::config::EngineSettings;
use crate::consolidation::Scenario;
use crate::error::{EngineError, Outcome};
use crate::matching::fuzzy::sort_by_score;
use crate::matching::{
    build_candidate_query, candidate_text, find_exact_matches, find_fuzzy_matches,
    local_search_criteria, CandidateOrigin, FuzzyMatchEngine,
};
use crate::models::{AddressRecord, MatchCandidate, SearchCriteria, SourceType};
use crate::schema::ColumnMapping;
use crate::store::AddressStore;
use crate::utils::logging::{Operation, ResolutionLogger};

pub mod writeback;

pub use writeback::{consolidate, push_updates, time_saved_hours, write_golden_to_internal, PushReport};

/// Handles every engine operation needs. Nothing here is process-global.
pub struct ResolutionContext<'a> {
    pub store: &'a dyn AddressStore,
    pub collaborator: Option<&'a dyn ExtractionCollaborator>,
    pub settings: &'a EngineSettings,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(store: &'a dyn AddressStore, settings: &'a EngineSettings) -> Self {
        Self {
            store,
            collaborator: None,
            settings,
        }
    }

    pub fn with_collaborator(mut self, collaborator: &'a dyn ExtractionCollaborator) -> Self {
        self.collaborator = Some(collaborator);
        self
    }

    pub fn engine(&self) -> FuzzyMatchEngine {
        self.settings.fuzzy_engine()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    FuzzyMatch,
    FuzzyMatchWithAi,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub request_id: Uuid,
    pub input_address: String,
    pub search_criteria: SearchCriteria,
    pub candidates_searched: usize,
    pub confidence_threshold: f64,
    pub similarity_threshold: f64,
    pub search_method: SearchMethod,
    pub match_found: bool,
    pub confidence: Option<f64>,
    pub similarity_score: Option<f64>,
    pub reasoning: String,
    pub business_rule_exception: bool,
    pub best_match: Option<MatchCandidate>,
    pub golden_source_matches: Vec<MatchCandidate>,
    pub internal_matches: Vec<MatchCandidate>,
    pub suggested_scenario: Option<Scenario>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Verified (or top fuzzy) golden match before the internal lookup.
struct GoldenSelection {
    best: Option<MatchCandidate>,
    confidence: Option<f64>,
    reasoning: String,
    method: SearchMethod,
    raw_response: Option<String>,
}

async fn extract_criteria(
    ctx: &ResolutionContext<'_>,
    input: &str,
    logger: &ResolutionLogger,
) -> (SearchCriteria, Option<String>) {
    let collaborator = match ctx.collaborator {
        Some(c) => c,
        None => return (local_search_criteria(input), None),
    };
    match collaborator.extract_search_criteria(input).await {
        Ok(Extraction::Parsed(criteria)) => {
            if let Some(confidence) = criteria.confidence {
                if confidence < ctx.settings.confidence_threshold {
                    logger.log_warning(&format!(
                        "Extraction confidence {:.0} is below threshold {:.0}",
                        confidence, ctx.settings.confidence_threshold
                    ));
                }
            }
            (criteria, None)
        }
        Ok(Extraction::Raw(text)) => {
            logger.log_warning("Criteria extraction response was not JSON; parsing the address locally");
            (local_search_criteria(input), Some(text))
        }
        Err(e) => {
            logger.log_warning(&format!("Criteria extraction failed ({:#}); parsing the address locally", e));
            (local_search_criteria(input), None)
        }
    }
}

fn same_street(a: &str, b: &str) -> bool {
    let norm = |s: &str| {
        s.split(|c: char| c.is_whitespace() || c == ',' || c == '.')
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase)
            .collect::<Vec<_>>()
    };
    norm(a) == norm(b)
}

fn fuzzy_fallback(ranked: &[MatchCandidate], reasoning: String, raw_response: Option<String>) -> GoldenSelection {
    let best = ranked.first().cloned();
    GoldenSelection {
        confidence: best.as_ref().map(|c| c.metadata.similarity_score),
        best,
        reasoning,
        method: SearchMethod::FuzzyMatch,
        raw_response,
    }
}

/// Finds the ranked candidate a verdict refers to by its street line.
fn candidate_for_verdict(
    verdict_record: &AddressRecord,
    ranked: &[MatchCandidate],
    address_column: &str,
) -> Option<MatchCandidate> {
    let street = verdict_record.text(address_column)?;
    ranked
        .iter()
        .find(|c| c.record.text(address_column).map_or(false, |b| same_street(&street, &b)))
        .cloned()
}

async fn select_golden(
    ctx: &ResolutionContext<'_>,
    input: &str,
    ranked: &[MatchCandidate],
    logger: &ResolutionLogger,
) -> GoldenSelection {
    let collaborator = match ctx.collaborator {
        Some(c) => c,
        None => {
            let reasoning = match ranked.first() {
                Some(top) => format!(
                    "Top fuzzy match with similarity {:.2}",
                    top.metadata.similarity_score
                ),
                None => "No golden source candidate passed the street number gate and similarity threshold".to_string(),
            };
            return fuzzy_fallback(ranked, reasoning, None);
        }
    };
    if ranked.is_empty() {
        return fuzzy_fallback(
            ranked,
            "No golden source candidate passed the street number gate and similarity threshold".to_string(),
            None,
        );
    }

    let columns = &ctx.settings.golden_columns;
    let records: Vec<AddressRecord> = ranked.iter().map(|c| c.record.clone()).collect();
    match collaborator.verify_match(input, &records, columns).await {
        Ok(Extraction::Parsed(verdict)) => {
            let mut reasoning = verdict.reasoning.clone();
            let best = match verdict.matched_record().filter(|_| verdict.match_found) {
                Some(record) => {
                    let best = candidate_for_verdict(&record, ranked, &columns.address1);
                    if best.is_none() {
                        logger.log_warning(
                            "Verified address is not among the ranked candidates; no match accepted",
                        );
                        reasoning = format!(
                            "{} (verified address is not among the candidates above the similarity threshold)",
                            reasoning
                        );
                    }
                    best
                }
                None => None,
            };
            GoldenSelection {
                best,
                confidence: verdict.confidence,
                reasoning,
                method: SearchMethod::FuzzyMatchWithAi,
                raw_response: None,
            }
        }
        Ok(Extraction::Raw(text)) => {
            logger.log_warning("Verification response was not JSON; using the top fuzzy match");
            fuzzy_fallback(
                ranked,
                "Verification response could not be parsed; top fuzzy match used".to_string(),
                Some(text),
            )
        }
        Err(e) => {
            logger.log_warning(&format!("Verification failed ({:#}); using the top fuzzy match", e));
            fuzzy_fallback(
                ranked,
                "Verification unavailable; top fuzzy match used".to_string(),
                None,
            )
        }
    }
}

/// Internal rows for a golden match: exact street matches plus fuzzy
/// matches of the full golden address, de-duplicated, best score first.
async fn find_internal_matches(
    ctx: &ResolutionContext<'_>,
    engine: &FuzzyMatchEngine,
    golden: &MatchCandidate,
    threshold: f64,
) -> anyhow::Result<Vec<MatchCandidate>> {
    let golden_mapping = ctx.settings.golden_columns.mapping();
    let golden_text = match candidate_text(&golden.record, &golden_mapping) {
        Some(text) => text,
        None => {
            warn!("Golden match has no street line; skipping internal lookup");
            return Ok(Vec::new());
        }
    };
    let street_line = golden
        .record
        .text(&ctx.settings.golden_columns.address1)
        .unwrap_or_default();

    let mut matches: Vec<MatchCandidate> = Vec::new();
    for table in &ctx.settings.internal_tables {
        let exact = find_exact_matches(
            ctx.store,
            engine,
            table,
            &street_line,
            &golden_text,
            SourceType::Internal,
        )
        .await?;
        let fuzzy = find_fuzzy_matches(
            ctx.store,
            engine,
            table,
            &golden_text,
            threshold,
            SourceType::Internal,
        )
        .await?;

        for candidate in exact.into_iter().chain(fuzzy) {
            match matches.iter_mut().find(|m| {
                m.metadata.source_table == candidate.metadata.source_table && m.record == candidate.record
            }) {
                Some(existing) => {
                    if candidate.metadata.similarity_score > existing.metadata.similarity_score {
                        existing.metadata.similarity_score = candidate.metadata.similarity_score;
                    }
                }
                None => matches.push(candidate),
            }
        }
    }
    sort_by_score(&mut matches);
    Ok(matches)
}

/// Street line of an internal candidate, found through its own columns.
fn internal_street(candidate: &MatchCandidate) -> Option<String> {
    let mapping = ColumnMapping::from_columns(candidate.record.columns().map(str::to_string).collect());
    candidate.record.text(mapping.address.as_deref()?)
}

/// Which write-back scenario a resolution calls for; `None` when the single
/// internal row already carries the golden street line.
pub fn suggest_scenario(golden_street: &str, internal: &[MatchCandidate]) -> Option<Scenario> {
    match internal {
        [] => Some(Scenario::GoldenOnly),
        [only] => match internal_street(only) {
            Some(street) if same_street(&street, golden_street) => None,
            _ => Some(Scenario::SingleMatchMismatch),
        },
        _ => Some(Scenario::MultipleMatches),
    }
}

/// Resolves free text to a golden-source address and gathers the internal
/// rows that refer to it.
pub async fn resolve_address(
    ctx: &ResolutionContext<'_>,
    input: &str,
    threshold: Option<f64>,
) -> Outcome<MatchOutcome> {
    let input = input.trim();
    if input.is_empty() {
        return Outcome::Error(EngineError::InvalidInput("input address is empty".to_string()));
    }
    let request_id = Uuid::new_v4();
    let logger = ResolutionLogger::new(Operation::Resolve, &request_id.to_string());
    logger.log_start(input);

    let engine = ctx.engine();
    let similarity_threshold =
        engine.effective_threshold(threshold.unwrap_or(ctx.settings.default_match_threshold));

    logger.log_phase("Extracting search criteria", None);
    let (search_criteria, extraction_raw) = extract_criteria(ctx, input, &logger).await;
    debug!("Search criteria: {:?}", search_criteria);

    logger.log_phase("Querying golden source", Some(&ctx.settings.golden_table.to_string()));
    let query = build_candidate_query(
        &search_criteria,
        &ctx.settings.golden_table,
        &ctx.settings.golden_columns,
        ctx.settings.candidate_limit,
    );
    if query.is_unfiltered() {
        logger.log_warning("No usable search criteria; sampling the golden source");
    }
    let candidates = match ctx.store.select_filtered(&query).await {
        Ok(rows) => rows,
        Err(e) => {
            logger.log_warning(&format!("Golden source query failed: {:#}", e));
            return Outcome::Error(EngineError::query(e));
        }
    };
    logger.log_candidates(candidates.len(), "golden source");

    let mut outcome = MatchOutcome {
        request_id,
        input_address: input.to_string(),
        search_criteria,
        candidates_searched: candidates.len(),
        confidence_threshold: ctx.settings.confidence_threshold,
        similarity_threshold,
        search_method: if ctx.collaborator.is_some() {
            SearchMethod::FuzzyMatchWithAi
        } else {
            SearchMethod::FuzzyMatch
        },
        match_found: false,
        confidence: None,
        similarity_score: None,
        reasoning: String::new(),
        business_rule_exception: false,
        best_match: None,
        golden_source_matches: Vec::new(),
        internal_matches: Vec::new(),
        suggested_scenario: None,
        raw_response: extraction_raw,
    };

    if candidates.is_empty() {
        outcome.reasoning = "No candidate addresses found in golden source".to_string();
        logger.log_completion("no candidates");
        return Outcome::Success(outcome);
    }

    logger.log_phase("Ranking golden candidates", None);
    let origin = CandidateOrigin::new(SourceType::GoldenSource, &ctx.settings.golden_table);
    let ranked = engine.rank(
        input,
        candidates,
        &ctx.settings.golden_columns.mapping(),
        &origin,
        similarity_threshold,
    );
    let selection = select_golden(ctx, input, &ranked, &logger).await;

    outcome.search_method = selection.method;
    outcome.confidence = selection.confidence;
    outcome.reasoning = selection.reasoning;
    if selection.raw_response.is_some() {
        outcome.raw_response = selection.raw_response;
    }
    outcome.golden_source_matches = ranked;

    let best = match selection.best {
        Some(best) => best,
        None => {
            logger.log_completion("no golden source match");
            return Outcome::Success(outcome);
        }
    };
    outcome.match_found = true;
    outcome.similarity_score = Some(best.metadata.similarity_score);
    outcome.business_rule_exception = outcome
        .confidence
        .map_or(true, |c| c < ctx.settings.confidence_threshold);
    if outcome.business_rule_exception {
        logger.log_warning(&format!(
            "Match confidence {:?} is below threshold {:.0}; flagged as business rule exception",
            outcome.confidence, ctx.settings.confidence_threshold
        ));
    }

    logger.log_phase("Searching internal tables", None);
    let internal = match find_internal_matches(ctx, &engine, &best, similarity_threshold).await {
        Ok(matches) => matches,
        Err(e) => {
            logger.log_warning(&format!("Internal table query failed: {:#}", e));
            return Outcome::Error(EngineError::query(e));
        }
    };
    logger.log_candidates(internal.len(), "internal");

    let golden_street = best
        .record
        .text(&ctx.settings.golden_columns.address1)
        .unwrap_or_default();
    outcome.suggested_scenario = suggest_scenario(&golden_street, &internal);
    outcome.internal_matches = internal;
    outcome.best_match = Some(best);

    logger.log_completion(&format!(
        "matched with {} internal record(s), scenario {:?}",
        outcome.internal_matches.len(),
        outcome.suggested_scenario.map(|s| s.id())
    ));
    Outcome::Success(outcome)
}

#[cfg(test)]
pub(crate) mod test_support {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::collaborator::{Extraction, ExtractionCollaborator};
    use crate::matching::GoldenColumns;
    use crate::models::{AddressRecord, MatchVerdict, SearchCriteria};
    use crate::store::memory::MemoryStore;

    pub const INTERNAL_COLUMNS: &[&str] = &[
        "Address",
        "City",
        "State",
        "Zip Code",
        "Active Customer",
        "Media",
    ];

    pub fn golden_row(address1: &str, city: &str, zip: &str) -> AddressRecord {
        AddressRecord::from_pairs([
            ("address1", json!(address1)),
            ("address2", json!(null)),
            ("Mailing City", json!(city)),
            ("state", json!("FL")),
            ("zipcode", json!(zip)),
        ])
    }

    pub fn internal_row(address: &str, active: &str, media: &str) -> AddressRecord {
        AddressRecord::from_pairs([
            ("Address", json!(address)),
            ("City", json!("Safety Harbor")),
            ("State", json!("FL")),
            ("Zip Code", json!("34695")),
            ("Active Customer", json!(active)),
            ("Media", json!(media)),
        ])
    }

    pub fn store(internal: Vec<AddressRecord>) -> MemoryStore {
        MemoryStore::new()
            .with_table(
                "addresses",
                &["address1", "address2", "Mailing City", "state", "zipcode"],
                vec![
                    golden_row("10 VILLAGE LN", "SAFETY HARBOR", "34695"),
                    golden_row("12 VILLAGE LN", "SAFETY HARBOR", "34695"),
                    golden_row("4471 ULMERTON RD", "LARGO", "33762"),
                ],
            )
            .with_table("internal_addresses", INTERNAL_COLUMNS, internal)
            .with_table(
                "internal_updates",
                &[
                    "Address",
                    "City",
                    "State",
                    "Zip Code",
                    "Active Customer",
                    "Media",
                    "action_label",
                    "priority_weight",
                    "captured_at",
                ],
                Vec::new(),
            )
    }

    /// Collaborator double returning canned responses.
    pub struct ScriptedCollaborator {
        pub criteria: Result<Extraction<SearchCriteria>, String>,
        pub verdict: Result<Extraction<MatchVerdict>, String>,
        pub seen_candidates: Mutex<usize>,
    }

    impl ScriptedCollaborator {
        pub fn new(criteria: Extraction<SearchCriteria>, verdict: Extraction<MatchVerdict>) -> Self {
            Self {
                criteria: Ok(criteria),
                verdict: Ok(verdict),
                seen_candidates: Mutex::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                criteria: Err("connection refused".to_string()),
                verdict: Err("connection refused".to_string()),
                seen_candidates: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ExtractionCollaborator for ScriptedCollaborator {
        async fn extract_search_criteria(&self, _input: &str) -> Result<Extraction<SearchCriteria>> {
            self.criteria.clone().map_err(|e| anyhow!(e))
        }

        async fn verify_match(
            &self,
            _input: &str,
            candidates: &[AddressRecord],
            _columns: &GoldenColumns,
        ) -> Result<Extraction<MatchVerdict>> {
            *self.seen_candidates.lock().unwrap() = candidates.len();
            self.verdict.clone().map_err(|e| anyhow!(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::MatchVerdict;
    use serde_json::json;

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            street_number: Some("10".into()),
            street_name: Some("Village".into()),
            street_type: Some("Lane".into()),
            city: Some("Safety Harbor".into()),
            state: Some("FL".into()),
            confidence: Some(95.0),
            ..Default::default()
        }
    }

    fn resolved(outcome: Outcome<MatchOutcome>) -> MatchOutcome {
        match outcome {
            Outcome::Success(m) => m,
            other => panic!("expected success, got {:?}", other.error_message()),
        }
    }

    #[tokio::test]
    async fn test_fuzzy_only_resolution_finds_internal_duplicates() {
        let store = store(vec![
            internal_row("10 Village Rd", "Y", "Copper"),
            internal_row("10 Village Road", "N", "Fiber"),
            internal_row("12 Village Ln", "N", "Copper"),
        ]);
        let settings = EngineSettings::default();
        let ctx = ResolutionContext::new(&store, &settings);

        let outcome = resolved(resolve_address(&ctx, "10 Village Ln, Safety Harbor, FL 34695", Some(80.0)).await);

        assert!(outcome.match_found);
        assert_eq!(outcome.search_method, SearchMethod::FuzzyMatch);
        assert_eq!(outcome.similarity_threshold, 80.0);
        let best = outcome.best_match.as_ref().unwrap();
        assert_eq!(best.record.text("address1").as_deref(), Some("10 VILLAGE LN"));
        assert_eq!(best.metadata.source_type, SourceType::GoldenSource);

        let streets: Vec<String> = outcome
            .internal_matches
            .iter()
            .filter_map(|c| c.record.text("Address"))
            .collect();
        assert_eq!(streets.len(), 2);
        assert!(!streets.contains(&"12 Village Ln".to_string()));
        assert!(outcome
            .internal_matches
            .iter()
            .all(|c| c.metadata.source_type == SourceType::Internal));
        assert_eq!(outcome.suggested_scenario, Some(Scenario::MultipleMatches));
    }

    #[tokio::test]
    async fn test_threshold_below_floor_is_raised() {
        let store = store(Vec::new());
        let settings = EngineSettings::default();
        let ctx = ResolutionContext::new(&store, &settings);
        let outcome = resolved(resolve_address(&ctx, "10 Village Ln, Safety Harbor, FL", Some(10.0)).await);
        assert_eq!(outcome.similarity_threshold, 75.0);
        assert!(outcome
            .golden_source_matches
            .iter()
            .all(|c| c.metadata.similarity_score >= 75.0));
        assert_eq!(outcome.suggested_scenario, Some(Scenario::GoldenOnly));
    }

    #[tokio::test]
    async fn test_verified_match_with_collaborator() {
        let store = store(vec![internal_row("10 VILLAGE LN", "Y", "Fiber")]);
        let settings = EngineSettings::default();
        let verdict = MatchVerdict {
            match_found: true,
            matched_address: Some(json!({"address1": "10 Village Ln", "state": "FL"})),
            confidence: Some(97.0),
            reasoning: "Street, number and city agree".to_string(),
        };
        let collaborator = ScriptedCollaborator::new(Extraction::Parsed(criteria()), Extraction::Parsed(verdict));
        let ctx = ResolutionContext::new(&store, &settings).with_collaborator(&collaborator);

        let outcome = resolved(resolve_address(&ctx, "10 Village Lane, Safety Harbor, FL 34695", None).await);

        assert_eq!(outcome.search_method, SearchMethod::FuzzyMatchWithAi);
        assert_eq!(outcome.confidence, Some(97.0));
        assert!(!outcome.business_rule_exception);
        // The verdict is tied back to the full golden row.
        let best = outcome.best_match.unwrap();
        assert_eq!(best.record.text("zipcode").as_deref(), Some("34695"));
        assert!(*collaborator.seen_candidates.lock().unwrap() >= 1);
        assert_eq!(outcome.internal_matches.len(), 1);
        assert_eq!(outcome.suggested_scenario, None);
    }

    #[tokio::test]
    async fn test_low_confidence_is_business_rule_exception() {
        let store = store(vec![internal_row("10 Village Rd", "N", "Copper")]);
        let settings = EngineSettings::default();
        let verdict = MatchVerdict {
            match_found: true,
            matched_address: Some(json!({"address1": "10 VILLAGE LN"})),
            confidence: Some(72.0),
            reasoning: "Likely the same lane".to_string(),
        };
        let collaborator = ScriptedCollaborator::new(Extraction::Parsed(criteria()), Extraction::Parsed(verdict));
        let ctx = ResolutionContext::new(&store, &settings).with_collaborator(&collaborator);

        let outcome = resolved(resolve_address(&ctx, "10 Village Ln, Safety Harbor, FL", None).await);
        assert!(outcome.match_found);
        assert!(outcome.business_rule_exception);
        assert_eq!(outcome.suggested_scenario, Some(Scenario::SingleMatchMismatch));
    }

    #[tokio::test]
    async fn test_verdict_outside_ranked_candidates_is_not_accepted() {
        let store = store(vec![internal_row("4471 Ulmerton Rd", "Y", "Fiber")]);
        let settings = EngineSettings::default();
        let verdict = MatchVerdict {
            match_found: true,
            matched_address: Some(json!({"address1": "4471 ULMERTON RD"})),
            confidence: Some(96.0),
            reasoning: "Same parcel".to_string(),
        };
        let collaborator = ScriptedCollaborator::new(Extraction::Parsed(criteria()), Extraction::Parsed(verdict));
        let ctx = ResolutionContext::new(&store, &settings).with_collaborator(&collaborator);

        let outcome = resolved(resolve_address(&ctx, "10 Village Ln, Safety Harbor, FL 34695", None).await);
        assert!(!outcome.match_found);
        assert!(outcome.best_match.is_none());
        assert_eq!(outcome.similarity_score, None);
        assert!(outcome.internal_matches.is_empty());
        assert_eq!(outcome.suggested_scenario, None);
        assert!(outcome.reasoning.contains("not among the candidates"));
        assert!(outcome
            .golden_source_matches
            .iter()
            .all(|c| c.metadata.similarity_score >= 75.0));
    }

    #[tokio::test]
    async fn test_unparseable_verdict_falls_back_to_fuzzy() {
        let store = store(Vec::new());
        let settings = EngineSettings::default();
        let collaborator = ScriptedCollaborator::new(
            Extraction::Parsed(criteria()),
            Extraction::Raw("The first row looks right to me.".to_string()),
        );
        let ctx = ResolutionContext::new(&store, &settings).with_collaborator(&collaborator);

        let outcome = resolved(resolve_address(&ctx, "10 Village Ln, Safety Harbor, FL", None).await);
        assert!(outcome.match_found);
        assert_eq!(outcome.search_method, SearchMethod::FuzzyMatch);
        assert_eq!(outcome.raw_response.as_deref(), Some("The first row looks right to me."));
    }

    #[tokio::test]
    async fn test_collaborator_outage_degrades_to_local_matching() {
        let store = store(Vec::new());
        let settings = EngineSettings::default();
        let collaborator = ScriptedCollaborator::failing();
        let ctx = ResolutionContext::new(&store, &settings).with_collaborator(&collaborator);

        let outcome = resolved(resolve_address(&ctx, "10 Village Ln, Safety Harbor, FL 34695", None).await);
        assert!(outcome.match_found);
        assert_eq!(outcome.search_criteria.state.as_deref(), Some("FL"));
        assert_eq!(outcome.search_method, SearchMethod::FuzzyMatch);
    }

    #[tokio::test]
    async fn test_no_candidates_is_success_without_match() {
        let store = store(Vec::new());
        let settings = EngineSettings::default();
        let ctx = ResolutionContext::new(&store, &settings);
        let outcome = resolved(resolve_address(&ctx, "9 Nowhere Pl, Tampa, FL", None).await);
        assert!(!outcome.match_found);
        assert_eq!(outcome.candidates_searched, 0);
        assert_eq!(outcome.reasoning, "No candidate addresses found in golden source");
    }

    #[tokio::test]
    async fn test_missing_golden_table_is_query_error() {
        let store = crate::store::memory::MemoryStore::new();
        let settings = EngineSettings::default();
        let ctx = ResolutionContext::new(&store, &settings);
        let outcome = resolve_address(&ctx, "10 Village Ln", None).await;
        assert!(matches!(outcome, Outcome::Error(EngineError::Query(_))));
        assert!(matches!(
            resolve_address(&ctx, "   ", None).await,
            Outcome::Error(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_suggest_scenario() {
        let origin = CandidateOrigin::new(SourceType::Internal, &crate::store::TableRef::parse("internal_addresses"));
        let same = origin.annotate(internal_row("10 village ln.", "N", ""), 100.0);
        let differs = origin.annotate(internal_row("10 Village Rd", "N", ""), 88.0);

        assert_eq!(suggest_scenario("10 VILLAGE LN", &[]), Some(Scenario::GoldenOnly));
        assert_eq!(suggest_scenario("10 VILLAGE LN", &[same.clone()]), None);
        assert_eq!(
            suggest_scenario("10 VILLAGE LN", &[differs.clone()]),
            Some(Scenario::SingleMatchMismatch)
        );
        assert_eq!(
            suggest_scenario("10 VILLAGE LN", &[same, differs]),
            Some(Scenario::MultipleMatches)
        );
    }
}
