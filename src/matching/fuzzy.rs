// src/matching/fuzzy.rs - Street-number gated fuzzy matching against golden and internal tables
use anyhow::Result;
use log::{debug, info, warn};
use std::cmp::Ordering;

use super::normalizer::{clean_for_fuzzy_compare, extract_core_street_name, extract_street_number};
use super::similarity::token_sort_ratio;
use crate::models::{AddressRecord, CandidateMetadata, MatchCandidate, SourceType};
use crate::schema::{ColumnMapping, LogicalField};
use crate::store::{AddressStore, TableRef};

/// Lowest similarity the engine will ever accept, whatever the caller asks for.
pub const MIN_SIMILARITY_FLOOR: f64 = 75.0;

#[derive(Debug, Clone)]
pub struct FuzzyMatchEngine {
    floor: f64,
}

impl Default for FuzzyMatchEngine {
    fn default() -> Self {
        Self {
            floor: MIN_SIMILARITY_FLOOR,
        }
    }
}

impl FuzzyMatchEngine {
    /// A configured floor can only raise the minimum.
    pub fn new(floor: f64) -> Self {
        let floor = if floor.is_nan() {
            MIN_SIMILARITY_FLOOR
        } else {
            floor.clamp(MIN_SIMILARITY_FLOOR, 100.0)
        };
        Self { floor }
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn effective_threshold(&self, requested: f64) -> f64 {
        if requested.is_nan() {
            return self.floor;
        }
        requested.clamp(self.floor, 100.0)
    }

    /// Similarity of two free-text addresses after state/zip cleanup.
    pub fn score(&self, input: &str, candidate: &str) -> f64 {
        token_sort_ratio(
            &clean_for_fuzzy_compare(input),
            &clean_for_fuzzy_compare(candidate),
        )
    }

    /// Scores `rows` against `input`, keeping rows with the same street
    /// number and a similarity at or above the (floored) threshold. Results
    /// are ordered by descending score, ties in input order.
    pub fn rank(
        &self,
        input: &str,
        rows: Vec<AddressRecord>,
        mapping: &ColumnMapping,
        origin: &CandidateOrigin,
        threshold: f64,
    ) -> Vec<MatchCandidate> {
        let threshold = self.effective_threshold(threshold);
        let input_number = match extract_street_number(input) {
            Some(n) => n,
            None => {
                warn!("No street number in '{}'; nothing can pass the street number gate", input);
                return Vec::new();
            }
        };

        let mut matches: Vec<MatchCandidate> = rows
            .into_iter()
            .filter_map(|record| {
                let text = candidate_text(&record, mapping)?;
                let number = extract_street_number(&text)?;
                if number != input_number {
                    return None;
                }
                let score = self.score(input, &text);
                if score < threshold {
                    debug!("'{}' scored {:.2} below threshold {:.2}", text, score, threshold);
                    return None;
                }
                Some(origin.annotate(record, score))
            })
            .collect();

        sort_by_score(&mut matches);
        matches
    }
}

/// Where a candidate was read from; attached to every result as metadata.
#[derive(Debug, Clone)]
pub struct CandidateOrigin {
    pub source_type: SourceType,
    pub table: String,
}

impl CandidateOrigin {
    pub fn new(source_type: SourceType, table: &TableRef) -> Self {
        Self {
            source_type,
            table: table.to_string(),
        }
    }

    pub fn annotate(&self, record: AddressRecord, similarity_score: f64) -> MatchCandidate {
        MatchCandidate {
            record,
            metadata: CandidateMetadata {
                similarity_score,
                source_type: self.source_type,
                source_table: self.table.clone(),
            },
        }
    }
}

pub fn sort_by_score(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| {
        b.metadata
            .similarity_score
            .partial_cmp(&a.metadata.similarity_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Comparable text for a row: the street column followed by city, state and
/// zip when those are not already part of the street value.
pub fn candidate_text(record: &AddressRecord, mapping: &ColumnMapping) -> Option<String> {
    let street = record.text(mapping.address.as_deref()?)?;
    let mut parts = vec![street.clone()];
    let lowered = street.to_lowercase();
    for field in [LogicalField::City, LogicalField::State, LogicalField::Zip] {
        if let Some(value) = mapping.get(field).and_then(|c| record.text(c)) {
            if !lowered.contains(&value.to_lowercase()) {
                parts.push(value);
            }
        }
    }
    Some(parts.join(", "))
}

/// Discovers the table's columns, returning `None` (and logging) when the
/// address or state column cannot be identified.
pub async fn discover_mapping(
    store: &dyn AddressStore,
    table: &TableRef,
) -> Result<Option<ColumnMapping>> {
    let mapping = ColumnMapping::from_columns(store.list_columns(table).await?);
    let missing = mapping.missing_required();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(LogicalField::as_str).collect();
        warn!(
            "Skipping {}: could not identify {} column(s) among {:?}",
            table,
            names.join(", "),
            mapping.columns
        );
        return Ok(None);
    }
    debug!("Column mapping for {}: {:?}", table, mapping);
    Ok(Some(mapping))
}

/// Fuzzy search of a whole table. A table whose address/state columns cannot
/// be identified yields no matches rather than an error.
pub async fn find_fuzzy_matches(
    store: &dyn AddressStore,
    engine: &FuzzyMatchEngine,
    table: &TableRef,
    input: &str,
    threshold: f64,
    source_type: SourceType,
) -> Result<Vec<MatchCandidate>> {
    let mapping = match discover_mapping(store, table).await? {
        Some(m) => m,
        None => return Ok(Vec::new()),
    };
    let address_column = mapping.address.clone().unwrap_or_default();
    let rows = store.select_non_empty(table, &address_column).await?;
    let scanned = rows.len();

    let matches = engine.rank(
        input,
        rows,
        &mapping,
        &CandidateOrigin::new(source_type, table),
        threshold,
    );
    info!(
        "Fuzzy search on {}: {} of {} rows matched '{}' at threshold {:.1}",
        table,
        matches.len(),
        scanned,
        input,
        engine.effective_threshold(threshold)
    );
    Ok(matches)
}

/// Rows sharing the street number and type-agnostic street name of
/// `street_line`. Scores are still computed against `reference` for ordering.
pub async fn find_exact_matches(
    store: &dyn AddressStore,
    engine: &FuzzyMatchEngine,
    table: &TableRef,
    street_line: &str,
    reference: &str,
    source_type: SourceType,
) -> Result<Vec<MatchCandidate>> {
    let (number, core) = match (
        extract_street_number(street_line),
        extract_core_street_name(street_line),
    ) {
        (Some(n), Some(c)) => (n, c),
        _ => {
            warn!("Cannot run exact filter: '{}' has no street number or name", street_line);
            return Ok(Vec::new());
        }
    };
    let mapping = match discover_mapping(store, table).await? {
        Some(m) => m,
        None => return Ok(Vec::new()),
    };
    let address_column = mapping.address.clone().unwrap_or_default();
    let origin = CandidateOrigin::new(source_type, table);

    let mut matches: Vec<MatchCandidate> = store
        .select_non_empty(table, &address_column)
        .await?
        .into_iter()
        .filter(|record| {
            record.text(&address_column).map_or(false, |value| {
                extract_street_number(&value).as_deref() == Some(number.as_str())
                    && extract_core_street_name(&value).as_deref() == Some(core.as_str())
            })
        })
        .map(|record| {
            let score = candidate_text(&record, &mapping)
                .map_or(0.0, |text| engine.score(reference, &text));
            origin.annotate(record, score)
        })
        .collect();

    sort_by_score(&mut matches);
    debug!("Exact filter on {} for {} {}: {} rows", table, number, core, matches.len());
    Ok(matches)
}
