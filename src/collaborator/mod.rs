// src/collaborator/mod.rs - Extraction/verification collaborator seam and response parsing
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::matching::GoldenColumns;
use crate::models::{AddressRecord, MatchVerdict, SearchCriteria};

pub mod claude;

pub use claude::{ClaudeClient, ClaudeConfig};

/// A collaborator response: the expected structure, or the raw text when it
/// could not be read as one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction<T> {
    Parsed(T),
    Raw(String),
}

impl<T> Extraction<T> {
    pub fn parsed(&self) -> Option<&T> {
        match self {
            Extraction::Parsed(value) => Some(value),
            Extraction::Raw(_) => None,
        }
    }

    pub fn into_parsed(self) -> Option<T> {
        match self {
            Extraction::Parsed(value) => Some(value),
            Extraction::Raw(_) => None,
        }
    }

    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Extraction::Parsed(_) => None,
            Extraction::Raw(text) => Some(text),
        }
    }
}

/// Natural-language address extraction and match verification.
#[async_trait]
pub trait ExtractionCollaborator: Send + Sync {
    async fn extract_search_criteria(&self, input: &str) -> Result<Extraction<SearchCriteria>>;

    async fn verify_match(
        &self,
        input: &str,
        candidates: &[AddressRecord],
        columns: &GoldenColumns,
    ) -> Result<Extraction<MatchVerdict>>;
}

// One level of nesting is enough for a verdict carrying matched_address.
static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").unwrap());

fn clean_json_response(response: &str) -> String {
    response
        .trim()
        .replace("```json", "")
        .replace("```", "")
        .replace(",\n}", "\n}")
        .replace(",}", "}")
        .replace(",\n]", "\n]")
        .replace(",]", "]")
}

/// Reads a model response as `T`: direct parse, then with code fences and
/// trailing commas removed, then the first JSON object embedded in the text.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Extraction<T> {
    match serde_json::from_str::<T>(response.trim()) {
        Ok(value) => return Extraction::Parsed(value),
        Err(e) => debug!("Direct JSON parsing failed: {}", e),
    }

    let cleaned = clean_json_response(response);
    if let Ok(value) = serde_json::from_str::<T>(&cleaned) {
        debug!("Cleaned JSON parsing succeeded");
        return Extraction::Parsed(value);
    }

    if let Some(found) = JSON_OBJECT_RE.find(&cleaned) {
        match serde_json::from_str::<T>(found.as_str()) {
            Ok(value) => {
                debug!("Embedded JSON object parsing succeeded");
                return Extraction::Parsed(value);
            }
            Err(e) => debug!("Embedded JSON object parsing failed: {}", e),
        }
    }

    Extraction::Raw(response.to_string())
}

/// Renders candidates as a header line, a dashed separator and numbered
/// `a | b | c | d | e` rows over the five golden columns.
pub fn format_candidate_table(candidates: &[AddressRecord], columns: &GoldenColumns) -> String {
    if candidates.is_empty() {
        return "No addresses in table.".to_string();
    }
    let names = columns.all();
    let header = names.join(" | ");
    let separator = "-".repeat(header.len());

    let rows: Vec<String> = candidates
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let values: Vec<String> = names
                .iter()
                .map(|col| record.text(col).unwrap_or_default())
                .collect();
            format!("{}. {}", idx + 1, values.join(" | "))
        })
        .collect();

    format!("{}\n{}\n{}", header, separator, rows.join("\n"))
}
