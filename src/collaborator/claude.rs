// src/collaborator/claude.rs - Claude Messages API client for criteria extraction and match verification
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::{format_candidate_table, parse_json_response, Extraction, ExtractionCollaborator};
use crate::matching::GoldenColumns;
use crate::models::{AddressRecord, MatchVerdict, SearchCriteria};

pub const API_KEY_PREFIX: &str = "sk-ant-api";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const EXTRACTION_MAX_TOKENS: u32 = 500;
const VERIFICATION_MAX_TOKENS: u32 = 2048;

#[derive(Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 60,
        }
    }

    pub fn has_valid_key(&self) -> bool {
        self.api_key.starts_with(API_KEY_PREFIX)
    }
}

impl fmt::Debug for ClaudeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaudeConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct ClaudeClient {
    http: Client,
    config: ClaudeConfig,
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Result<Self> {
        if !config.has_valid_key() {
            return Err(anyhow!(
                "Invalid API key format. Claude API keys should start with '{}'",
                API_KEY_PREFIX
            ));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        info!("Claude collaborator ready (model {})", config.model);
        Ok(Self { http, config })
    }

    async fn send_prompt(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Claude API")?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(anyhow!(
                "Claude API authentication failed (401); check CLAUDE_API_KEY"
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Claude API returned status {}: {}", status, body));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Claude API response")?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        debug!("Raw Claude response: {}", text);
        Ok(text)
    }
}

#[async_trait]
impl ExtractionCollaborator for ClaudeClient {
    async fn extract_search_criteria(&self, input: &str) -> Result<Extraction<SearchCriteria>> {
        let text = self
            .send_prompt(&extraction_prompt(input), EXTRACTION_MAX_TOKENS)
            .await
            .context("Failed to extract search criteria")?;
        Ok(parse_json_response(&text))
    }

    async fn verify_match(
        &self,
        input: &str,
        candidates: &[AddressRecord],
        columns: &GoldenColumns,
    ) -> Result<Extraction<MatchVerdict>> {
        let table = format_candidate_table(candidates, columns);
        let text = self
            .send_prompt(&verification_prompt(input, &table), VERIFICATION_MAX_TOKENS)
            .await
            .context("Failed to verify address match")?;
        Ok(parse_json_response(&text))
    }
}

pub fn extraction_prompt(input: &str) -> String {
    format!(
        r#"Extract searchable components from this address:
{input}

Return a JSON object with the following structure (use null for missing values):
{{
    "street_number": "123",
    "street_name": "Main",
    "street_type": "Street",
    "city": "New York",
    "state": "NY",
    "zip_code": "10001",
    "search_terms": ["main", "street", "new york", "ny", "10001"],
    "confidence": 95
}}

The search_terms array should contain normalized, lowercase search terms that could help find this address in a database.
Be flexible with variations - for example, "St" and "Street" should both be considered.

The confidence field should be a numeric value from 0-100 indicating how confident you are in the extracted components.
Higher values indicate more certainty that the components are correctly identified."#
    )
}

pub fn verification_prompt(input: &str, table: &str) -> String {
    format!(
        r#"You are an expert at matching addresses. I will provide you with:
1. An input address (in free-form plain English)
2. A table of known good addresses (the golden source)

Your task is to find the EXACT match from the table that corresponds to the input address.

Input Address:
{input}

Golden Source Address Table:
{table}

Please analyze the input address and find the exact matching address from the table.
If you find a match, return it in JSON format with the following structure:
{{
    "match_found": true,
    "matched_address": {{...all fields from the matched row...}},
    "confidence": 95,
    "reasoning": "brief explanation of why this is the match"
}}

If no exact match is found, return:
{{
    "match_found": false,
    "confidence": 0,
    "reasoning": "explanation of why no match was found"
}}

The confidence field should be a numeric value from 0-100 indicating how confident you are in the match.
- 90-100: Very high confidence, exact match
- 70-89: High confidence, very close match with minor variations
- 50-69: Medium confidence, similar but some differences
- 0-49: Low confidence, uncertain match or no match

Be very careful to match addresses exactly - consider variations in formatting, abbreviations,
and minor spelling differences, but ensure the core address components match."#
    )
}
