// src/models.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Keys starting with this marker belong to transport metadata, never to a table row.
pub const TRANSIENT_KEY_PREFIX: &str = "_";

/// One row from the golden source or an internal table, keyed by the
/// table's own column names in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressRecord(Map<String, Value>);

impl AddressRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Builds a record from externally supplied JSON. Non-object values are
    /// rejected and transient metadata keys are dropped on the way in.
    pub fn from_external(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(
                map.into_iter()
                    .filter(|(k, _)| !k.starts_with(TRANSIENT_KEY_PREFIX))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Drops transient metadata keys, returning how many were removed.
    pub fn strip_transient(&mut self) -> usize {
        let before = self.0.len();
        self.0.retain(|k, _| !k.starts_with(TRANSIENT_KEY_PREFIX));
        before - self.0.len()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Scalar value rendered as trimmed text; `None` for null, empty or nested values.
    pub fn text(&self, column: &str) -> Option<String> {
        self.0.get(column).and_then(scalar_text)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Structured criteria extracted from free text by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub street_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
}

impl SearchCriteria {
    /// True when none of the fields used for filtering carry a value.
    pub fn has_filters(&self) -> bool {
        [&self.state, &self.city, &self.street_name, &self.street_type]
            .iter()
            .any(|v| v.as_deref().map_or(false, |s| !s.trim().is_empty()))
    }
}

/// Accepts strings, numbers or null; numbers become their decimal text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    GoldenSource,
    Internal,
}

/// Per-candidate annotations computed while matching. Kept apart from the
/// row so it can never be written back to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub similarity_score: f64,
    pub source_type: SourceType,
    pub source_table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub record: AddressRecord,
    pub metadata: CandidateMetadata,
}

/// Verification verdict returned by the extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchVerdict {
    #[serde(default)]
    pub match_found: bool,
    #[serde(default)]
    pub matched_address: Option<Value>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: String,
}

impl MatchVerdict {
    pub fn matched_record(&self) -> Option<AddressRecord> {
        self.matched_address
            .clone()
            .and_then(AddressRecord::from_external)
            .filter(|r| !r.is_empty())
    }
}
