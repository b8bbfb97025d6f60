// src/consolidation/update_record.rs - Scenario metadata stamped onto records before write-back
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::AddressRecord;

/// Why an update record exists. Serialized as its numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Scenario {
    MultipleMatches,
    SingleMatchMismatch,
    GoldenOnly,
}

impl Scenario {
    /// Unknown ids fall back to the multiple-matches scenario.
    pub fn from_id(id: u8) -> Self {
        match id {
            2 => Scenario::SingleMatchMismatch,
            3 => Scenario::GoldenOnly,
            _ => Scenario::MultipleMatches,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Scenario::MultipleMatches => 1,
            Scenario::SingleMatchMismatch => 2,
            Scenario::GoldenOnly => 3,
        }
    }

    pub fn action_label(&self) -> &'static str {
        match self {
            Scenario::MultipleMatches => "multiple matches consolidated",
            Scenario::SingleMatchMismatch => "single match, address mismatch",
            Scenario::GoldenOnly => "golden source only, no internal match",
        }
    }

    /// Minutes of manual work the update replaces.
    pub fn priority_weight(&self) -> i32 {
        match self {
            Scenario::MultipleMatches => 20,
            Scenario::SingleMatchMismatch => 10,
            Scenario::GoldenOnly => 5,
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::MultipleMatches
    }
}

impl From<u8> for Scenario {
    fn from(id: u8) -> Self {
        Scenario::from_id(id)
    }
}

impl From<Scenario> for u8 {
    fn from(scenario: Scenario) -> Self {
        scenario.id()
    }
}

/// Column names the metadata is written under in the updates table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateColumns {
    pub action: String,
    pub weight: String,
    pub timestamp: String,
}

impl Default for UpdateColumns {
    fn default() -> Self {
        Self {
            action: "action_label".to_string(),
            weight: "priority_weight".to_string(),
            timestamp: "captured_at".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRecord {
    pub record: AddressRecord,
    pub scenario: Scenario,
    pub action_label: String,
    pub priority_weight: i32,
    pub timestamp: DateTime<Utc>,
}

impl UpdateRecord {
    /// Flattens record and metadata into the row inserted into the updates table.
    pub fn to_row(&self, columns: &UpdateColumns) -> AddressRecord {
        let mut row = self.record.clone();
        row.set(columns.action.clone(), json!(self.action_label));
        row.set(columns.weight.clone(), json!(self.priority_weight));
        row.set(columns.timestamp.clone(), json!(self.timestamp.to_rfc3339()));
        row
    }
}

pub fn build_update_record(record: AddressRecord, scenario_id: u8, now: DateTime<Utc>) -> UpdateRecord {
    let scenario = Scenario::from_id(scenario_id);
    UpdateRecord {
        record,
        scenario,
        action_label: scenario.action_label().to_string(),
        priority_weight: scenario.priority_weight(),
        timestamp: now,
    }
}
