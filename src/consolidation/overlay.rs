// src/consolidation/overlay.rs - Golden-source address overlay onto internal records
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;

use crate::models::AddressRecord;
use crate::schema::{normalize_column_name, LogicalField};

/// Address-identifying fields a golden record can contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoldenField {
    Address1,
    Address2,
    City,
    State,
    Zip,
    MasterAddress,
}

impl GoldenField {
    /// Classifies a golden-source key by its normalized name.
    pub fn classify(key: &str) -> Option<Self> {
        let name = normalize_column_name(key);
        if name.contains("city") {
            return Some(GoldenField::City);
        }
        match name.as_str() {
            "address1" | "addressline1" | "street1" | "streetaddress" => Some(GoldenField::Address1),
            "address2" | "addressline2" | "street2" => Some(GoldenField::Address2),
            "state" | "st" | "statecode" => Some(GoldenField::State),
            "zipcode" | "zip" | "postalcode" | "postcode" | "zip5" => Some(GoldenField::Zip),
            "masteraddress" | "fulladdress" => Some(GoldenField::MasterAddress),
            _ => None,
        }
    }

    /// Normalized internal column names accepted for this field, in preference order.
    fn internal_names(&self) -> &'static [&'static str] {
        match self {
            GoldenField::Address1 => &["address1", "address", "streetaddress", "addressline1", "street1"],
            GoldenField::Address2 => &["address2", "addressline2", "unit", "unitnumber", "apt", "suite"],
            GoldenField::State => &["state", "st", "statecode", "province"],
            GoldenField::Zip => &["zipcode", "zip", "postalcode", "postcode", "zip5"],
            GoldenField::MasterAddress => &["masteraddress", "fulladdress"],
            // City columns vary too much for a fixed list; the column mapper heuristic decides.
            GoldenField::City => &[],
        }
    }

    /// Internal column this field lands in, ignoring columns already claimed.
    fn find_target(&self, columns: &[String], claimed: &[String]) -> Option<String> {
        let open: Vec<String> = columns
            .iter()
            .filter(|c| !claimed.contains(c))
            .cloned()
            .collect();

        if *self == GoldenField::City {
            return LogicalField::City.patterns().find(&open).cloned();
        }

        let normalized: Vec<String> = open.iter().map(|c| normalize_column_name(c)).collect();
        self.internal_names()
            .iter()
            .find_map(|name| normalized.iter().position(|n| n == name))
            .map(|idx| open[idx].clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAssignment {
    pub golden_column: String,
    pub internal_column: String,
    pub value: Value,
}

/// What an overlay did with each golden field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlayReport {
    pub applied: Vec<FieldAssignment>,
    pub dropped: Vec<String>,
    pub skipped_empty: Vec<String>,
}

impl OverlayReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Pairs golden fields with internal columns. Each internal column is
/// claimed at most once, golden fields are visited in record order.
pub fn plan_overlay(golden: &AddressRecord, internal_columns: &[String]) -> OverlayReport {
    let mut report = OverlayReport::default();
    let mut claimed: Vec<String> = Vec::new();

    for (key, value) in golden.iter() {
        if is_empty_value(value) {
            report.skipped_empty.push(key.clone());
            continue;
        }
        let target = GoldenField::classify(key)
            .and_then(|field| field.find_target(internal_columns, &claimed));
        match target {
            Some(column) => {
                claimed.push(column.clone());
                report.applied.push(FieldAssignment {
                    golden_column: key.clone(),
                    internal_column: column,
                    value: value.clone(),
                });
            }
            None => report.dropped.push(key.clone()),
        }
    }

    if !report.dropped.is_empty() {
        warn!(
            "Golden fields with no matching internal column were dropped: {}",
            report.dropped.join(", ")
        );
    }
    report
}

/// Overwrites address fields of `record` in place. Never adds columns.
pub fn overlay_golden(record: &mut AddressRecord, golden: &AddressRecord) -> OverlayReport {
    let columns: Vec<String> = record.columns().map(str::to_string).collect();
    let report = plan_overlay(golden, &columns);
    for assignment in &report.applied {
        debug!(
            "Overlay {} -> {} = {}",
            assignment.golden_column, assignment.internal_column, assignment.value
        );
        record.set(assignment.internal_column.clone(), assignment.value.clone());
    }
    report
}

/// Builds a fresh internal-shaped record holding only the mapped golden fields.
pub fn map_golden_to_internal(
    golden: &AddressRecord,
    internal_columns: &[String],
) -> (AddressRecord, OverlayReport) {
    let report = plan_overlay(golden, internal_columns);
    let mut record = AddressRecord::new();
    // Emit in internal declaration order so inserts read like the table.
    for column in internal_columns {
        if let Some(a) = report.applied.iter().find(|a| &a.internal_column == column) {
            record.set(column.clone(), a.value.clone());
        }
    }
    (record, report)
}
