// src/consolidation/flags.rs - Flag column discovery and value classification
use serde::Serialize;

use crate::models::AddressRecord;
use crate::schema::normalize_column_name;

/// Values read as "yes" on every flag column, compared case-insensitively.
pub const TRUTHY_VALUES: &[&str] = &["Y", "YES", "TRUE", "1"];

/// Values of free-text fields that mean "nothing recorded".
pub const PLACEHOLDER_VALUES: &[&str] = &["NONE", "N/A", "NULL"];

pub fn is_truthy(value: Option<&str>) -> bool {
    value.map_or(false, |v| {
        let v = v.trim().to_uppercase();
        TRUTHY_VALUES.contains(&v.as_str())
    })
}

pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim().to_uppercase();
    v.is_empty() || PLACEHOLDER_VALUES.contains(&v.as_str())
}

pub fn is_fiber(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.to_uppercase().contains("FIBER"))
}

pub fn is_copper(value: Option<&str>) -> bool {
    value.map_or(false, |v| v.to_uppercase().contains("COPPER"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    ActiveCustomer,
    Media,
    Exclusion,
    EngineeringReview,
    BadType,
}

impl FlagKind {
    /// (exact, contains) rules over normalized column names, tried in order.
    fn rules(&self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            FlagKind::ActiveCustomer => (
                &["activecustomer", "isactivecustomer", "customeractive", "active", "isactive", "activeflag"],
                &["activecustomer", "activecust"],
            ),
            FlagKind::Media => (&["media", "mediatype", "servicemedia", "medium"], &["media"]),
            FlagKind::Exclusion => (
                &["exclusion", "exclusionflag", "excluded", "exclude"],
                &["exclusion", "exclude"],
            ),
            FlagKind::EngineeringReview => (
                &["engineeringreview", "engreview", "needsengineering"],
                &["engineeringreview", "engreview", "engineering"],
            ),
            FlagKind::BadType => (&["badtype", "badaddresstype"], &["badtype", "badaddress"]),
        }
    }

    pub fn find_column(&self, columns: &[String]) -> Option<String> {
        let normalized: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();
        let (exact, contains) = self.rules();
        exact
            .iter()
            .find_map(|p| normalized.iter().position(|n| n == p))
            .or_else(|| {
                contains
                    .iter()
                    .find_map(|p| normalized.iter().position(|n| n.contains(p)))
            })
            .map(|idx| columns[idx].clone())
    }
}

/// Physical flag columns found across a set of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagColumns {
    pub active_customer: Option<String>,
    pub media: Option<String>,
    pub exclusion: Option<String>,
    pub engineering_review: Option<String>,
    pub bad_type: Option<String>,
}

impl FlagColumns {
    pub fn discover(records: &[AddressRecord]) -> Self {
        let columns = union_columns(records);
        Self {
            active_customer: FlagKind::ActiveCustomer.find_column(&columns),
            media: FlagKind::Media.find_column(&columns),
            exclusion: FlagKind::Exclusion.find_column(&columns),
            engineering_review: FlagKind::EngineeringReview.find_column(&columns),
            bad_type: FlagKind::BadType.find_column(&columns),
        }
    }
}

/// Column names of all records, first-seen order, without duplicates.
pub fn union_columns(records: &[AddressRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for column in record.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}
