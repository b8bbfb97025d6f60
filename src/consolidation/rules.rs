// src/consolidation/rules.rs - Deterministic merge of conflicting internal records
use log::{debug, info, warn};
use serde::Serialize;

use super::flags::{is_copper, is_fiber, is_placeholder, is_truthy, FlagColumns};
use super::overlay::{overlay_golden, OverlayReport};
use super::update_record::Scenario;
use crate::error::{EngineError, Outcome};
use crate::models::AddressRecord;

/// How the base record of a merge was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseSelection {
    SingleRecord,
    ActiveCustomer,
    FiberMedia,
    FirstRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedRecord {
    pub record: AddressRecord,
    pub base_index: usize,
    pub base_reason: BaseSelection,
    pub merged_count: usize,
    pub scenario: Scenario,
    pub media_upgraded: bool,
    pub overlay: Option<OverlayReport>,
    pub message: String,
}

/// Per-record flag readings, taken once before any rule runs.
#[derive(Debug, Clone, Copy, Default)]
struct RecordFlags {
    active: bool,
    fiber: bool,
}

fn read_flags(record: &AddressRecord, columns: &FlagColumns) -> RecordFlags {
    let value = |col: &Option<String>| col.as_deref().and_then(|c| record.text(c));
    RecordFlags {
        active: is_truthy(value(&columns.active_customer).as_deref()),
        fiber: is_fiber(value(&columns.media).as_deref()),
    }
}

fn indices_where(flags: &[RecordFlags], pred: impl Fn(&RecordFlags) -> bool) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, f)| pred(f))
        .map(|(i, _)| i)
        .collect()
}

/// Merges matched internal records into one, or signals manual review when
/// more than one record is an active customer or on fiber.
pub fn consolidate_records(
    records: &[AddressRecord],
    golden: Option<&AddressRecord>,
    scenario: Scenario,
) -> Outcome<ConsolidatedRecord> {
    if records.is_empty() {
        return Outcome::Error(EngineError::EmptyInput("consolidation"));
    }

    if records.len() == 1 {
        let mut record = records[0].clone();
        let overlay = golden.map(|g| overlay_golden(&mut record, g));
        record.strip_transient();
        return Outcome::Success(ConsolidatedRecord {
            record,
            base_index: 0,
            base_reason: BaseSelection::SingleRecord,
            merged_count: 1,
            scenario,
            media_upgraded: false,
            overlay,
            message: "Single record returned with golden source address applied".to_string(),
        });
    }

    let columns = FlagColumns::discover(records);
    debug!("Flag columns for consolidation: {:?}", columns);
    let flags: Vec<RecordFlags> = records.iter().map(|r| read_flags(r, &columns)).collect();

    let active = indices_where(&flags, |f| f.active);
    let fiber = indices_where(&flags, |f| f.fiber);

    if active.len() > 1 {
        let detail = format!(
            "{} records are flagged as active customers (records {:?}); manual review required",
            active.len(),
            active
        );
        warn!("{}", detail);
        return Outcome::ManualReviewRequired(detail);
    }
    if fiber.len() > 1 {
        let detail = format!(
            "{} records have fiber media (records {:?}); manual review required",
            fiber.len(),
            fiber
        );
        warn!("{}", detail);
        return Outcome::ManualReviewRequired(detail);
    }

    let (base_index, base_reason) = match (active.first(), fiber.first()) {
        (Some(&i), _) => (i, BaseSelection::ActiveCustomer),
        (None, Some(&i)) => (i, BaseSelection::FiberMedia),
        (None, None) => (0, BaseSelection::FirstRecord),
    };
    let mut record = records[base_index].clone();

    let mut media_upgraded = false;
    if base_reason == BaseSelection::ActiveCustomer {
        if let (Some(media_col), Some(&fiber_index)) = (columns.media.as_deref(), fiber.first()) {
            let base_media = record.text(media_col);
            if base_media.is_none() || is_copper(base_media.as_deref()) {
                if let Some(fiber_value) = records[fiber_index].get(media_col).cloned() {
                    info!(
                        "Upgrading media on active customer record from {:?} to {}",
                        base_media, fiber_value
                    );
                    record.set(media_col, fiber_value);
                    media_upgraded = true;
                }
            }
        }
    }

    for column in [&columns.exclusion, &columns.engineering_review]
        .into_iter()
        .flatten()
    {
        let any_flagged = records
            .iter()
            .any(|r| is_truthy(r.text(column).as_deref()));
        if any_flagged {
            record.set(column.clone(), "Y");
        } else if record.text(column).is_none() {
            record.set(column.clone(), "N");
        }
    }

    if let Some(bad_type_col) = columns.bad_type.as_deref() {
        if let Some(merged) = merge_bad_types(records, bad_type_col) {
            record.set(bad_type_col, merged);
        }
    }

    let overlay = golden.map(|g| overlay_golden(&mut record, g));
    record.strip_transient();

    let message = format!(
        "Consolidated {} records using record {} as base ({:?})",
        records.len(),
        base_index,
        base_reason
    );
    info!("{}", message);

    Outcome::Success(ConsolidatedRecord {
        record,
        base_index,
        base_reason,
        merged_count: records.len(),
        scenario,
        media_upgraded,
        overlay,
        message,
    })
}

/// Non-placeholder values across all records, de-duplicated without regard
/// to case and joined with "; ". Already-joined values are split first.
/// `None` when every value is a placeholder.
fn merge_bad_types(records: &[AddressRecord], column: &str) -> Option<String> {
    let mut merged: Vec<String> = Vec::new();
    for value in records.iter().filter_map(|r| r.text(column)) {
        for part in value.split(';').map(str::trim) {
            if is_placeholder(part) {
                continue;
            }
            if !merged.iter().any(|m| m.eq_ignore_ascii_case(part)) {
                merged.push(part.to_string());
            }
        }
    }
    if merged.is_empty() {
        None
    } else {
        Some(merged.join("; "))
    }
}
