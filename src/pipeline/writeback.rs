// src/pipeline/writeback.rs - Consolidation, update pushes and time-saved reporting
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::ResolutionContext;
use crate::consolidation::{
    build_update_record, consolidate_records, map_golden_to_internal, ConsolidatedRecord, OverlayReport,
    Scenario, UpdateRecord,
};
use crate::error::{EngineError, Outcome};
use crate::models::AddressRecord;
use crate::utils::logging::{Operation, ResolutionLogger};

/// Sanitizes externally supplied rows. Anything but a JSON object is rejected.
pub fn records_from_json(values: Vec<Value>) -> Result<Vec<AddressRecord>, EngineError> {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            AddressRecord::from_external(value)
                .ok_or_else(|| EngineError::InvalidInput(format!("record {} is not a JSON object", idx)))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub update: UpdateRecord,
    pub rows_inserted: u64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidated: Option<ConsolidatedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<OverlayReport>,
}

pub fn consolidate(
    records: &[AddressRecord],
    golden: Option<&AddressRecord>,
    scenario: Scenario,
) -> Outcome<ConsolidatedRecord> {
    let logger = ResolutionLogger::new(Operation::Consolidate, &Uuid::new_v4().to_string());
    logger.log_start(&format!("{} record(s), scenario {}", records.len(), scenario.id()));
    let outcome = consolidate_records(records, golden, scenario);
    match &outcome {
        Outcome::Success(c) => logger.log_completion(&c.message),
        Outcome::ManualReviewRequired(detail) => logger.log_warning(detail),
        Outcome::Error(e) => logger.log_warning(&e.to_string()),
    }
    outcome
}

async fn insert_update(
    ctx: &ResolutionContext<'_>,
    logger: &ResolutionLogger,
    update: UpdateRecord,
) -> Outcome<(UpdateRecord, u64)> {
    let row = update.to_row(&ctx.settings.update_columns);
    let table = &ctx.settings.updates_table;
    logger.log_phase("Inserting update record", Some(&table.to_string()));
    match ctx.store.insert_record(table, &row).await {
        Ok(rows) => Outcome::Success((update, rows)),
        Err(e) => {
            logger.log_warning(&format!("Insert into {} failed: {:#}", table, e));
            Outcome::Error(EngineError::query(e))
        }
    }
}

/// Consolidates `records` and inserts the result, with scenario metadata,
/// into the updates table.
pub async fn push_updates(
    ctx: &ResolutionContext<'_>,
    records: &[AddressRecord],
    golden: Option<&AddressRecord>,
    scenario: Scenario,
) -> Outcome<PushReport> {
    let logger = ResolutionLogger::new(Operation::WriteBack, &Uuid::new_v4().to_string());
    logger.log_start(&format!("push {} record(s) to {}", records.len(), ctx.settings.updates_table));

    let consolidated = match consolidate_records(records, golden, scenario) {
        Outcome::Success(c) => c,
        Outcome::ManualReviewRequired(detail) => {
            logger.log_warning(&detail);
            return Outcome::ManualReviewRequired(detail);
        }
        Outcome::Error(e) => return Outcome::Error(e),
    };

    let update = build_update_record(consolidated.record.clone(), scenario.id(), Utc::now());
    insert_update(ctx, &logger, update).await.map(|(update, rows_inserted)| {
        let message = format!(
            "Record successfully pushed to {} ({})",
            ctx.settings.updates_table, update.action_label
        );
        logger.log_completion(&message);
        PushReport {
            update,
            rows_inserted,
            message,
            consolidated: Some(consolidated),
            mapping: None,
        }
    })
}

/// Writes a golden record with no internal counterpart into the updates
/// table, mapped onto that table's own columns.
pub async fn write_golden_to_internal(
    ctx: &ResolutionContext<'_>,
    golden: &AddressRecord,
) -> Outcome<PushReport> {
    let logger = ResolutionLogger::new(Operation::WriteBack, &Uuid::new_v4().to_string());
    if golden.is_empty() {
        return Outcome::Error(EngineError::EmptyInput("golden source write"));
    }
    let table = &ctx.settings.updates_table;
    logger.log_start(&format!("write golden record to {}", table));

    let metadata = &ctx.settings.update_columns;
    let columns: Vec<String> = match ctx.store.list_columns(table).await {
        Ok(cols) => cols
            .into_iter()
            .filter(|c| c != &metadata.action && c != &metadata.weight && c != &metadata.timestamp)
            .collect(),
        Err(e) => return Outcome::Error(EngineError::query(e)),
    };

    let (record, report) = map_golden_to_internal(golden, &columns);
    if record.is_empty() {
        return Outcome::Error(EngineError::InvalidInput(format!(
            "no golden source field maps onto a column of {}",
            table
        )));
    }

    let update = build_update_record(record, Scenario::GoldenOnly.id(), Utc::now());
    insert_update(ctx, &logger, update).await.map(|(update, rows_inserted)| {
        let message = format!("Golden source record written to {}", table);
        logger.log_completion(&message);
        PushReport {
            update,
            rows_inserted,
            message,
            consolidated: None,
            mapping: Some(report),
        }
    })
}

/// Total priority weight of all pushed updates, in hours.
pub async fn time_saved_hours(ctx: &ResolutionContext<'_>) -> Outcome<f64> {
    let logger = ResolutionLogger::new(Operation::Report, &Uuid::new_v4().to_string());
    let table = &ctx.settings.updates_table;
    logger.log_start(&format!("time saved across {}", table));
    match ctx
        .store
        .sum_column(table, &ctx.settings.update_columns.weight)
        .await
    {
        Ok(minutes) => {
            let hours = minutes / 60.0;
            logger.log_completion(&format!("{:.2} hours", hours));
            Outcome::Success(hours)
        }
        Err(e) => {
            logger.log_warning(&format!("Sum over {} failed: {:#}", table, e));
            Outcome::Error(EngineError::query(e))
        }
    }
}
