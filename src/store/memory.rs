// src/store/memory.rs - In-memory AddressStore double for engine tests
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{AddressStore, FilterQuery, TableRef};
use crate::models::AddressRecord;

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, (Vec<String>, Vec<AddressRecord>)>>,
    fail_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str, columns: &[&str], rows: Vec<AddressRecord>) -> Self {
        self.tables.lock().unwrap().insert(
            TableRef::parse(table).to_string(),
            (columns.iter().map(|c| c.to_string()).collect(), rows),
        );
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn rows(&self, table: &str) -> Vec<AddressRecord> {
        self.tables
            .lock()
            .unwrap()
            .get(&TableRef::parse(table).to_string())
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn list_columns(&self, table: &TableRef) -> Result<Vec<String>> {
        self.tables
            .lock()
            .unwrap()
            .get(&table.to_string())
            .map(|(cols, _)| cols.clone())
            .ok_or_else(|| anyhow!("Table {} does not exist or has no columns", table))
    }

    async fn select_filtered(&self, query: &FilterQuery) -> Result<Vec<AddressRecord>> {
        let tables = self.tables.lock().unwrap();
        let (_, rows) = tables
            .get(&query.table.to_string())
            .ok_or_else(|| anyhow!("relation {} does not exist", query.table))?;
        Ok(rows
            .iter()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .map(|r| query.project(r))
            .collect())
    }

    async fn select_non_empty(&self, table: &TableRef, column: &str) -> Result<Vec<AddressRecord>> {
        let tables = self.tables.lock().unwrap();
        let (_, rows) = tables
            .get(&table.to_string())
            .ok_or_else(|| anyhow!("relation {} does not exist", table))?;
        Ok(rows.iter().filter(|r| r.text(column).is_some()).cloned().collect())
    }

    async fn insert_record(&self, table: &TableRef, record: &AddressRecord) -> Result<u64> {
        if self.fail_inserts {
            bail!("simulated insert failure on {}", table);
        }
        let mut tables = self.tables.lock().unwrap();
        let (columns, rows) = tables
            .get_mut(&table.to_string())
            .ok_or_else(|| anyhow!("relation {} does not exist", table))?;
        if let Some(unknown) = record.columns().find(|c| !columns.iter().any(|k| k == c)) {
            bail!("column {} of relation {} does not exist", unknown, table);
        }
        rows.push(record.clone());
        Ok(1)
    }

    async fn sum_column(&self, table: &TableRef, column: &str) -> Result<f64> {
        let tables = self.tables.lock().unwrap();
        let (_, rows) = tables
            .get(&table.to_string())
            .ok_or_else(|| anyhow!("relation {} does not exist", table))?;
        Ok(rows
            .iter()
            .filter_map(|r| r.text(column).and_then(|v| v.parse::<f64>().ok()))
            .sum())
    }
}
