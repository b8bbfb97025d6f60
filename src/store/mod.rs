// src/store/mod.rs - Database boundary used by the matching engine
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::models::AddressRecord;

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// A table name, optionally schema-qualified (`schema.table`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().split_once('.') {
            Some((schema, name)) => Self {
                schema: Some(schema.trim().to_string()),
                name: name.trim().to_string(),
            },
            None => Self {
                schema: None,
                name: raw.trim().to_string(),
            },
        }
    }

    /// Quoted identifier suitable for interpolation into SQL.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.name)),
            None => quote_ident(&self.name),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Case-insensitive substring test of `needle` against one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainsPredicate {
    pub column: String,
    pub needle: String,
}

impl ContainsPredicate {
    pub fn new(column: &str, needle: &str) -> Self {
        Self {
            column: column.to_string(),
            needle: needle.trim().to_string(),
        }
    }

    pub fn matches(&self, record: &AddressRecord) -> bool {
        record
            .text(&self.column)
            .map_or(false, |v| v.to_lowercase().contains(&self.needle.to_lowercase()))
    }
}

/// Bounded projection of a table: every `all_of` predicate must hold, and at
/// least one `any_of` predicate when that group is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub all_of: Vec<ContainsPredicate>,
    pub any_of: Vec<ContainsPredicate>,
    pub limit: usize,
}

impl FilterQuery {
    pub fn is_unfiltered(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty()
    }

    pub fn matches(&self, record: &AddressRecord) -> bool {
        self.all_of.iter().all(|p| p.matches(record))
            && (self.any_of.is_empty() || self.any_of.iter().any(|p| p.matches(record)))
    }

    /// Restricts a full row to the projected columns, in projection order.
    pub fn project(&self, record: &AddressRecord) -> AddressRecord {
        AddressRecord::from_pairs(self.columns.iter().map(|c| {
            (
                c.clone(),
                record.get(c).cloned().unwrap_or(serde_json::Value::Null),
            )
        }))
    }
}

/// Operations the engine needs from whatever holds the golden source and
/// internal tables.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Column names in declaration order.
    async fn list_columns(&self, table: &TableRef) -> Result<Vec<String>>;

    async fn select_filtered(&self, query: &FilterQuery) -> Result<Vec<AddressRecord>>;

    /// All rows whose `column` is neither null nor blank.
    async fn select_non_empty(&self, table: &TableRef, column: &str) -> Result<Vec<AddressRecord>>;

    /// Inserts the record's columns, returning the number of rows written.
    async fn insert_record(&self, table: &TableRef, record: &AddressRecord) -> Result<u64>;

    /// Sum of a numeric column over the whole table (0 when empty).
    async fn sum_column(&self, table: &TableRef, column: &str) -> Result<f64>;
}
