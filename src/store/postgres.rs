// src/store/postgres.rs - AddressStore backed by a bb8 PostgreSQL pool
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use postgres_types::ToSql;
use serde_json::Value;
use tokio_postgres::Row;

use super::{quote_ident, AddressStore, ContainsPredicate, FilterQuery, TableRef};
use crate::models::AddressRecord;
use crate::utils::db_connect::PgPool;

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Every column is read back as text so rows of unknown schema decode uniformly.
fn text_projection(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("{q}::text AS {q}", q = quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escapes LIKE wildcards so the needle is matched literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Renders a filter query into SQL plus its positional text parameters.
pub fn render_filter_sql(query: &FilterQuery) -> (String, Vec<String>) {
    let mut params = Vec::new();
    let mut render = |p: &ContainsPredicate| {
        params.push(like_pattern(&p.needle));
        format!("{}::text ILIKE ${}", quote_ident(&p.column), params.len())
    };

    let mut clauses: Vec<String> = query.all_of.iter().map(&mut render).collect();
    if !query.any_of.is_empty() {
        let any: Vec<String> = query.any_of.iter().map(&mut render).collect();
        clauses.push(format!("({})", any.join(" OR ")));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM {}{} LIMIT {}",
        text_projection(&query.columns),
        query.table.quoted(),
        where_clause,
        query.limit
    );
    (sql, params)
}

fn record_from_row(row: &Row, columns: &[String]) -> Result<AddressRecord> {
    let mut record = AddressRecord::new();
    for (idx, column) in columns.iter().enumerate() {
        let value: Option<String> = row
            .try_get(idx)
            .with_context(|| format!("Failed to read column {}", column))?;
        record.set(column.clone(), value.map_or(Value::Null, Value::String));
    }
    Ok(record)
}

#[async_trait]
impl AddressStore for PostgresStore {
    async fn list_columns(&self, table: &TableRef) -> Result<Vec<String>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for list_columns")?;

        let rows = match &table.schema {
            Some(schema) => conn
                .query(
                    "SELECT column_name::text FROM information_schema.columns
                     WHERE table_schema = $1 AND table_name = $2
                     ORDER BY ordinal_position",
                    &[schema, &table.name],
                )
                .await,
            None => conn
                .query(
                    "SELECT column_name::text FROM information_schema.columns
                     WHERE table_name = $1
                     ORDER BY ordinal_position",
                    &[&table.name],
                )
                .await,
        }
        .with_context(|| format!("Failed to list columns of {}", table))?;

        let columns: Vec<String> = rows.iter().map(|r| r.get(0)).collect();
        if columns.is_empty() {
            bail!("Table {} does not exist or has no columns", table);
        }
        Ok(columns)
    }

    async fn select_filtered(&self, query: &FilterQuery) -> Result<Vec<AddressRecord>> {
        let (sql, params) = render_filter_sql(query);
        debug!("Filter query on {}: {} {:?}", query.table, sql, params);

        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for select_filtered")?;
        let bound: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = conn
            .query(sql.as_str(), &bound)
            .await
            .with_context(|| format!("Filtered select on {} failed", query.table))?;

        rows.iter()
            .map(|row| record_from_row(row, &query.columns))
            .collect()
    }

    async fn select_non_empty(&self, table: &TableRef, column: &str) -> Result<Vec<AddressRecord>> {
        let columns = self.list_columns(table).await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {c} IS NOT NULL AND TRIM({c}::text) <> ''",
            text_projection(&columns),
            table.quoted(),
            c = quote_ident(column)
        );

        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for select_non_empty")?;
        let rows = conn
            .query(sql.as_str(), &[])
            .await
            .with_context(|| format!("Select of non-empty {} rows from {} failed", column, table))?;

        rows.iter().map(|row| record_from_row(row, &columns)).collect()
    }

    async fn insert_record(&self, table: &TableRef, record: &AddressRecord) -> Result<u64> {
        if record.is_empty() {
            bail!("Refusing to insert an empty record into {}", table);
        }
        let column_list = record
            .columns()
            .map(quote_ident)
            .collect::<Vec<_>>()
            .join(", ");
        // json_populate_record coerces each JSON value to the declared column type.
        let sql = format!(
            "INSERT INTO {t} ({cols}) SELECT {cols} FROM json_populate_record(NULL::{t}, $1::json)",
            t = table.quoted(),
            cols = column_list
        );
        let payload = record.clone().into_value();

        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for insert_record")?;
        conn.execute(sql.as_str(), &[&payload])
            .await
            .with_context(|| format!("Failed to insert record into {}", table))
    }

    async fn sum_column(&self, table: &TableRef, column: &str) -> Result<f64> {
        let sql = format!(
            "SELECT COALESCE(SUM({}::float8), 0)::float8 FROM {}",
            quote_ident(column),
            table.quoted()
        );
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for sum_column")?;
        let row = conn
            .query_one(sql.as_str(), &[])
            .await
            .with_context(|| format!("Failed to sum {} on {}", column, table))?;
        Ok(row.get(0))
    }
}
