//! Validated query execution with a deadline and row shaping.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use citycontext_core::{validate, QueryError};

use super::SharedPool;

/// Shaped result of one SELECT: column names in projection order, rows as
/// positional value lists aligned to them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// Validate `sql`, run it with a deadline, and shape the rows.
///
/// Order matters: the gate runs before the pool is touched, so rejected
/// SQL never costs a connection. Errors are terminal for the call; there is
/// no retry. The connection returns to the pool on every exit path —
/// dropping the fetch future on timeout releases it.
pub async fn run_query(
    pool: &SharedPool,
    sql: &str,
    row_limit: i64,
    timeout_seconds: u64,
) -> Result<QueryResult, QueryError> {
    let statement = validate(sql, row_limit)?;

    let pool = pool
        .acquire()
        .await
        .map_err(|err| QueryError::Database(err.to_string()))?;

    let fetch = sqlx::query(statement.sql()).fetch_all(&pool);
    let rows = match tokio::time::timeout(Duration::from_secs(timeout_seconds), fetch).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(err)) => return Err(QueryError::Database(err.to_string())),
        Err(_) => {
            return Err(QueryError::Timeout {
                seconds: timeout_seconds,
            })
        }
    };

    Ok(shape_rows(&rows))
}

fn shape_rows(rows: &[PgRow]) -> QueryResult {
    let Some(first) = rows.first() else {
        return QueryResult::default();
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let shaped: Vec<Vec<Value>> = rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(idx, col)| cell_to_json(row, idx, col.type_info().name()))
                .collect()
        })
        .collect();

    let row_count = shaped.len();
    QueryResult {
        columns,
        rows: shaped,
        row_count,
    }
}

/// Decode one cell by its Postgres type name.
///
/// Unknown or undecodable types fall back to a textual decode, then to
/// null. Shaping never fails a query the database accepted.
fn cell_to_json(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<Option<i16>, _>(idx)
            .ok()
            .flatten()
            .map(|v| Value::from(i64::from(v)))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<Option<i32>, _>(idx)
            .ok()
            .flatten()
            .map(|v| Value::from(i64::from(v)))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)
            .ok()
            .flatten()
            .map(|v| v as f64)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "NUMERIC" => numeric_to_json(row, idx),
        "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|dt| Value::String(dt.to_rfc3339()))
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(Value::Null),
        _ => fallback_to_json(row, idx),
    }
}

/// NUMERIC keeps arbitrary precision; render as a number when it fits in
/// an f64 and as a string otherwise.
fn numeric_to_json(row: &PgRow, idx: usize) -> Value {
    let Some(decimal) = row
        .try_get::<Option<sqlx::types::BigDecimal>, _>(idx)
        .ok()
        .flatten()
    else {
        return Value::Null;
    };

    let text = decimal.to_string();
    match text.parse::<f64>().ok().and_then(|f| {
        if f.is_finite() {
            serde_json::Number::from_f64(f)
        } else {
            None
        }
    }) {
        Some(number) => Value::Number(number),
        None => Value::String(text),
    }
}

fn fallback_to_json(row: &PgRow, idx: usize) -> Value {
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(Some(v)) = row.try_get::<Option<bool>, _>(idx) {
        return Value::Bool(v);
    }
    Value::Null
}
