//! PostgreSQL row to JSON conversion.
//!
//! Handlers format results per entity, so rows cross the adapter boundary
//! as plain JSON maps decoded by column type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use crate::error::StoreError;
use crate::store::JsonRow;

/// Decode one row into a column-name-keyed JSON map.
pub fn row_to_json(row: &PgRow) -> Result<JsonRow, StoreError> {
    let mut map = JsonRow::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, i, column.type_info().name())?;
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Result<Value, StoreError> {
    let value = match type_name {
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)?
            .map_or(Value::Null, Value::from),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map_or(Value::Null, Value::from),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map_or(Value::Null, Value::from),
        "INT8" => row
            .try_get::<Option<i64>, _>(index)?
            .map_or(Value::Null, Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map_or(Value::Null, Value::from),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(index)?
            .map_or(Value::Null, Value::from),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<Option<String>, _>(index)?
            .map_or(Value::Null, Value::from),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map_or(Value::Null, |t| json!(t.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map_or(Value::Null, |t| json!(t.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map_or(Value::Null, |d| json!(d.to_string())),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(index)?
            .unwrap_or(Value::Null),
        other => {
            // Unmapped column types are reported, not silently stringified.
            return Err(StoreError::Decode(format!(
                "unsupported column type '{other}' at index {index}"
            )));
        }
    };
    Ok(value)
}
