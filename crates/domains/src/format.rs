//! Shared argument access, result rendering, and store error fallback.

use serde_json::Value;

use plotline_dispatch::HandlerError;
use plotline_store::{JsonRow, StoreError};

// ── Argument access ───────────────────────────────────────────────
//
// Shape validation already ran; these guard against internal descriptor
// drift, not client mistakes.

pub fn req_i64(args: &Value, field: &str) -> Result<i64, HandlerError> {
    args.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| HandlerError::Failure(format!("missing validated field '{field}'")))
}

pub fn req_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, HandlerError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::Failure(format!("missing validated field '{field}'")))
}

pub fn opt_i64(args: &Value, field: &str) -> Option<i64> {
    args.get(field).and_then(Value::as_i64)
}

pub fn opt_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

// ── Result rendering ──────────────────────────────────────────────

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render one row as `col: value | col: value`, in column order.
pub fn render_row(row: &JsonRow) -> String {
    row.iter()
        .map(|(key, value)| format!("{key}: {}", render_value(value)))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Render a result set one row per line, with an explicit empty marker.
pub fn render_rows(rows: &[JsonRow]) -> String {
    if rows.is_empty() {
        "(no records)".to_string()
    } else {
        rows.iter().map(render_row).collect::<Vec<_>>().join("\n")
    }
}

// ── Store error fallback ──────────────────────────────────────────

/// Map a store error that the handler did not translate into a domain
/// message. Constraint details are logged, never sent raw to the client.
pub fn store_failure(err: StoreError) -> HandlerError {
    match err {
        StoreError::Unavailable(detail) => {
            tracing::error!(%detail, "record store unavailable");
            HandlerError::Unavailable("Record store is unavailable".to_string())
        }
        StoreError::Timeout => {
            HandlerError::Unavailable("Record store statement timed out".to_string())
        }
        other => {
            tracing::error!(error = %other, "unexpected store error");
            HandlerError::Failure("Database operation failed".to_string())
        }
    }
}
