//! Plain-text rendering of execution outcomes

use std::fmt::Write;

use serde_json::Value;

use crate::types::{ExecutionOutcome, Row};

/// At most this many rows are listed; the header still reports the total
pub const MAX_LISTED_ROWS: usize = 10;

pub const NO_RESULTS: &str = "No results found for your query.";

/// Render an outcome for the user who asked `original_query`
pub fn format_outcome(outcome: &ExecutionOutcome, original_query: &str) -> String {
    let rows = match outcome {
        ExecutionOutcome::Error { error } => return format!("Error: {}", error),
        ExecutionOutcome::Rows(rows) if rows.is_empty() => return NO_RESULTS.to_string(),
        ExecutionOutcome::Rows(rows) => rows,
    };

    let mut out = format!("Found {} results for '{}':\n\n", rows.len(), original_query);
    for (i, row) in rows.iter().take(MAX_LISTED_ROWS).enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, format_row(row));
    }
    out
}

/// `col: val | col: val`, skipping nulls
fn format_row(row: &Row) -> String {
    row.columns()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| format!("{}: {}", name, render_value(value)))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
