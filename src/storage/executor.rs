//! Statement execution with a uniform row/error outcome
//!
//! Store failures never propagate past this module: they are logged and
//! turned into `ExecutionOutcome::Error`.

use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use serde_json::{json, Value};

use super::connection::Store;
use crate::error::{BridgeError, Result};
use crate::query::CompiledQuery;
use crate::types::{ExecutionOutcome, Row};

/// Run a compiled query
pub fn execute(store: &Store, query: &CompiledQuery) -> ExecutionOutcome {
    execute_sql(store, query.sql, &query.params)
}

/// Run one read-only statement with positional parameters
pub fn execute_sql(store: &Store, sql: &str, params: &[String]) -> ExecutionOutcome {
    tracing::debug!(?params, "Executing SQL: {}", sql);

    match store.with_connection(|conn| run_statement(conn, sql, params)) {
        Ok(rows) => {
            tracing::debug!("Query returned {} rows", rows.len());
            ExecutionOutcome::Rows(rows)
        }
        Err(e) => {
            let message = store_message(e);
            tracing::warn!("Query failed: {}", message);
            ExecutionOutcome::error(message)
        }
    }
}

fn run_statement(conn: &Connection, sql: &str, params: &[String]) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(BridgeError::Execution(
            "only read-only statements can be executed".to_string(),
        ));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut out = Row::new();
        for (i, name) in columns.iter().enumerate() {
            out.push(name.clone(), to_json(row.get_ref(i)?));
        }
        results.push(out);
    }
    Ok(results)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

/// The store's own message, without our error prefix
fn store_message(err: BridgeError) -> String {
    match err {
        BridgeError::Database(e) => e.to_string(),
        BridgeError::Execution(message) => message,
        other => other.to_string(),
    }
}
