//! Core types for chinook-bridge

use std::path::PathBuf;
use std::time::Duration;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Configuration for the relational store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database (`~` is expanded)
    pub db_path: String,
    /// How long a statement waits on a locked database
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "chinook.db".to_string(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl StoreConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Database path with `~` expanded
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).to_string())
    }
}

/// Identity sent to the worker during the handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "chinook-bridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// How to launch and supervise the worker subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker executable
    pub program: PathBuf,
    /// Extra arguments passed to the worker
    #[serde(default)]
    pub args: Vec<String>,
    /// Read timeout for a single response (None = wait forever)
    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
    /// Grace period between closing stdin and killing the worker
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
    /// How many times a broken session may be restarted
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default)]
    pub client_info: ClientInfo,
}

fn default_shutdown_grace() -> u64 {
    2000
}

fn default_max_restarts() -> u32 {
    3
}

impl WorkerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            read_timeout_secs: None,
            shutdown_grace_ms: default_shutdown_grace(),
            max_restarts: default_max_restarts(),
            client_info: ClientInfo::default(),
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// One result row: column name to scalar, in statement column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Uniform result of running one statement against the store
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Rows(Vec<Row>),
    Error { error: String },
}

impl ExecutionOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        ExecutionOutcome::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionOutcome::Error { .. })
    }

    /// Number of rows; an error outcome counts as its single synthetic row
    pub fn len(&self) -> usize {
        match self {
            ExecutionOutcome::Rows(rows) => rows.len(),
            ExecutionOutcome::Error { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ExecutionOutcome::Rows(rows) if rows.is_empty())
    }
}

/// Serializes as a list of row objects; errors become `[{"error": message}]`
impl Serialize for ExecutionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExecutionOutcome::Rows(rows) => rows.serialize(serializer),
            ExecutionOutcome::Error { error } => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                let row: Row = [("error", Value::String(error.clone()))]
                    .into_iter()
                    .collect();
                seq.serialize_element(&row)?;
                seq.end()
            }
        }
    }
}
