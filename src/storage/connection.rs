//! Read-only SQLite access
//!
//! Every call opens its own connection and drops it before returning, so no
//! connection state is shared between queries.

use std::time::Duration;

use rusqlite::{Connection, OpenFlags};

use crate::error::{BridgeError, Result};
use crate::types::StoreConfig;

/// Handle to the music catalogue database
#[derive(Debug, Clone)]
pub struct Store {
    config: StoreConfig,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Verify the database can be opened; used at worker startup
    pub fn check(&self) -> Result<()> {
        let path = self.config.resolved_path();
        if !path.exists() {
            return Err(BridgeError::Config(format!(
                "database not found: {}",
                path.display()
            )));
        }
        self.with_connection(|_| Ok(()))
    }

    /// Run `f` on a fresh read-only connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.open()?;
        let result = f(&conn);
        if let Err((_, e)) = conn.close() {
            tracing::debug!("Error closing connection: {}", e);
        }
        result
    }

    fn open(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;

        let conn = Connection::open_with_flags(self.config.resolved_path(), flags)?;
        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA query_only=ON;")?;
        Ok(conn)
    }
}
