//! Storage layer for the music catalogue
//!
//! Read-only SQLite access and statement execution.

mod connection;
pub mod executor;
#[cfg(test)]
pub(crate) mod test_support;

pub use connection::Store;
pub use executor::{execute, execute_sql};
