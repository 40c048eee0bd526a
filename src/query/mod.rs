//! Natural-language query translation
//!
//! Provides:
//! - Rule-based compilation of free text into parameterized SQL
//! - Keyword and synonym tables
//! - Plain-text formatting of query results

pub mod compiler;
pub mod format;
pub mod vocabulary;

pub use compiler::{compile, CompiledQuery, QueryRule, QueryText, RuleKind, RULES};
pub use format::{format_outcome, MAX_LISTED_ROWS, NO_RESULTS};
