//! # zql-core — The ZQL Compiler
//!
//! Lowers a store-agnostic filter query into backend-native query text.
//!
//! ```text
//! SELECT name, age FROM users WHERE age >= 18 AND name STARTSWITH "jo" ORDER BY age DESC LIMIT 10
//! ```
//!
//! A query is compiled once with [`compile`] into a [`CompiledQuery`], which
//! can then be emitted for any of the supported backends:
//!
//! - [`mongo::emit`] — a `mongo` shell `find()` expression
//! - [`influx::emit`] — an InfluxQL `SELECT` statement
//! - [`elastic::emit`] — an Elasticsearch search body (JSON)

pub mod elastic;
pub mod influx;
pub mod mongo;
pub mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mongo::Database;

/// Errors raised while compiling or emitting a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZqlError {
    #[error("query is empty")]
    Empty,

    #[error("unterminated string literal starting at byte {0}")]
    UnterminatedString(usize),

    #[error("unexpected character '{ch}' at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("syntax error: {0}")]
    Syntax(String),

    /// The query compiled, but the target backend cannot express it.
    #[error("{backend}: {reason}")]
    Unsupported {
        backend: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ZqlError>;

/// A compiled query, ready to be emitted for any backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Table / collection / measurement name, prefix already applied.
    /// Empty when the query carried no FROM clause.
    pub table: String,
    /// Projected fields (empty = all).
    pub fields: Vec<String>,
    /// Filter in disjunctive normal form: OR of AND-groups.
    pub filter: Vec<Vec<Condition>>,
    pub order: Option<Order>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
}

impl CompareOp {
    /// Ordering comparisons, which need a number or string operand.
    pub fn is_range(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTSWITH",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

/// Compile `query`, prepending `prefix` to the table name.
pub fn compile(prefix: &str, query: &str) -> Result<CompiledQuery> {
    let mut compiled = parser::parse(query)?;
    if !compiled.table.is_empty() {
        compiled.table = format!("{}{}", prefix, compiled.table);
    } else if !prefix.is_empty() {
        compiled.table = prefix.to_string();
    }
    Ok(compiled)
}

/// String form of a scalar value, as used inside patterns and identifiers.
pub(crate) fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
