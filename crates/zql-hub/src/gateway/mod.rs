//! # Query Conversion Gateway
//!
//! Turns one `/convert` request into one response envelope:
//!
//! ```text
//! params ──▶ validator ──▶ QueryCompiler::compile ──▶ Dispatcher ──▶ Envelope
//! ```
//!
//! Every failure along the way short-circuits into an error envelope. The
//! gateway holds no per-request state, so a single [`Gateway`] is shared by
//! all connections.

pub mod dispatcher;
pub mod envelope;
pub mod handler;
pub mod validator;
pub mod zql;

pub use dispatcher::{Dispatcher, Emitter, TargetType};
pub use envelope::{Envelope, Payload, State};
pub use handler::{Gateway, Stage};
pub use validator::RequestParams;
pub use zql::ZqlCompiler;

use thiserror::Error;
use zql_core::Database;

/// Everything that can turn a conversion into an error envelope.
///
/// The `Display` text of each variant is the `msg` the client sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("target type parameter must not be empty")]
    MissingTargetType,

    #[error("query parameter must not be empty")]
    MissingQuery,

    /// Compiler rejected the query; carries its message verbatim.
    #[error("{0}")]
    Compilation(String),

    #[error("unrecognized target type; verify the value is correct")]
    UnrecognizedTarget(String),

    /// Backend emitter failed; carries its message verbatim.
    #[error("{0}")]
    Emission(String),
}

impl GatewayError {
    /// The pipeline stage that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::MissingTargetType | Self::MissingQuery => Stage::Validating,
            Self::Compilation(_) => Stage::Compiling,
            Self::UnrecognizedTarget(_) | Self::Emission(_) => Stage::Dispatching,
        }
    }
}

/// The query compiler the gateway delegates to.
///
/// `compile` runs once per request; the resulting value is handed to exactly
/// one `emit_*` call and then dropped.
pub trait QueryCompiler: Send + Sync + 'static {
    type Compiled;
    type Error: std::error::Error;

    fn compile(&self, prefix: &str, query: &str) -> Result<Self::Compiled, Self::Error>;

    /// A non-empty `collection` overrides the collection named by the query.
    fn emit_mongo(
        &self,
        compiled: &Self::Compiled,
        db: &Database,
        collection: &str,
    ) -> Result<String, Self::Error>;

    /// A non-empty `measurement` overrides the measurement named by the query.
    fn emit_influx(&self, compiled: &Self::Compiled, measurement: &str)
        -> Result<String, Self::Error>;

    fn emit_elastic(&self, compiled: &Self::Compiled) -> Result<String, Self::Error>;
}
