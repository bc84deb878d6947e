use thiserror::Error;

// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Callers match on these,
// never on the human-readable message string.

/// Stable error code constants.
pub mod error_code {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const MALFORMED_SCHEMA: &str = "MALFORMED_SCHEMA";
    pub const BATCH_LOAD_FAILED: &str = "BATCH_LOAD_FAILED";
    pub const INTERNAL: &str = "INTERNAL";
}

// ── ServiceError ────────────────────────────────────────────────────

/// Unified error type for every accessor, cache and batcher operation.
///
/// `Clone` so a single bulk-load failure can be handed verbatim to every
/// request waiting on the same dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Record or noun does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A record with the same id already exists.
    #[error("{0}")]
    Conflict(String),

    /// Input rejected by a hook or by id checks.
    #[error("{0}")]
    Validation(String),

    /// A field definition could not be parsed.
    #[error("{0}")]
    MalformedSchema(String),

    /// A batch dispatch failed before producing a result.
    #[error("{0}")]
    BatchLoad(String),

    /// Unexpected internal state.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_code::NOT_FOUND,
            ServiceError::Conflict(_) => error_code::ALREADY_EXISTS,
            ServiceError::Validation(_) => error_code::VALIDATION_FAILED,
            ServiceError::MalformedSchema(_) => error_code::MALFORMED_SCHEMA,
            ServiceError::BatchLoad(_) => error_code::BATCH_LOAD_FAILED,
            ServiceError::Internal(_) => error_code::INTERNAL,
        }
    }

    /// JSON body in the `{"code": ..., "message": ...}` shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        })
    }
}
