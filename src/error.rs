use thiserror::Error;

/// Errors raised by the pipeline stores and controller.
///
/// Validation and not-found errors are detected before any write happens;
/// everything else aborts the surrounding transaction, so a failed operation
/// never leaves a partial change behind.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Referenced stage or record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Stage deletion blocked by records still assigned to it
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn stage_not_found(id: i64) -> Self {
        PipelineError::NotFound { entity: "Stage", id }
    }

    pub fn record_not_found(id: i64) -> Self {
        PipelineError::NotFound { entity: "Record", id }
    }

    /// Stable label used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation",
            PipelineError::NotFound { .. } => "not_found",
            PipelineError::Conflict(_) => "conflict",
            PipelineError::Database(_) => "internal",
        }
    }

    /// True for errors caused by the caller rather than the system
    pub fn is_user_error(&self) -> bool {
        !matches!(self, PipelineError::Database(_))
    }
}
