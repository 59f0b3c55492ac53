//! Engine error taxonomy.

use thiserror::Error;
use uuid::Uuid;

use crate::plan::PlanInputError;
use crate::template::toml_format::TemplateParseError;

/// Errors returned by engine operations.
///
/// Missing records and records owned by someone else are both reported as
/// [`EngineError::NotFound`] so callers cannot tell whether a record exists.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("user {actor} is not allowed to {action}")]
    Forbidden { actor: Uuid, action: &'static str },

    #[error("plan {0} is already published")]
    AlreadyPublished(Uuid),

    #[error("template {0} has no active schedule")]
    NoActiveSchedule(Uuid),

    /// A materialization loop stopped partway. Items before the failure are
    /// committed and re-running the operation is safe.
    #[error("interrupted after {completed} item(s): {error:#}")]
    Interrupted {
        completed: usize,
        error: anyhow::Error,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<TemplateParseError> for EngineError {
    fn from(err: TemplateParseError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PlanInputError> for EngineError {
    fn from(err: PlanInputError) -> Self {
        Self::Validation(err.to_string())
    }
}
