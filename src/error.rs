//! Crate-wide error type (C1-C11 error surface, §7).

use thiserror::Error;

/// Exit codes a host CLI (outside this crate's scope) can map
/// [`EngineError`] onto without re-deriving the mapping itself, matching
/// §6.6's fixed code assignment: `0` success, `1` validation criteria not
/// met, `2` core scheduler invariant error, `3` fatal I/O or configuration
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    ValidationNotMet = 1,
    SchedulerFault = 2,
    ConfigError = 3,
    Cancelled = 130,
}

/// Errors surfaced by the engine. Most evaluator/proposer failures never
/// reach this type at all: they are absorbed locally as a failed
/// [`crate::metrics::ObjectiveVector`] or a placeholder offspring. Only
/// faults that break a structural invariant of the run propagate here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("proposer failed after exhausting retries: {0}")]
    ProposerFailed(String),

    #[error("proposed representation failed validation: {0}")]
    ValidationFailed(String),

    #[error("parents are not compatible for crossover")]
    IncompatibleParents,

    #[error("population of size {size} is too small for the requested operation")]
    InsufficientPopulation { size: usize },

    #[error("unknown archive tier: {0}")]
    UnknownTier(String),

    #[error("variation operator not applicable: {0}")]
    OperatorUnavailable(String),

    #[error("archive record is corrupted: {0}")]
    CorruptedRecord(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("scheduler invariant violated: {0}")]
    SchedulerInvariant(String),

    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EngineError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            EngineError::Config(_) | EngineError::Io(_) => ExitCode::ConfigError,
            EngineError::Cancelled => ExitCode::Cancelled,
            EngineError::SchedulerInvariant(_) => ExitCode::SchedulerFault,
            EngineError::ValidationFailed(_) => ExitCode::ValidationNotMet,
            _ => ExitCode::SchedulerFault,
        }
    }
}
