//! External collaborator traits (C11): the fitness evaluator and the
//! representation proposer. Neither has a concrete implementation in this
//! crate — both are supplied by the embedding application, exactly as the
//! domain-specific backtester and the LLM-based code generator are kept
//! out of scope.

use crate::error::EngineError;
use crate::individual::ParamMap;
use crate::metrics::ObjectiveVector;

/// Evaluates one candidate's opaque `representation` string, producing an
/// objective vector. Implementations must never panic for an ordinary
/// domain failure (a strategy that loses money, fails to backtest,
/// produces NaNs, ...): that is signalled by returning
/// `ObjectiveVector::failed()`, not an `Err`. `Err` is reserved for faults
/// in the evaluator itself (e.g. a data source becoming unavailable).
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, representation: &str) -> Result<ObjectiveVector, EngineError>;
}

/// Synthesizes new candidate representations: crossover, mutation, or
/// from-scratch proposals over a parameter tree. Implementations decide
/// how a `ParamMap` maps onto an opaque representation string (e.g.
/// rendering a code template).
pub trait Proposer: Send + Sync {
    fn propose(&self, parameters: &ParamMap, template_type: &str) -> Result<String, EngineError>;

    /// Synthesizes a brand-new, randomly seeded individual from scratch
    /// rather than varying an existing parent. Used by the scheduler's
    /// diversity monitor (§4.8 step 9) to inject fresh genetic material
    /// when population diversity collapses below `severe_diversity_threshold`.
    ///
    /// The default implementation reports seeding as unsupported; embedding
    /// applications that want the injection behaviour must override it.
    fn propose_seed(&self, template_type: &str) -> Result<(ParamMap, String), EngineError> {
        let _ = template_type;
        Err(EngineError::ProposerFailed("seeding is not supported by this proposer".into()))
    }
}

/// Checks that a proposed representation string is well-formed before it
/// is ever handed to an [`Evaluator`]. Kept separate from `Evaluator` so a
/// syntactic/static check never has to pay for a full evaluation.
pub trait Validator: Send + Sync {
    fn validate(&self, representation: &str) -> Result<(), EngineError>;
}

/// Retries `f` up to `max_retries` times, returning the first success or
/// the last failure once retries are exhausted.
pub fn with_retries<T>(
    max_retries: usize,
    mut f: impl FnMut() -> Result<T, EngineError>,
) -> Result<T, EngineError> {
    let mut last_err = None;
    for _ in 0..max_retries.max(1) {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or(EngineError::ProposerFailed("no attempts made".into())))
}
