//! A population-based multi-objective evolutionary engine (NSGA-II
//! family) for searching a configurable decision-policy space.
//!
//! The engine owns the generation loop, Pareto ranking, crowding and
//! novelty-based diversity, selection, variation operators, and the
//! archive. It never evaluates a policy itself and never synthesizes a
//! new representation itself — those are supplied by the embedding
//! application through the [`adapters`] traits.

pub mod adapters;
pub mod archive;
pub mod capability;
pub mod config;
pub mod crowding;
pub mod error;
pub mod individual;
pub mod metrics;
pub mod novelty;
pub mod pareto;
pub mod random;
pub mod scheduler;
pub mod selection;
pub mod variation;

pub use adapters::{Evaluator, Proposer, Validator};
pub use archive::{Archive, ArchiveTier, Checkpoint, GenerationRecord};
pub use capability::DomainIndividual;
pub use config::{ExitTierWeights, SchedulerConfig, SchedulerConfigBuilder};
pub use error::{EngineError, ExitCode};
pub use individual::{FactorWeights, Individual, ParamMap, ParamValue};
pub use metrics::ObjectiveVector;
pub use scheduler::{CancellationToken, Scheduler};
