//! Capability protocol (C10): the narrow, domain-only surface that
//! operators and adapters see. Deliberately excludes any persistence
//! method — save/load stays on the archive (C9), never on a domain
//! entity, so a proposer or evaluator implementation can never reach
//! through an individual into disk I/O.

use crate::individual::ParamMap;
use crate::metrics::ObjectiveVector;

pub trait DomainIndividual {
    fn id(&self) -> &str;
    fn generation(&self) -> u64;
    fn dominates(&self, other: &Self) -> bool;
    fn parameters(&self) -> &ParamMap;
    fn metrics(&self) -> Option<&ObjectiveVector>;
}

impl DomainIndividual for crate::individual::Individual {
    fn id(&self) -> &str {
        &self.id
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn dominates(&self, other: &Self) -> bool {
        crate::individual::Individual::dominates(self, other)
    }

    fn parameters(&self) -> &ParamMap {
        &self.parameters
    }

    fn metrics(&self) -> Option<&ObjectiveVector> {
        self.metrics.as_ref()
    }
}
