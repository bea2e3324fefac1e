//! Individuals and the parameter tree they carry (C2).

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::metrics::ObjectiveVector;

/// A set of factor weights that must sum to one. Constructing or mutating
/// one always re-normalizes, so the invariant can never be observed broken
/// from outside this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights(BTreeMap<String, f64>);

impl FactorWeights {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        let mut w = Self(weights);
        w.renormalize();
        w
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        if let Some(slot) = self.0.get_mut(key) {
            *slot = value.max(0.0);
        }
        self.renormalize();
    }

    fn renormalize(&mut self) {
        let total: f64 = self.0.values().copied().sum();
        if total <= 0.0 {
            let n = self.0.len().max(1) as f64;
            for v in self.0.values_mut() {
                *v = 1.0 / n;
            }
            return;
        }
        for v in self.0.values_mut() {
            *v /= total;
        }
    }
}

/// A single leaf or branch of a strategy's parameter tree.
///
/// This replaces a dynamic dict-of-anything with a closed, typed variant
/// set: every place that walks or mutates a parameter tree matches
/// exhaustively instead of trusting an untyped value at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ParamValue>),
    Map(ParamMap),
    Weights(FactorWeights),
}

pub type ParamMap = BTreeMap<String, ParamValue>;

/// A single candidate policy in the population.
///
/// `Individual` deliberately exposes no save/load method: persistence is
/// the archive's job (see [`crate::archive`]), never the domain entity's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub generation: u64,
    pub parent_ids: Vec<String>,
    pub parameters: ParamMap,
    pub representation: String,
    pub metrics: Option<ObjectiveVector>,
    pub rank: u32,
    pub crowding: f64,
    pub novelty: f64,
    pub template_type: String,
    #[serde(with = "crate::archive::system_time_secs")]
    pub created_at: SystemTime,
    pub metadata: HashMap<String, String>,
}

impl Individual {
    pub fn new(
        id: String,
        generation: u64,
        parent_ids: Vec<String>,
        parameters: ParamMap,
        representation: String,
        template_type: String,
    ) -> Self {
        Self {
            id,
            generation,
            parent_ids,
            parameters,
            representation,
            metrics: None,
            rank: 0,
            crowding: 0.0,
            novelty: 0.0,
            template_type,
            created_at: SystemTime::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.metrics.map(|m| m.success).unwrap_or(false)
    }

    /// Pareto dominance over another individual's metrics. Individuals
    /// without metrics yet never dominate and are never dominated.
    pub fn dominates(&self, other: &Individual) -> bool {
        match (self.metrics, other.metrics) {
            (Some(a), Some(b)) => a.dominates(&b),
            _ => false,
        }
    }

    pub fn parameters_view(&self) -> &ParamMap {
        &self.parameters
    }

    pub fn metrics_view(&self) -> Option<&ObjectiveVector> {
        self.metrics.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_weights_renormalize_on_construction() {
        let mut raw = BTreeMap::new();
        raw.insert("a".to_string(), 2.0);
        raw.insert("b".to_string(), 2.0);
        let w = FactorWeights::new(raw);
        let sum: f64 = w.as_map().values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn factor_weights_renormalize_after_set() {
        let mut raw = BTreeMap::new();
        raw.insert("a".to_string(), 0.5);
        raw.insert("b".to_string(), 0.5);
        let mut w = FactorWeights::new(raw);
        w.set("a", 3.0);
        let sum: f64 = w.as_map().values().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn individual_without_metrics_never_dominates() {
        let a = Individual::new(
            "a".into(),
            0,
            vec![],
            ParamMap::new(),
            "{}".into(),
            "t".into(),
        );
        let b = Individual::new(
            "b".into(),
            0,
            vec![],
            ParamMap::new(),
            "{}".into(),
            "t".into(),
        );
        assert!(!a.dominates(&b));
        assert!(!b.dominates(&a));
    }
}
