//! Scheduler configuration and validation (§6.1).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Default multiplicative bounds applied to an exit mechanism's numeric
/// threshold during tier-1 (parametric) structural mutation (§4.7.6) when
/// the mechanism has no entry of its own in `exit_parameter_ranges`.
const DEFAULT_EXIT_PARAMETER_RANGE: (f64, f64) = (0.8, 1.2);

/// The default `exit_parameter_ranges` map: every recognized exit
/// mechanism gets the spec's example multiplicative range `[0.8, 1.2]`
/// (spec.md §4.7.6) unless the caller overrides it.
fn default_exit_parameter_ranges() -> BTreeMap<String, (f64, f64)> {
    ["stop_loss", "take_profit", "trailing_stop"]
        .into_iter()
        .map(|k| (k.to_string(), DEFAULT_EXIT_PARAMETER_RANGE))
        .collect()
}

fn validate_probability(value: f64, name: &str) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::Config(format!(
            "{name} must be between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

fn validate_positive(value: usize, name: &str) -> Result<(), EngineError> {
    if value == 0 {
        return Err(EngineError::Config(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(())
}

fn validate_positive_f64(value: f64, name: &str) -> Result<(), EngineError> {
    if !(value > 0.0) {
        return Err(EngineError::Config(format!(
            "{name} must be greater than 0, got {value}"
        )));
    }
    Ok(())
}

/// Relative weights across the three tiers of structural ("exit")
/// mutation: parametric, structural, relational. Normalized at
/// construction time so downstream categorical draws never divide by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitTierWeights {
    pub parametric: f64,
    pub structural: f64,
    pub relational: f64,
}

impl Default for ExitTierWeights {
    fn default() -> Self {
        Self {
            parametric: 0.5,
            structural: 0.3,
            relational: 0.2,
        }
    }
}

impl ExitTierWeights {
    pub fn normalized(&self) -> [(&'static str, f64); 3] {
        let total = self.parametric + self.structural + self.relational;
        let total = if total <= 0.0 { 1.0 } else { total };
        [
            ("parametric", self.parametric / total),
            ("structural", self.structural / total),
            ("relational", self.relational / total),
        ]
    }
}

/// Validated knobs driving one scheduler run. Construct through
/// [`SchedulerConfigBuilder`], which mirrors the validated-builder pattern
/// used throughout this crate: every field is checked once, at build time,
/// never re-checked on every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub population_size: usize,
    pub num_generations: usize,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub selection_pressure: f64,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub mutation_strength: f64,
    pub diversity_weight: f64,
    pub novelty_k: usize,
    pub low_diversity_threshold: f64,
    pub severe_diversity_threshold: f64,
    pub exit_mutation_enabled: bool,
    pub exit_mutation_probability: f64,
    pub exit_tier_weights: ExitTierWeights,
    /// Per-mechanism multiplicative bounds for tier-1 parametric exit
    /// mutation (spec.md §6.1/§4.7.6), e.g. `stop_loss -> (0.8, 1.2)`.
    pub exit_parameter_ranges: BTreeMap<String, (f64, f64)>,
    pub max_retries: usize,
    pub checkpoint_every: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Default, Clone)]
pub struct SchedulerConfigBuilder {
    population_size: Option<usize>,
    num_generations: Option<usize>,
    elite_count: Option<usize>,
    tournament_size: Option<usize>,
    selection_pressure: Option<f64>,
    crossover_rate: Option<f64>,
    mutation_rate: Option<f64>,
    mutation_strength: Option<f64>,
    diversity_weight: Option<f64>,
    novelty_k: Option<usize>,
    low_diversity_threshold: Option<f64>,
    severe_diversity_threshold: Option<f64>,
    exit_mutation_enabled: Option<bool>,
    exit_mutation_probability: Option<f64>,
    exit_tier_weights: Option<ExitTierWeights>,
    exit_parameter_ranges: Option<BTreeMap<String, (f64, f64)>>,
    max_retries: Option<usize>,
    checkpoint_every: Option<usize>,
    seed: Option<u64>,
}

macro_rules! setter {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.$name = Some(value);
            self
        }
    };
}

impl SchedulerConfigBuilder {
    setter!(population_size, usize);
    setter!(num_generations, usize);
    setter!(elite_count, usize);
    setter!(tournament_size, usize);
    setter!(selection_pressure, f64);
    setter!(crossover_rate, f64);
    setter!(mutation_rate, f64);
    setter!(mutation_strength, f64);
    setter!(diversity_weight, f64);
    setter!(novelty_k, usize);
    setter!(low_diversity_threshold, f64);
    setter!(severe_diversity_threshold, f64);
    setter!(exit_mutation_enabled, bool);
    setter!(exit_mutation_probability, f64);
    setter!(exit_tier_weights, ExitTierWeights);
    setter!(exit_parameter_ranges, BTreeMap<String, (f64, f64)>);
    setter!(max_retries, usize);
    setter!(seed, u64);

    pub fn checkpoint_every(mut self, value: usize) -> Self {
        self.checkpoint_every = Some(value);
        self
    }

    pub fn build(self) -> Result<SchedulerConfig, EngineError> {
        let population_size = self.population_size.unwrap_or(50);
        let elite_count = self.elite_count.unwrap_or(5);
        let tournament_size = self.tournament_size.unwrap_or(3);
        let selection_pressure = self.selection_pressure.unwrap_or(0.8);
        let num_generations = self.num_generations.unwrap_or(100);
        let crossover_rate = self.crossover_rate.unwrap_or(0.8);
        let mutation_rate = self.mutation_rate.unwrap_or(0.2);
        let mutation_strength = self.mutation_strength.unwrap_or(0.1);
        let diversity_weight = self.diversity_weight.unwrap_or(0.2);
        let novelty_k = self.novelty_k.unwrap_or(5);
        let low_diversity_threshold = self.low_diversity_threshold.unwrap_or(0.3);
        let severe_diversity_threshold = self.severe_diversity_threshold.unwrap_or(0.2);
        let exit_mutation_probability = self.exit_mutation_probability.unwrap_or(0.1);
        let max_retries = self.max_retries.unwrap_or(3);

        validate_positive(population_size, "population_size")?;
        if population_size < 2 {
            return Err(EngineError::Config("population_size must be at least 2".into()));
        }
        validate_positive(num_generations, "num_generations")?;
        if tournament_size < 2 {
            return Err(EngineError::Config("tournament_size must be at least 2".into()));
        }
        validate_positive(novelty_k, "novelty_k")?;
        validate_positive(max_retries, "max_retries")?;
        validate_positive_f64(mutation_strength, "mutation_strength")?;
        validate_probability(selection_pressure, "selection_pressure")?;
        validate_probability(crossover_rate, "crossover_rate")?;
        validate_probability(mutation_rate, "mutation_rate")?;
        validate_probability(diversity_weight, "diversity_weight")?;
        validate_probability(exit_mutation_probability, "exit_mutation_probability")?;
        validate_probability(low_diversity_threshold, "low_diversity_threshold")?;
        validate_probability(severe_diversity_threshold, "severe_diversity_threshold")?;
        if severe_diversity_threshold > low_diversity_threshold {
            return Err(EngineError::Config(
                "severe_diversity_threshold must be <= low_diversity_threshold".into(),
            ));
        }
        if elite_count > population_size {
            return Err(EngineError::Config(
                "elite_count must not exceed population_size".into(),
            ));
        }

        Ok(SchedulerConfig {
            population_size,
            num_generations,
            elite_count,
            tournament_size,
            selection_pressure,
            crossover_rate,
            mutation_rate,
            mutation_strength,
            diversity_weight,
            novelty_k,
            low_diversity_threshold,
            severe_diversity_threshold,
            exit_mutation_enabled: self.exit_mutation_enabled.unwrap_or(true),
            exit_mutation_probability,
            exit_tier_weights: self.exit_tier_weights.unwrap_or_default(),
            exit_parameter_ranges: self.exit_parameter_ranges.unwrap_or_else(default_exit_parameter_ranges),
            max_retries,
            checkpoint_every: self.checkpoint_every,
            seed: self.seed.unwrap_or(42),
        })
    }
}

impl SchedulerConfig {
    pub fn builder() -> SchedulerConfigBuilder {
        SchedulerConfigBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_population() {
        let result = SchedulerConfig::builder().population_size(0).build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_elite_count_above_population() {
        let result = SchedulerConfig::builder()
            .population_size(10)
            .elite_count(11)
            .build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn accepts_elite_count_equal_to_population() {
        let result = SchedulerConfig::builder()
            .population_size(10)
            .elite_count(10)
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let result = SchedulerConfig::builder().crossover_rate(1.5).build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_zero_novelty_k() {
        let result = SchedulerConfig::builder().novelty_k(0).build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_zero_max_retries() {
        let result = SchedulerConfig::builder().max_retries(0).build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_non_positive_mutation_strength() {
        let result = SchedulerConfig::builder().mutation_strength(0.0).build();
        assert!(matches!(result, Err(EngineError::Config(_))));
        let negative = SchedulerConfig::builder().mutation_strength(-0.1).build();
        assert!(matches!(negative, Err(EngineError::Config(_))));
    }

    #[test]
    fn defaults_build_successfully() {
        let config = SchedulerConfig::builder().build().unwrap();
        assert_eq!(config.population_size, 50);
        assert_eq!(config.exit_tier_weights, ExitTierWeights::default());
        assert_eq!(config.exit_parameter_ranges.get("stop_loss"), Some(&(0.8, 1.2)));
    }
}
