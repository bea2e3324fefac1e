//! Tiered structural ("exit") mutation (§4.7.6), grounded on the
//! three-tier mutation scheme (parametric / structural / relational)
//! applied to exit-condition parameters, with per-tier draw weights and
//! attempt/success bookkeeping.

use std::collections::BTreeMap;

use crate::config::ExitTierWeights;
use crate::error::EngineError;
use crate::individual::{ParamMap, ParamValue};
use crate::random::RandomGenerator;

/// Multiplicative bounds used for a mechanism with no entry of its own in
/// the configured `exit_parameter_ranges` map.
const FALLBACK_RANGE: (f64, f64) = (0.8, 1.2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitTier {
    /// Nudges a numeric exit parameter (e.g. a stop-loss percentage)
    /// within a bounded range.
    Parametric,
    /// Swaps which exit rule key is active, without touching its sibling
    /// parameters.
    Structural,
    /// Rewires how two or more exit rules combine (e.g. AND vs OR gating).
    Relational,
}

impl ExitTier {
    fn draw(weights: &ExitTierWeights, rng: &mut impl RandomGenerator) -> Self {
        let normalized = weights.normalized();
        let roll = rng.gen_probability();
        let mut acc = 0.0;
        for (name, w) in normalized {
            acc += w;
            if roll < acc {
                return match name {
                    "parametric" => ExitTier::Parametric,
                    "structural" => ExitTier::Structural,
                    _ => ExitTier::Relational,
                };
            }
        }
        ExitTier::Parametric
    }
}

/// Attempt/success counters for each tier, accumulated across a
/// generation for reporting.
#[derive(Debug, Clone, Default)]
pub struct ExitMutationStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub parametric: u64,
    pub structural: u64,
    pub relational: u64,
}

impl ExitMutationStats {
    pub fn record(&mut self, tier: ExitTier, succeeded: bool) {
        self.attempts += 1;
        if succeeded {
            self.successes += 1;
            match tier {
                ExitTier::Parametric => self.parametric += 1,
                ExitTier::Structural => self.structural += 1,
                ExitTier::Relational => self.relational += 1,
            }
        } else {
            self.failures += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

const EXIT_KEYS: [&str; 3] = ["stop_loss", "take_profit", "trailing_stop"];

/// Applies one structural exit mutation to `params`, drawing which tier to
/// apply according to `weights`. Returns the mutated map and which tier
/// fired, or an error if `params` carries none of the recognized exit
/// keys to mutate.
///
/// `exit_parameter_ranges` gives the tier-1 parametric multiplicative
/// bounds per mechanism (spec.md §4.7.6's "perturb a numeric threshold
/// inside an existing mechanism by a configured multiplicative range, e.g.
/// `[0.8, 1.2]`"): the existing value is scaled by a factor drawn from the
/// mechanism's range, falling back to `[0.8, 1.2]` for a mechanism absent
/// from the map. Non-numeric or missing thresholds are left untouched.
pub fn exit_mutate(
    params: &ParamMap,
    weights: &ExitTierWeights,
    exit_parameter_ranges: &BTreeMap<String, (f64, f64)>,
    rng: &mut impl RandomGenerator,
) -> Result<(ParamMap, ExitTier), EngineError> {
    let present: Vec<&str> = EXIT_KEYS.iter().copied().filter(|k| params.contains_key(*k)).collect();
    if present.is_empty() {
        return Err(EngineError::OperatorUnavailable("no exit parameters present".into()));
    }

    let tier = ExitTier::draw(weights, rng);
    let mut mutated = params.clone();

    match tier {
        ExitTier::Parametric => {
            let key = present[rng.gen_range_usize(0, present.len())];
            if let Some(ParamValue::Float(current)) = mutated.get(key).copied() {
                let (lo, hi) = exit_parameter_ranges.get(key).copied().unwrap_or(FALLBACK_RANGE);
                let factor = rng.gen_range_f64(lo, hi);
                mutated.insert(key.to_string(), ParamValue::Float(current * factor));
            }
        }
        ExitTier::Structural => {
            let inactive: Vec<&str> = EXIT_KEYS.iter().copied().filter(|k| !params.contains_key(*k)).collect();
            let active_key = present[rng.gen_range_usize(0, present.len())];
            if let Some(swap_in) = inactive.first() {
                let value = mutated.remove(active_key).unwrap_or(ParamValue::Float(0.0));
                mutated.insert(swap_in.to_string(), value);
            }
        }
        ExitTier::Relational => {
            let current = mutated
                .get("exit_logic")
                .and_then(|v| if let ParamValue::Str(s) = v { Some(s.clone()) } else { None })
                .unwrap_or_else(|| "and".to_string());
            let flipped = if current == "and" { "or" } else { "and" };
            mutated.insert("exit_logic".to_string(), ParamValue::Str(flipped.to_string()));
        }
    }

    Ok((mutated, tier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::MOORandomGenerator;
    use rstest::rstest;

    #[rstest(
        parametric, structural, relational, roll, expected,
        // A single-tier weight vector always draws that tier, whatever the roll.
        case(1.0, 0.0, 0.0, 0.01, ExitTier::Parametric),
        case(1.0, 0.0, 0.0, 0.99, ExitTier::Parametric),
        case(0.0, 1.0, 0.0, 0.5, ExitTier::Structural),
        case(0.0, 0.0, 1.0, 0.5, ExitTier::Relational),
        // Default weights (0.5 / 0.3 / 0.2): the roll lands in whichever
        // cumulative band it falls into.
        case(0.5, 0.3, 0.2, 0.10, ExitTier::Parametric),
        case(0.5, 0.3, 0.2, 0.60, ExitTier::Structural),
        case(0.5, 0.3, 0.2, 0.95, ExitTier::Relational)
    )]
    fn tier_draw_follows_the_cumulative_weight_bands(
        parametric: f64,
        structural: f64,
        relational: f64,
        roll: f64,
        expected: ExitTier,
    ) {
        struct FixedRoll(f64);
        impl RandomGenerator for FixedRoll {
            type R = <MOORandomGenerator as RandomGenerator>::R;
            fn gen_probability(&mut self) -> f64 {
                self.0
            }
            fn rng(&mut self) -> &mut Self::R {
                unimplemented!("tier draw only calls gen_probability")
            }
        }
        let weights = ExitTierWeights {
            parametric,
            structural,
            relational,
        };
        let mut rng = FixedRoll(roll);
        assert_eq!(ExitTier::draw(&weights, &mut rng), expected);
    }

    fn exit_params() -> ParamMap {
        let mut p = ParamMap::new();
        p.insert("stop_loss".into(), ParamValue::Float(0.05));
        p
    }

    fn ranges() -> BTreeMap<String, (f64, f64)> {
        BTreeMap::from([("stop_loss".to_string(), (0.8, 1.2))])
    }

    #[test]
    fn errors_when_no_exit_keys_present() {
        let mut rng = MOORandomGenerator::new_from_seed(Some(0));
        let result = exit_mutate(&ParamMap::new(), &ExitTierWeights::default(), &ranges(), &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn relational_tier_toggles_exit_logic() {
        let weights = ExitTierWeights {
            parametric: 0.0,
            structural: 0.0,
            relational: 1.0,
        };
        let mut rng = MOORandomGenerator::new_from_seed(Some(1));
        let (mutated, tier) = exit_mutate(&exit_params(), &weights, &ranges(), &mut rng).unwrap();
        assert_eq!(tier, ExitTier::Relational);
        assert_eq!(mutated.get("exit_logic"), Some(&ParamValue::Str("or".into())));
    }

    #[test]
    fn parametric_tier_scales_the_existing_value_within_range() {
        let weights = ExitTierWeights {
            parametric: 1.0,
            structural: 0.0,
            relational: 0.0,
        };
        let mut rng = MOORandomGenerator::new_from_seed(Some(2));
        let (mutated, tier) = exit_mutate(&exit_params(), &weights, &ranges(), &mut rng).unwrap();
        assert_eq!(tier, ExitTier::Parametric);
        if let Some(ParamValue::Float(v)) = mutated.get("stop_loss") {
            assert!(*v >= 0.05 * 0.8 && *v <= 0.05 * 1.2);
        } else {
            panic!("expected float");
        }
    }

    #[test]
    fn parametric_tier_falls_back_to_default_range_for_unlisted_mechanism() {
        let weights = ExitTierWeights {
            parametric: 1.0,
            structural: 0.0,
            relational: 0.0,
        };
        let mut rng = MOORandomGenerator::new_from_seed(Some(4));
        let (mutated, _) = exit_mutate(&exit_params(), &weights, &BTreeMap::new(), &mut rng).unwrap();
        if let Some(ParamValue::Float(v)) = mutated.get("stop_loss") {
            assert!(*v >= 0.05 * FALLBACK_RANGE.0 && *v <= 0.05 * FALLBACK_RANGE.1);
        } else {
            panic!("expected float");
        }
    }

    #[test]
    fn stats_track_attempts_and_tier_counts() {
        let mut stats = ExitMutationStats::default();
        stats.record(ExitTier::Parametric, true);
        stats.record(ExitTier::Structural, false);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.parametric, 1);
        assert!((stats.success_rate() - 0.5).abs() < 1e-12);
    }
}
