//! The generation loop (C8), grounded on the same construct-then-loop
//! shape as the engine's own run driver: a validated config builds a
//! runtime context, a private single-step method advances one generation,
//! and a public driver loops it until the configured number of
//! generations or an early, non-fatal stop condition.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::adapters::{Evaluator, Proposer, Validator, with_retries};
use crate::archive::{Archive, ArchiveTier, Checkpoint, GenerationRecord};
use crate::config::SchedulerConfig;
use crate::crowding::crowding_distance;
use crate::error::EngineError;
use crate::individual::Individual;
use crate::novelty::{novelty_score, population_diversity, should_raise_mutation};
use crate::pareto::{build_fronts, fast_non_dominated_sort};
use crate::random::{MOORandomGenerator, RandomGenerator};
use crate::selection::{select_elites, select_parents};
use crate::variation::{crossover, exit_mutate, gaussian_mutate, is_crossover_compatible, ExitMutationStats};

/// A cooperative cancellation flag, checked at phase boundaries. Cloning
/// shares the same underlying flag, so a caller can hold one half and
/// trigger cancellation from another thread while the scheduler polls it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runtime state advanced by every call to [`Scheduler::next`], analogous
/// to the context object threaded through a generation loop elsewhere in
/// this codebase: population size, iteration counters, and the current
/// (possibly escalated) mutation rate.
pub struct SchedulerContext {
    pub population_size: usize,
    pub current_generation: u64,
    pub current_mutation_rate: f64,
}

pub struct Scheduler {
    config: SchedulerConfig,
    evaluator: Box<dyn Evaluator>,
    proposer: Box<dyn Proposer>,
    validator: Option<Box<dyn Validator>>,
    archive: Option<Archive>,
    cancellation: CancellationToken,
    rng: MOORandomGenerator,
    population: Vec<Individual>,
    history: Vec<GenerationRecord>,
    context: SchedulerContext,
    /// Generation number -> count of seeded individuals to inject, queued
    /// by the diversity monitor (§4.8 step 9) two generations in advance.
    pending_seed_injections: std::collections::BTreeMap<u64, usize>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        initial_population: Vec<Individual>,
        evaluator: Box<dyn Evaluator>,
        proposer: Box<dyn Proposer>,
        validator: Option<Box<dyn Validator>>,
        archive: Option<Archive>,
    ) -> Result<Self, EngineError> {
        if initial_population.len() != config.population_size {
            return Err(EngineError::SchedulerInvariant(format!(
                "initial population has {} members, expected {}",
                initial_population.len(),
                config.population_size
            )));
        }
        let rng = MOORandomGenerator::new_from_seed(Some(config.seed));
        let context = SchedulerContext {
            population_size: config.population_size,
            current_generation: 0,
            current_mutation_rate: config.mutation_rate,
        };
        Ok(Self {
            config,
            evaluator,
            proposer,
            validator,
            archive,
            cancellation: CancellationToken::new(),
            rng,
            population: initial_population,
            history: Vec::new(),
            context,
            pending_seed_injections: std::collections::BTreeMap::new(),
        })
    }

    /// Restores a scheduler from a previously saved [`Checkpoint`] (§4.9):
    /// population, history, and configuration are taken from the
    /// checkpoint verbatim, and the scheduler resumes at the checkpoint's
    /// generation. The collaborators (evaluator/proposer/validator/archive)
    /// are not part of the checkpoint and must be supplied fresh, since
    /// they are out-of-scope domain logic rather than engine state.
    pub fn from_checkpoint(
        checkpoint: Checkpoint,
        evaluator: Box<dyn Evaluator>,
        proposer: Box<dyn Proposer>,
        validator: Option<Box<dyn Validator>>,
        archive: Option<Archive>,
    ) -> Result<Self, EngineError> {
        let config = checkpoint.config;
        if checkpoint.population.len() != config.population_size {
            return Err(EngineError::SchedulerInvariant(format!(
                "checkpoint population has {} members, expected {}",
                checkpoint.population.len(),
                config.population_size
            )));
        }
        let rng = MOORandomGenerator::new_from_seed(Some(config.seed));
        let context = SchedulerContext {
            population_size: config.population_size,
            current_generation: checkpoint.generation,
            current_mutation_rate: config.mutation_rate,
        };
        Ok(Self {
            config,
            evaluator,
            proposer,
            validator,
            archive,
            cancellation: CancellationToken::new(),
            rng,
            population: checkpoint.population,
            history: checkpoint.history,
            context,
            pending_seed_injections: std::collections::BTreeMap::new(),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    /// Runs up to `config.num_generations` generations, stopping early
    /// (without error) on cancellation or when a generation produces no
    /// viable offspring at all.
    pub fn run(&mut self) -> Result<(), EngineError> {
        for _ in 0..self.config.num_generations {
            if self.cancellation.is_cancelled() {
                log::info!("scheduler cancelled at generation {}", self.context.current_generation);
                return Ok(());
            }
            match self.next() {
                Ok(()) => {}
                Err(EngineError::SchedulerInvariant(msg)) => {
                    log::warn!("stopping early: {msg}");
                    return Ok(());
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// Advances the population by exactly one generation. Exposed so a
    /// caller that wants fine-grained control (e.g. driving the loop from
    /// an external scheduler, or checkpointing between every step) is not
    /// forced to go through [`Scheduler::run`].
    pub fn step(&mut self) -> Result<(), EngineError> {
        self.next()
    }

    /// Advances the population by exactly one generation: evaluate, rank,
    /// crowd, score novelty, select elites and parents, vary, replace,
    /// monitor diversity, and record history.
    fn next(&mut self) -> Result<(), EngineError> {
        let generation = self.context.current_generation;

        let t0 = Instant::now();
        self.evaluate_unevaluated();
        let evaluation_secs = t0.elapsed().as_secs_f64();

        let t0 = Instant::now();
        self.assign_ranks();
        self.assign_crowding()?;
        self.assign_novelty();
        let elites = select_elites(&self.population, self.config.elite_count)?;
        let selection_secs = t0.elapsed().as_secs_f64();

        let t0 = Instant::now();
        let seed_count = self.pending_seed_injections.remove(&(generation + 1)).unwrap_or(0);
        let num_offsprings = self.config.population_size.saturating_sub(elites.len());
        let bred_count = num_offsprings.saturating_sub(seed_count);
        let (mut offspring, failed_variation_count, _exit_stats) =
            self.generate_offspring(generation + 1, bred_count)?;
        if seed_count > 0 {
            offspring.extend(self.inject_seeds(generation + 1, seed_count));
        }
        let offspring_generation_secs = t0.elapsed().as_secs_f64();

        if offspring.is_empty() && elites.is_empty() {
            return Err(EngineError::SchedulerInvariant(
                "no offspring were generated and no elites survived".into(),
            ));
        }

        let t0 = Instant::now();
        let mut candidates = elites;
        candidates.extend(offspring.clone());
        let champion_before = champion_id(&self.population);
        self.population = self.replace(candidates);
        let champion_after = champion_id(&self.population);
        let champion_updated = champion_before != champion_after;
        let replacement_secs = t0.elapsed().as_secs_f64();

        let t0 = Instant::now();
        let diversity_score = population_diversity(&self.population).unwrap_or(0.0);
        if should_raise_mutation(diversity_score, self.config.low_diversity_threshold) {
            self.context.current_mutation_rate = (self.config.mutation_rate * 1.5).min(1.0);
            log::info!(
                "generation {}: diversity {:.3} below threshold, mutation rate raised to {:.3}",
                generation,
                diversity_score,
                self.context.current_mutation_rate
            );
        } else {
            self.context.current_mutation_rate = self.config.mutation_rate;
        }
        if diversity_score < self.config.severe_diversity_threshold {
            let target_generation = generation + 2;
            *self.pending_seed_injections.entry(target_generation).or_insert(0) += 2;
            log::warn!(
                "generation {}: diversity {:.3} below severe threshold, queuing 2 seeded individuals for generation {}",
                generation,
                diversity_score,
                target_generation
            );
        }
        let diversity_monitoring_secs = t0.elapsed().as_secs_f64();

        let pareto_front_size = build_fronts(&self.population).into_iter().next().map(|f| f.len()).unwrap_or(0);
        let record = GenerationRecord {
            generation,
            diversity_score,
            pareto_front_size,
            champion_updated,
            offspring_count: offspring.len(),
            failed_variation_count,
            evaluation_secs,
            selection_secs,
            offspring_generation_secs,
            replacement_secs,
            diversity_monitoring_secs,
        };
        log::info!(
            "generation {} complete: front_size={} diversity={:.3} champion_updated={}",
            generation,
            record.pareto_front_size,
            record.diversity_score,
            record.champion_updated
        );
        self.history.push(record.clone());

        if let Some(archive) = &self.archive {
            if let Some(best) = self
                .population
                .iter()
                .max_by(|a, b| champion_key(a).partial_cmp(&champion_key(b)).unwrap())
            {
                if let Err(err) = archive.store(ArchiveTier::Champions, best) {
                    log::warn!("failed to store champion: {err}");
                }
            }
            let should_checkpoint = self
                .config
                .checkpoint_every
                .map(|every| every > 0 && (generation + 1) as usize % every == 0)
                .unwrap_or(false);
            if should_checkpoint {
                let checkpoint = Checkpoint::new(
                    generation + 1,
                    self.population.clone(),
                    self.history.clone(),
                    self.config.clone(),
                );
                if let Err(err) = archive.save_checkpoint(&checkpoint) {
                    log::warn!("failed to save checkpoint at generation {}: {err}", generation + 1);
                }
            }
        }

        self.context.current_generation += 1;
        Ok(())
    }

    fn evaluate_unevaluated(&mut self) {
        let evaluator = &self.evaluator;
        let results: Vec<_> = self
            .population
            .par_iter()
            .map(|ind| {
                if ind.metrics.is_some() {
                    return None;
                }
                match evaluator.evaluate(&ind.representation) {
                    Ok(metrics) => Some(metrics),
                    Err(err) => {
                        log::warn!("evaluation failed for {}: {err}", ind.id);
                        Some(crate::metrics::ObjectiveVector::failed())
                    }
                }
            })
            .collect();
        for (ind, result) in self.population.iter_mut().zip(results) {
            if let Some(metrics) = result {
                ind.metrics = Some(metrics);
            }
        }
    }

    fn assign_ranks(&mut self) {
        let ranks = fast_non_dominated_sort(&self.population);
        for ind in &mut self.population {
            if let Some(&r) = ranks.get(&ind.id) {
                ind.rank = r;
            }
        }
    }

    fn assign_crowding(&mut self) -> Result<(), EngineError> {
        let fronts = build_fronts(&self.population);
        let mut by_id = std::collections::HashMap::new();
        for front_ids in &fronts {
            let front: Vec<&Individual> = front_ids
                .iter()
                .filter_map(|id| self.population.iter().find(|ind| &ind.id == id))
                .collect();
            if front.len() < 2 {
                for ind in &front {
                    by_id.insert(ind.id.clone(), f64::INFINITY);
                }
                continue;
            }
            let distances = crowding_distance(&front)?;
            by_id.extend(distances);
        }
        for ind in &mut self.population {
            if let Some(&d) = by_id.get(&ind.id) {
                ind.crowding = d;
            }
        }
        Ok(())
    }

    fn assign_novelty(&mut self) {
        let snapshot = self.population.clone();
        for ind in &mut self.population {
            ind.novelty = novelty_score(ind, &snapshot, self.config.novelty_k);
        }
    }

    /// Produces up to `target_count` offspring for generation `generation`,
    /// following the crossover -> exit-mutation -> parameter-mutation ->
    /// placeholder cascade: each slot tries crossover first, optionally
    /// escalates to a structural exit mutation, falls back to parameter
    /// mutation, and only becomes an unevaluated placeholder if every
    /// variation attempt and retry is exhausted.
    fn generate_offspring(
        &mut self,
        generation: u64,
        target_count: usize,
    ) -> Result<(Vec<Individual>, usize, ExitMutationStats), EngineError> {
        let mut offspring = Vec::with_capacity(target_count);
        let mut failed = 0usize;
        let mut stats = ExitMutationStats::default();

        let pairs = select_parents(
            &self.population,
            target_count,
            self.config.tournament_size,
            self.config.selection_pressure,
            &mut self.rng,
        )?;
        let pairs: Vec<(Individual, Individual)> =
            pairs.into_iter().map(|(a, b)| (a.clone(), b.clone())).collect();

        for (slot, (parent_a, parent_b)) in pairs.into_iter().enumerate() {
            let params = self.vary_pair(&parent_a, &parent_b, &mut stats);

            let id = format!("gen{generation}_offspring_{slot}");
            let proposer = &self.proposer;
            let validator = &self.validator;
            let max_retries = self.config.max_retries;
            let representation = with_retries(max_retries, || {
                let repr = proposer.propose(&params, &parent_a.template_type)?;
                if let Some(validator) = validator {
                    validator.validate(&repr)?;
                }
                Ok(repr)
            });

            // §4.7.7 step 4: on exhausted retries emit a placeholder with
            // p1's own parameters and an empty representation rather than
            // propagating the varied-but-unrendered params.
            let (params, representation) = match representation {
                Ok(repr) => (params, repr),
                Err(err) => {
                    log::warn!("proposer exhausted retries for slot {slot}: {err}");
                    failed += 1;
                    (parent_a.parameters.clone(), String::new())
                }
            };

            let mut child = Individual::new(
                id,
                generation,
                vec![parent_a.id.clone(), parent_b.id.clone()],
                params,
                representation,
                parent_a.template_type.clone(),
            );
            match self.evaluator.evaluate(&child.representation) {
                Ok(metrics) => child.metrics = Some(metrics),
                Err(_) => child.metrics = Some(crate::metrics::ObjectiveVector::failed()),
            }
            offspring.push(child);
        }

        Ok((offspring, failed, stats))
    }

    /// Requests `count` brand-new, randomly seeded individuals from the
    /// proposer (§4.8 step 9). A proposer that doesn't support seeding
    /// yields a log warning and fewer individuals than requested, rather
    /// than aborting the generation.
    fn inject_seeds(&mut self, generation: u64, count: usize) -> Vec<Individual> {
        let template_type = self
            .population
            .first()
            .map(|ind| ind.template_type.clone())
            .unwrap_or_default();
        let mut seeded = Vec::with_capacity(count);
        for i in 0..count {
            match self.proposer.propose_seed(&template_type) {
                Ok((parameters, representation)) => {
                    let id = format!("gen{generation}_seed_{i}");
                    let mut ind = Individual::new(id, generation, Vec::new(), parameters, representation, template_type.clone());
                    match self.evaluator.evaluate(&ind.representation) {
                        Ok(metrics) => ind.metrics = Some(metrics),
                        Err(_) => ind.metrics = Some(crate::metrics::ObjectiveVector::failed()),
                    }
                    seeded.push(ind);
                }
                Err(err) => {
                    log::warn!("seed injection at generation {generation} failed: {err}");
                }
            }
        }
        seeded
    }

    /// Composes the per-slot variation cascade (§4.7.7): crossover is
    /// attempted only when both the probability draw and the §4.7.2
    /// compatibility check pass; an incompatible or skipped crossover
    /// falls back to `parent_a`'s own parameters rather than aborting the
    /// slot, so the exit-mutation and parameter-mutation stages that
    /// follow still run. `vary_pair` itself never fails: it always
    /// produces a parameter map for the proposer to render; only the
    /// proposer/validator round trip afterwards can fail a slot.
    fn vary_pair(
        &mut self,
        parent_a: &Individual,
        parent_b: &Individual,
        stats: &mut ExitMutationStats,
    ) -> crate::individual::ParamMap {
        let mut params = if self.rng.gen_bool(self.config.crossover_rate)
            && is_crossover_compatible(&parent_a.parameters, &parent_b.parameters)
        {
            crossover(
                &parent_a.template_type,
                &parent_b.template_type,
                &parent_a.parameters,
                &parent_b.parameters,
                &mut self.rng,
            )
            .unwrap_or_else(|_| parent_a.parameters.clone())
        } else {
            parent_a.parameters.clone()
        };

        if self.config.exit_mutation_enabled && self.rng.gen_bool(self.config.exit_mutation_probability) {
            match exit_mutate(
                &params,
                &self.config.exit_tier_weights,
                &self.config.exit_parameter_ranges,
                &mut self.rng,
            ) {
                Ok((mutated, tier)) => {
                    stats.record(tier, true);
                    params = mutated;
                }
                Err(_) => {
                    stats.record(crate::variation::ExitTier::Parametric, false);
                }
            }
        }

        gaussian_mutate(
            &params,
            self.context.current_mutation_rate,
            self.config.mutation_strength,
            None,
            &mut self.rng,
        )
    }

    /// NSGA-II elitist replacement: front-by-front fill up to
    /// `population_size`, splitting the last admitted front by crowding
    /// distance (descending) to fill the remaining budget exactly. Per
    /// §4.8 step 8, `build_fronts` only ranks successfully-evaluated
    /// candidates, so a generation with placeholder offspring or failed
    /// seed injections can leave the union short of `target`; the
    /// remainder is topped up from the previous population by the same
    /// `(rank asc, crowding desc)` key, excluding ids already admitted.
    fn replace(&self, candidates: Vec<Individual>) -> Vec<Individual> {
        let target = self.config.population_size;
        let fronts = build_fronts(&candidates);
        let mut by_id: std::collections::HashMap<String, Individual> =
            candidates.into_iter().map(|ind| (ind.id.clone(), ind)).collect();

        let mut result = Vec::with_capacity(target);
        for front_ids in fronts {
            if result.len() + front_ids.len() <= target {
                for id in front_ids {
                    if let Some(ind) = by_id.remove(&id) {
                        result.push(ind);
                    }
                }
                continue;
            }
            let remaining = target - result.len();
            let mut front: Vec<Individual> = front_ids.into_iter().filter_map(|id| by_id.remove(&id)).collect();
            let refs: Vec<&Individual> = front.iter().collect();
            if let Ok(distances) = crowding_distance(&refs) {
                for ind in &mut front {
                    if let Some(&d) = distances.get(&ind.id) {
                        ind.crowding = d;
                    }
                }
            }
            front.sort_by(|a, b| b.crowding.partial_cmp(&a.crowding).unwrap());
            result.extend(front.into_iter().take(remaining));
            break;
        }

        if result.len() < target {
            let present: std::collections::HashSet<&str> = result.iter().map(|ind| ind.id.as_str()).collect();
            let mut backfill: Vec<&Individual> = self
                .population
                .iter()
                .filter(|ind| !present.contains(ind.id.as_str()))
                .collect();
            backfill.sort_by(|a, b| {
                a.rank
                    .cmp(&b.rank)
                    .then_with(|| b.crowding.partial_cmp(&a.crowding).unwrap_or(std::cmp::Ordering::Equal))
            });
            let needed = target - result.len();
            log::warn!(
                "replacement fell {needed} short of population_size {target}; topping up from the previous population"
            );
            result.extend(backfill.into_iter().take(needed).cloned());
        }

        result
    }
}

/// The identity of the top individual by `(sharpe, calmar)` descending
/// (§4.8 step 10's "champion"), with missing metrics sorting last so an
/// unevaluated individual is never reported as the champion.
fn champion_id(population: &[Individual]) -> Option<String> {
    population
        .iter()
        .max_by(|a, b| champion_key(a).partial_cmp(&champion_key(b)).unwrap())
        .map(|ind| ind.id.clone())
}

fn champion_key(ind: &Individual) -> (f64, f64) {
    match ind.metrics {
        Some(m) if m.success => (m.sharpe, m.calmar),
        _ => (f64::NEG_INFINITY, f64::NEG_INFINITY),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::ParamMap;
    use crate::metrics::ObjectiveVector;

    struct ConstantEvaluator;
    impl Evaluator for ConstantEvaluator {
        fn evaluate(&self, representation: &str) -> Result<ObjectiveVector, EngineError> {
            let len = representation.len() as f64;
            Ok(ObjectiveVector::new(len, len, -0.05, 0.1, 0.5, 0.2))
        }
    }

    struct EchoProposer;
    impl Proposer for EchoProposer {
        fn propose(&self, parameters: &ParamMap, template_type: &str) -> Result<String, EngineError> {
            Ok(format!("{template_type}:{}", parameters.len()))
        }
    }

    struct SeedingProposer;
    impl Proposer for SeedingProposer {
        fn propose(&self, parameters: &ParamMap, template_type: &str) -> Result<String, EngineError> {
            Ok(format!("{template_type}:{}", parameters.len()))
        }

        fn propose_seed(&self, template_type: &str) -> Result<(ParamMap, String), EngineError> {
            Ok((ParamMap::new(), format!("seeded:{template_type}")))
        }
    }

    fn seed_population(n: usize) -> Vec<Individual> {
        (0..n)
            .map(|i| {
                let mut params = ParamMap::new();
                params.insert("stop_loss".into(), crate::individual::ParamValue::Float(0.05));
                let mut ind = Individual::new(
                    format!("seed_{i}"),
                    0,
                    vec![],
                    params,
                    format!("rep_{i}"),
                    "trend".into(),
                );
                ind.metrics = Some(ObjectiveVector::new(i as f64, i as f64, -0.05, 0.1, 0.5, 0.2));
                ind
            })
            .collect()
    }

    #[test]
    fn scheduler_runs_generations_and_keeps_population_size() {
        let config = SchedulerConfig::builder()
            .population_size(6)
            .elite_count(1)
            .num_generations(3)
            .tournament_size(2)
            .seed(1)
            .build()
            .unwrap();
        let mut scheduler = Scheduler::new(
            config,
            seed_population(6),
            Box::new(ConstantEvaluator),
            Box::new(EchoProposer),
            None,
            None,
        )
        .unwrap();
        scheduler.run().unwrap();
        assert_eq!(scheduler.population().len(), 6);
        assert_eq!(scheduler.history().len(), 3);
    }

    #[test]
    fn scheduler_rejects_mismatched_initial_population() {
        let config = SchedulerConfig::builder().population_size(5).build().unwrap();
        let result = Scheduler::new(
            config,
            seed_population(3),
            Box::new(ConstantEvaluator),
            Box::new(EchoProposer),
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn cancellation_stops_the_run_early() {
        let config = SchedulerConfig::builder()
            .population_size(4)
            .elite_count(1)
            .num_generations(10)
            .tournament_size(2)
            .seed(2)
            .build()
            .unwrap();
        let mut scheduler = Scheduler::new(
            config,
            seed_population(4),
            Box::new(ConstantEvaluator),
            Box::new(EchoProposer),
            None,
            None,
        )
        .unwrap();
        scheduler.cancellation_token().cancel();
        scheduler.run().unwrap();
        assert_eq!(scheduler.history().len(), 0);
    }

    #[test]
    fn zero_diversity_population_escalates_mutation_and_queues_seed_injections() {
        // The shared seed_population helper's representations carry no
        // data.get/data.indicator tokens, so their feature sets are all
        // empty and population_diversity comes out to 0.0 -- below both
        // the default low (0.30) and severe (0.20) thresholds.
        let config = SchedulerConfig::builder()
            .population_size(6)
            .elite_count(1)
            .num_generations(1)
            .tournament_size(2)
            .mutation_rate(0.10)
            .seed(5)
            .build()
            .unwrap();
        let mut scheduler = Scheduler::new(
            config,
            seed_population(6),
            Box::new(ConstantEvaluator),
            Box::new(EchoProposer),
            None,
            None,
        )
        .unwrap();

        scheduler.step().unwrap();
        let record = scheduler.history().last().unwrap();
        assert_eq!(record.diversity_score, 0.0);
        assert!((scheduler.context.current_mutation_rate - 0.15).abs() < 1e-12);
        assert_eq!(scheduler.pending_seed_injections.get(&2), Some(&2));
    }

    #[test]
    fn queued_seed_injections_produce_seeded_individuals_two_generations_later() {
        let config = SchedulerConfig::builder()
            .population_size(6)
            .elite_count(1)
            .num_generations(1)
            .tournament_size(2)
            .seed(3)
            .build()
            .unwrap();
        let mut scheduler = Scheduler::new(
            config,
            seed_population(6),
            Box::new(ConstantEvaluator),
            Box::new(SeedingProposer),
            None,
            None,
        )
        .unwrap();

        // Pretend the diversity monitor fired at generation 0, queuing two
        // seeded individuals for generation 2.
        scheduler.pending_seed_injections.insert(2, 2);
        let seeded = scheduler.inject_seeds(2, 2);
        assert_eq!(seeded.len(), 2);
        assert!(seeded.iter().all(|ind| ind.representation.starts_with("seeded:")));
        assert!(seeded.iter().all(|ind| ind.parent_ids.is_empty()));
    }

    #[test]
    fn replace_tops_up_from_previous_population_when_all_candidates_fail() {
        let config = SchedulerConfig::builder()
            .population_size(6)
            .elite_count(1)
            .num_generations(1)
            .tournament_size(2)
            .seed(9)
            .build()
            .unwrap();
        let previous = seed_population(6);
        let scheduler = Scheduler::new(
            config,
            previous.clone(),
            Box::new(ConstantEvaluator),
            Box::new(EchoProposer),
            None,
            None,
        )
        .unwrap();

        // Every candidate failed evaluation, so `build_fronts` excludes all
        // of them and the front-fill loop alone would leave `result` empty
        // -- population size must still come out to `target` via top-up.
        let failed_candidates: Vec<Individual> = (0..6)
            .map(|i| {
                let mut ind = Individual::new(
                    format!("failed_{i}"),
                    1,
                    vec![],
                    ParamMap::new(),
                    String::new(),
                    "trend".into(),
                );
                ind.metrics = Some(ObjectiveVector::failed());
                ind
            })
            .collect();

        let replaced = scheduler.replace(failed_candidates);
        assert_eq!(replaced.len(), 6);
        assert!(replaced.iter().all(|ind| previous.iter().any(|p| p.id == ind.id)));
    }

    #[test]
    fn champion_updated_detects_identity_change_even_when_sharpe_ties() {
        let mut incumbent = Individual::new("incumbent".into(), 0, vec![], ParamMap::new(), "{}".into(), "t".into());
        incumbent.metrics = Some(ObjectiveVector::new(2.0, 3.0, -0.05, 0.2, 0.5, 0.2));
        let mut contender = Individual::new("contender".into(), 0, vec![], ParamMap::new(), "{}".into(), "t".into());
        contender.metrics = Some(ObjectiveVector::new(2.0, 4.0, -0.05, 0.2, 0.5, 0.2));

        let before = champion_id(std::slice::from_ref(&incumbent));
        let after = champion_id(&[incumbent, contender]);
        assert_ne!(before, after);
    }
}
