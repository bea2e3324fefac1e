//! Archive and checkpoint persistence (C9).
//!
//! Stores individuals and generation checkpoints as one serializable
//! JSON document per unit, tagged with a schema version, under a root
//! directory split into tiers.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::EngineError;
use crate::individual::Individual;

const SCHEMA_VERSION: u32 = 1;

/// Serde helper for `SystemTime`, stored as integer seconds since the
/// epoch so checkpoints stay plain JSON numbers.
pub(crate) mod system_time_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        let secs = value
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        serializer.serialize_u64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveTier {
    Champions,
    Contenders,
    Archive,
}

impl ArchiveTier {
    fn dirname(self) -> &'static str {
        match self {
            ArchiveTier::Champions => "champions",
            ArchiveTier::Contenders => "contenders",
            ArchiveTier::Archive => "archive",
        }
    }

    /// Parses a tier name from a caller-supplied string (e.g. a CLI flag
    /// or a config file value), failing with [`EngineError::UnknownTier`]
    /// for anything outside the three recognized tiers.
    pub fn parse(name: &str) -> Result<Self, EngineError> {
        match name {
            "champions" => Ok(ArchiveTier::Champions),
            "contenders" => Ok(ArchiveTier::Contenders),
            "archive" => Ok(ArchiveTier::Archive),
            other => Err(EngineError::UnknownTier(other.to_string())),
        }
    }
}

/// Per-generation summary persisted alongside the population, mirroring
/// the generation-result bookkeeping produced at the end of every
/// scheduler step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: u64,
    pub diversity_score: f64,
    pub pareto_front_size: usize,
    pub champion_updated: bool,
    pub offspring_count: usize,
    pub failed_variation_count: usize,
    pub evaluation_secs: f64,
    pub selection_secs: f64,
    pub offspring_generation_secs: f64,
    pub replacement_secs: f64,
    pub diversity_monitoring_secs: f64,
}

/// A single persisted checkpoint: the population at a generation boundary
/// plus the run's accumulated history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema_version: u32,
    pub generation: u64,
    pub population: Vec<Individual>,
    pub history: Vec<GenerationRecord>,
    pub config: SchedulerConfig,
    #[serde(with = "system_time_secs")]
    pub timestamp: SystemTime,
}

impl Checkpoint {
    pub fn new(
        generation: u64,
        population: Vec<Individual>,
        history: Vec<GenerationRecord>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generation,
            population,
            history,
            config,
            timestamp: SystemTime::now(),
        }
    }
}

/// File-backed archive storing individuals in three tiers and writing
/// periodic checkpoints, all as JSON documents under `root`.
pub struct Archive {
    root: std::path::PathBuf,
}

impl Archive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn tier_dir(&self, tier: ArchiveTier) -> std::path::PathBuf {
        self.root.join(tier.dirname())
    }

    /// Writes `individual` under the given tier. Failures are logged and
    /// swallowed by the caller (the scheduler), never propagated as a
    /// fatal error; losing one archive write must not abort a run.
    pub fn store(&self, tier: ArchiveTier, individual: &Individual) -> Result<(), EngineError> {
        let dir = self.tier_dir(tier);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.json", individual.id));
        let body = serde_json::to_vec_pretty(individual)?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Loads one specific record from `tier` by id. Returns `None` (and
    /// logs) for a missing or corrupted record.
    pub fn load_by_id(&self, tier: ArchiveTier, id: &str) -> Option<Individual> {
        let path = self.tier_dir(tier).join(format!("{id}.json"));
        let body = fs::read(path).ok()?;
        match serde_json::from_slice(&body) {
            Ok(individual) => Some(individual),
            Err(err) => {
                log::warn!("corrupted archive record for {id}: {err}");
                None
            }
        }
    }

    /// Returns every record stored in `tier`, skipping (and logging)
    /// corrupted files rather than failing the whole read.
    pub fn load_all(&self, tier: ArchiveTier) -> Vec<Individual> {
        let dir = self.tier_dir(tier);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read(&path).ok().and_then(|body| serde_json::from_slice::<Individual>(&body).ok()) {
                Some(individual) => records.push(individual),
                None => log::warn!("corrupted archive record at {path:?}"),
            }
        }
        records
    }

    /// Returns the single record held by a single-record tier
    /// (`Champions`), or an implementation-defined pick (lexicographically
    /// first by id) for the bounded/unbounded multi-record tiers.
    /// `None` if the tier is empty.
    pub fn load(&self, tier: ArchiveTier) -> Option<Individual> {
        let mut records = self.load_all(tier);
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records.into_iter().next()
    }

    pub fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<(), EngineError> {
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(format!("checkpoint_gen{}.json", checkpoint.generation));
        let body = serde_json::to_vec_pretty(checkpoint)?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Loads a checkpoint, returning `None` (logged at `warn`) instead of
    /// an error on a missing or corrupted file, mirroring the archive's
    /// "never fatal" read policy.
    pub fn load_checkpoint(&self, generation: u64) -> Option<Checkpoint> {
        let path = self.root.join(format!("checkpoint_gen{generation}.json"));
        let body = fs::read(&path).ok()?;
        match serde_json::from_slice::<Checkpoint>(&body) {
            Ok(checkpoint) if checkpoint.schema_version == SCHEMA_VERSION => Some(checkpoint),
            Ok(checkpoint) => {
                log::warn!(
                    "checkpoint at {path:?} has schema_version {}, expected {SCHEMA_VERSION}",
                    checkpoint.schema_version
                );
                None
            }
            Err(err) => {
                log::warn!("corrupted checkpoint at {path:?}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::ParamMap;

    fn sample_individual() -> Individual {
        Individual::new(
            "gen0_offspring_0".into(),
            0,
            vec![],
            ParamMap::new(),
            "{}".into(),
            "t".into(),
        )
    }

    #[test]
    fn store_then_load_by_id_round_trips() {
        let dir = tempdir();
        let archive = Archive::new(&dir);
        let individual = sample_individual();
        archive.store(ArchiveTier::Champions, &individual).unwrap();
        let loaded = archive.load_by_id(ArchiveTier::Champions, &individual.id).unwrap();
        assert_eq!(loaded.id, individual.id);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_record_returns_none() {
        let dir = tempdir();
        let archive = Archive::new(&dir);
        assert!(archive.load_by_id(ArchiveTier::Archive, "nope").is_none());
        assert!(archive.load(ArchiveTier::Archive).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_picks_single_record_in_tier() {
        let dir = tempdir();
        let archive = Archive::new(&dir);
        archive.store(ArchiveTier::Champions, &sample_individual()).unwrap();
        let picked = archive.load(ArchiveTier::Champions).unwrap();
        assert_eq!(picked.id, "gen0_offspring_0");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_all_returns_every_record() {
        let dir = tempdir();
        let archive = Archive::new(&dir);
        let mut a = sample_individual();
        a.id = "a".into();
        let mut b = sample_individual();
        b.id = "b".into();
        archive.store(ArchiveTier::Contenders, &a).unwrap();
        archive.store(ArchiveTier::Contenders, &b).unwrap();
        let all = archive.load_all(ArchiveTier::Contenders);
        assert_eq!(all.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn tier_parse_rejects_unknown_names() {
        assert!(ArchiveTier::parse("champions").is_ok());
        assert!(matches!(ArchiveTier::parse("bogus"), Err(EngineError::UnknownTier(_))));
    }

    #[test]
    fn checkpoint_round_trips_through_json() {
        let dir = tempdir();
        let archive = Archive::new(&dir);
        let checkpoint = Checkpoint::new(3, vec![sample_individual()], vec![], sample_config());
        archive.save_checkpoint(&checkpoint).unwrap();
        let loaded = archive.load_checkpoint(3).unwrap();
        assert_eq!(loaded.generation, 3);
        assert_eq!(loaded.population.len(), 1);
        assert_eq!(loaded.config.population_size, sample_config().population_size);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn checkpoint_with_wrong_schema_is_rejected() {
        let dir = tempdir();
        std::fs::create_dir_all(&dir).unwrap();
        let mut checkpoint = Checkpoint::new(1, vec![], vec![], sample_config());
        checkpoint.schema_version = 999;
        let body = serde_json::to_vec(&checkpoint).unwrap();
        std::fs::write(dir.join("checkpoint_gen1.json"), body).unwrap();
        let archive = Archive::new(&dir);
        assert!(archive.load_checkpoint(1).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    fn sample_config() -> SchedulerConfig {
        SchedulerConfig::builder().build().unwrap()
    }

    fn tempdir() -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        path.push(format!("evo_engine_archive_test_{nanos}"));
        path
    }
}
