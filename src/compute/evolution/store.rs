//! Population persistence.
//!
//! A store holds one population: a metadata header, one record per genome and
//! a parallel fitness array. Stores only move bytes; [`restore_population`]
//! decides whether stored data may be adopted by the running configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::schema::{GenomeFamily, Topology};

use super::genome::{Genome, GenomeError};
use super::population::{Population, PopulationError};

/// Population-level header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationMeta {
    pub population_size: usize,
    pub genome_length: usize,
    /// Set once a complete population has been written.
    pub in_storage: bool,
    /// Neighborhood layout the genomes were evolved against.
    #[serde(default)]
    pub topology: Option<Topology>,
}

impl PopulationMeta {
    /// Header describing `population` under `topology`.
    pub fn describe(population: &Population, topology: Topology) -> Self {
        Self {
            population_size: population.len(),
            genome_length: population.genome_len(),
            in_storage: true,
            topology: Some(topology),
        }
    }

    /// Reason the stored header cannot serve `expected`, if any.
    fn mismatch(&self, expected: &PopulationMeta) -> Option<String> {
        if self.population_size != expected.population_size {
            return Some(format!(
                "population size {} != {}",
                self.population_size, expected.population_size
            ));
        }
        if self.genome_length != expected.genome_length {
            return Some(format!(
                "genome length {} != {}",
                self.genome_length, expected.genome_length
            ));
        }
        if self.topology != expected.topology {
            return Some(format!(
                "topology {:?} != {:?}",
                self.topology, expected.topology
            ));
        }
        None
    }
}

/// One stored genome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeRecord {
    /// Position in the population.
    pub id: usize,
    /// Packed bits, base64 encoded.
    pub bits: String,
}

/// Raw store contents.
#[derive(Debug, Clone, Default)]
pub struct StoredPopulation {
    pub meta: Option<PopulationMeta>,
    pub records: Vec<GenomeRecord>,
    pub fitness: Option<Vec<u32>>,
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed stored JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed stored genome: {0}")]
    Genome(#[from] GenomeError),
    #[error("Stored population does not match configuration: {0}")]
    Mismatch(String),
    #[error(transparent)]
    Population(#[from] PopulationError),
}

/// Durable home for one population.
pub trait PopulationStore {
    /// Replace the stored genomes and header.
    fn save_population(
        &mut self,
        meta: &PopulationMeta,
        genomes: &[Genome],
    ) -> Result<(), StoreError>;

    /// Replace the stored fitness array.
    fn save_fitness(&mut self, fitness: &[u32]) -> Result<(), StoreError>;

    /// Read whatever is stored.
    fn load(&self) -> Result<StoredPopulation, StoreError>;

    /// Remove everything.
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Write genomes, header and fitness of `population`.
    fn save(&mut self, population: &Population, topology: Topology) -> Result<(), StoreError> {
        self.save_population(&PopulationMeta::describe(population, topology), population.genomes())?;
        self.save_fitness(population.fitness())
    }
}

fn records(genomes: &[Genome]) -> Vec<GenomeRecord> {
    genomes
        .iter()
        .enumerate()
        .map(|(id, genome)| GenomeRecord {
            id,
            bits: genome.to_base64(),
        })
        .collect()
}

/// A population rebuilt from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredPopulation {
    pub population: Population,
    /// Stored fitness was missing or of the wrong length and now reads as zeros.
    pub fitness_reset: bool,
}

/// Rebuild the stored population if it matches `family` and `topology`.
///
/// Returns `Ok(None)` when nothing complete is stored and
/// [`StoreError::Mismatch`] when stored data belongs to another configuration,
/// including genomes whose length disagrees with the header; mismatched data
/// is never partially adopted. A fitness array of the wrong length is treated
/// as absent.
pub fn restore_population<S: PopulationStore + ?Sized>(
    store: &S,
    family: GenomeFamily,
    topology: Topology,
    population_size: usize,
) -> Result<Option<RestoredPopulation>, StoreError> {
    let stored = store.load()?;
    let Some(meta) = stored.meta.filter(|m| m.in_storage) else {
        return Ok(None);
    };

    let expected = PopulationMeta {
        population_size,
        genome_length: family.genome_len(),
        in_storage: true,
        topology: Some(topology),
    };
    if let Some(reason) = meta.mismatch(&expected) {
        return Err(StoreError::Mismatch(reason));
    }

    let mut records = stored.records;
    records.sort_by_key(|r| r.id);
    if records.len() != population_size || records.iter().enumerate().any(|(i, r)| r.id != i) {
        return Err(StoreError::Mismatch(format!(
            "expected genome ids 0..{}, found {} records",
            population_size,
            records.len()
        )));
    }

    let genomes = records
        .iter()
        .map(|r| {
            Genome::from_base64(&r.bits, expected.genome_length).map_err(|e| match e {
                GenomeError::LengthMismatch { .. } => {
                    StoreError::Mismatch(format!("genome {}: {}", r.id, e))
                }
                other => StoreError::Genome(other),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (fitness, fitness_reset) = match stored.fitness {
        Some(f) if f.len() == population_size => (f, false),
        Some(f) => {
            debug!(
                "Ignoring stored fitness of length {} (expected {})",
                f.len(),
                population_size
            );
            (vec![0; population_size], true)
        }
        None => (vec![0; population_size], true),
    };

    Ok(Some(RestoredPopulation {
        population: Population::with_fitness(family, genomes, fitness)?,
        fitness_reset,
    }))
}

/// In-memory store, mainly for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    meta: Option<PopulationMeta>,
    records: Vec<GenomeRecord>,
    fitness: Option<Vec<u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PopulationStore for MemoryStore {
    fn save_population(
        &mut self,
        meta: &PopulationMeta,
        genomes: &[Genome],
    ) -> Result<(), StoreError> {
        self.records = records(genomes);
        self.meta = Some(meta.clone());
        Ok(())
    }

    fn save_fitness(&mut self, fitness: &[u32]) -> Result<(), StoreError> {
        self.fitness = Some(fitness.to_vec());
        Ok(())
    }

    fn load(&self) -> Result<StoredPopulation, StoreError> {
        Ok(StoredPopulation {
            meta: self.meta.clone(),
            records: self.records.clone(),
            fitness: self.fitness.clone(),
        })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        *self = Self::default();
        Ok(())
    }
}

const META_FILE: &str = "meta.json";
const GENOMES_FILE: &str = "genomes.json";
const FITNESS_FILE: &str = "fitness.json";

/// Store backed by three JSON files in one directory.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// failed write leaves the previous file intact.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Store rooted at `dir` (created on first save).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        fs::write(&tmp, serde_json::to_vec(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.dir.join(name)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl PopulationStore for JsonDirStore {
    fn save_population(
        &mut self,
        meta: &PopulationMeta,
        genomes: &[Genome],
    ) -> Result<(), StoreError> {
        // no header while the records are being replaced
        self.remove(META_FILE)?;
        self.write(GENOMES_FILE, &records(genomes))?;
        self.write(META_FILE, meta)
    }

    fn save_fitness(&mut self, fitness: &[u32]) -> Result<(), StoreError> {
        self.write(FITNESS_FILE, fitness)
    }

    fn load(&self) -> Result<StoredPopulation, StoreError> {
        let meta: Option<PopulationMeta> = self.read(META_FILE)?;
        if meta.is_none() {
            return Ok(StoredPopulation::default());
        }
        let records = self.read(GENOMES_FILE)?.unwrap_or_default();
        let fitness = match self.read(FITNESS_FILE) {
            Ok(fitness) => fitness,
            Err(e) => {
                warn!("Unreadable fitness file in {}: {}", self.dir.display(), e);
                None
            }
        };
        Ok(StoredPopulation {
            meta,
            records,
            fitness,
        })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for name in [META_FILE, GENOMES_FILE, FITNESS_FILE] {
            self.remove(name)?;
        }
        Ok(())
    }
}
