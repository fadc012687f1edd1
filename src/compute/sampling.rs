//! Offline rule sampling.
//!
//! A sample runs one genome from a fresh random seeding for
//! `warmup_iterations` generations and records the live counts of the last
//! three generations (A = W-2, B = W-1, C = W) plus their pairwise flicker.
//! Samples are pure functions of (genome, configuration, seed); batches draw
//! per-sample seeds up front and evaluate in parallel.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use rayon::prelude::*;

use crate::schema::{
    ConfigError, DensityDocument, ExperimentDocument, ExperimentKind, ExperimentMeta,
    SampledGenome, SamplingConfig, Seed, TrajectoryRow,
};

use super::{Genome, GenomeRng, Lattice, RuleError, RuleTable};

/// Records appended between intermediate saves of a batch.
pub const SAVE_EVERY: usize = 100;

/// Live and flicker counts of the last three warm-up generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectorySample {
    /// Live counts at generations W-2, W-1 and W.
    pub alive: [usize; 3],
    pub flicker_ab: usize,
    pub flicker_bc: usize,
    pub flicker_ac: usize,
}

impl TrajectorySample {
    /// `[K, aliveA, aliveB, aliveC, flickerAB, flickerBC, flickerAC]`.
    pub fn to_row(&self, k: usize) -> TrajectoryRow {
        [
            k,
            self.alive[0],
            self.alive[1],
            self.alive[2],
            self.flicker_ab,
            self.flicker_bc,
            self.flicker_ac,
        ]
    }

    /// Rule is static over the last two generations.
    pub fn is_static(&self) -> bool {
        self.flicker_bc == 0
    }

    /// Rule repeats with period 2 over the last three generations.
    pub fn is_period_two(&self) -> bool {
        self.flicker_ac == 0 && self.flicker_ab > 0
    }
}

/// Sampling errors.
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("Invalid K range {from}..={to} for genomes of {len} bits")]
    InvalidRange { from: usize, to: usize, len: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("Experiment file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed experiment file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Run `table` from a random seeding and record the trajectory tail.
pub fn sample_table(table: &RuleTable, config: &SamplingConfig, seed: u64) -> TrajectorySample {
    let cells = Seed::random(config.seed_density, Some(seed)).generate(
        config.width,
        config.height,
        config.depth,
    );
    let mut lattice = Lattice::from_cells(cells, config.width, config.height, config.depth);
    for _ in 0..config.warmup_iterations.saturating_sub(2) {
        lattice = lattice.step(table);
    }

    let a = lattice;
    let b = a.step(table);
    let c = b.step(table);

    TrajectorySample {
        alive: [a.alive_count(), b.alive_count(), c.alive_count()],
        flicker_ab: a.flicker(&b),
        flicker_bc: b.flicker(&c),
        flicker_ac: a.flicker(&c),
    }
}

/// Sample one genome.
pub fn sample_trajectory(
    genome: &Genome,
    config: &SamplingConfig,
    seed: u64,
) -> Result<TrajectorySample, SamplingError> {
    config.validate()?;
    let table = RuleTable::from_genome(genome, config.family, config.topology)?;
    Ok(sample_table(&table, config, seed))
}

/// One drawn sample: its K, genome seed and lattice seed.
#[derive(Debug, Clone, Copy)]
struct Draw {
    k: usize,
    genome_seed: u64,
    lattice_seed: u64,
}

fn draw(rng: &mut GenomeRng, from: usize, to: usize) -> Draw {
    Draw {
        k: from + rng.index(to - from + 1),
        genome_seed: rng.next_seed(),
        lattice_seed: rng.next_seed(),
    }
}

/// Evaluate draws in parallel, keeping their order.
fn evaluate(
    draws: &[Draw],
    config: &SamplingConfig,
) -> Result<Vec<(TrajectoryRow, Genome)>, SamplingError> {
    let len = config.family.genome_len();
    draws
        .par_iter()
        .map(|d| {
            let genome = GenomeRng::new(d.genome_seed).random_with_k(len, d.k);
            let sample = sample_trajectory(&genome, config, d.lattice_seed)?;
            Ok((sample.to_row(d.k), genome))
        })
        .collect()
}

/// Records and exported genomes of one ranged sampling run.
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    pub records: Vec<TrajectoryRow>,
    pub genomes: Vec<SampledGenome>,
}

/// Sample `amount` genomes with K drawn uniformly from `k_from..=k_to`.
///
/// The range is checked before any simulation work.
pub fn sample_range(
    config: &SamplingConfig,
    k_from: usize,
    k_to: usize,
    amount: usize,
    rng: &mut GenomeRng,
) -> Result<SampleBatch, SamplingError> {
    let len = config.family.genome_len();
    if k_from > k_to || k_to >= len {
        return Err(SamplingError::InvalidRange {
            from: k_from,
            to: k_to,
            len,
        });
    }
    config.validate()?;

    let draws: Vec<Draw> = (0..amount).map(|_| draw(rng, k_from, k_to)).collect();
    let mut batch = SampleBatch::default();
    for (row, genome) in evaluate(&draws, config)? {
        batch.genomes.push(SampledGenome {
            k: row[0],
            genome_b64: genome.to_base64(),
        });
        batch.records.push(row);
    }
    info!("Sampled {} genomes with K in {}..={}", amount, k_from, k_to);
    Ok(batch)
}

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Experiment document bound to a JSON file.
#[derive(Debug, Clone)]
pub struct Experiment {
    path: PathBuf,
    document: ExperimentDocument,
}

impl Experiment {
    /// Load `path`, or start an empty document of `kind` if it does not exist.
    ///
    /// A loaded header that disagrees with `config` is kept as-is and
    /// reported with a warning.
    pub fn open(
        path: impl Into<PathBuf>,
        config: &SamplingConfig,
        kind: ExperimentKind,
    ) -> Result<Self, SamplingError> {
        let path = path.into();
        let expected = config.meta(kind, now_secs());

        let document = if path.exists() {
            let document: ExperimentDocument = serde_json::from_slice(&fs::read(&path)?)?;
            for field in meta_mismatches(&document.meta, &expected) {
                warn!("{}: {} mismatch", path.display(), field);
            }
            info!(
                "Loaded {} records from {}",
                document.records.len(),
                path.display()
            );
            document
        } else {
            info!("No experiment at {}, starting a new one", path.display());
            ExperimentDocument {
                meta: expected,
                records: Vec::new(),
            }
        };

        Ok(Self { path, document })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ExperimentDocument {
        &self.document
    }

    pub fn records(&self) -> &[TrajectoryRow] {
        &self.document.records
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = TrajectoryRow>) {
        self.document.records.extend(rows);
    }

    /// Write the document back to its file.
    pub fn save(&self) -> Result<(), SamplingError> {
        write_json(&self.path, &self.document)
    }

    /// `[K, aliveC]` pairs over all records, under a density header.
    pub fn density(&self) -> DensityDocument {
        let mut meta = self.document.meta.clone();
        meta.kind = ExperimentKind::Density;
        DensityDocument {
            meta,
            samples: self.document.records.iter().map(|r| [r[0], r[3]]).collect(),
        }
    }

    /// Append `batch_size` samples with K uniform over the whole genome.
    ///
    /// The file is saved every [`SAVE_EVERY`] records and at the end.
    pub fn run_batch(
        &mut self,
        config: &SamplingConfig,
        batch_size: usize,
        rng: &mut GenomeRng,
    ) -> Result<usize, SamplingError> {
        config.validate()?;
        let top = config.family.genome_len() - 1;
        let start = self.document.records.len();
        let progress_step = (batch_size / 10).max(1);

        info!("Batch of {} samples started", batch_size);
        let mut done = 0;
        while done < batch_size {
            let chunk = SAVE_EVERY.min(batch_size - done);
            let draws: Vec<Draw> = (0..chunk).map(|_| draw(rng, 0, top)).collect();
            let rows = evaluate(&draws, config)?;
            self.extend(rows.into_iter().map(|(row, _)| row));

            let before = done;
            done += chunk;
            if done / progress_step != before / progress_step {
                info!("  progress: {}%", done * 100 / batch_size);
            }
            self.save()?;
        }

        let added = self.document.records.len() - start;
        info!("Batch finished: {} records added", added);
        Ok(added)
    }
}

/// Header fields of `found` that disagree with `expected`.
pub fn meta_mismatches(found: &ExperimentMeta, expected: &ExperimentMeta) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if found.sizex != expected.sizex {
        fields.push("sizex");
    }
    if found.sizey != expected.sizey {
        fields.push("sizey");
    }
    if found.sizez != expected.sizez {
        fields.push("sizez");
    }
    if found.warmup_iterations != expected.warmup_iterations {
        fields.push("warmupIterations");
    }
    if found.rule_size != expected.rule_size {
        fields.push("ruleSize");
    }
    if found.topology.is_some() && found.topology != expected.topology {
        fields.push("topology");
    }
    fields
}

/// Serialize `value` to `path`.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), SamplingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec(value)?)?;
    Ok(())
}
