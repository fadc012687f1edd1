//! Automatic activity scoring.
//!
//! Each genome is run on a small cubic lattice from a random seed. A genome
//! earns one point when its final live fraction and its last-step flicker
//! fraction both fall inside the configured bands.

use log::debug;
use rayon::prelude::*;

use crate::compute::{Lattice, RuleError, RuleTable};
use crate::schema::{FitnessConfig, GenomeFamily, Seed, Topology};

use super::genome::{Genome, GenomeRng};
use super::population::Population;

/// Observed activity of one genome run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityReport {
    /// Live fraction after the last step.
    pub alive_fraction: f64,
    /// Fraction of cells that changed during the last step.
    pub flicker_fraction: f64,
    /// Whether both fractions are inside their bands.
    pub passed: bool,
}

/// Scores genomes by simulated activity.
#[derive(Debug, Clone)]
pub struct ActivityFitness {
    config: FitnessConfig,
}

impl ActivityFitness {
    pub fn new(config: FitnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Run `genome` from a random lattice seeded with `seed`.
    pub fn evaluate(
        &self,
        genome: &Genome,
        family: GenomeFamily,
        topology: Topology,
        seed: u64,
    ) -> Result<ActivityReport, RuleError> {
        let table = RuleTable::from_genome(genome, family, topology)?;
        let edge = self.config.edge.max(1);
        let cells = Seed::random(self.config.seed_density, Some(seed)).generate(edge, edge, edge);
        let mut lattice = Lattice::from_cells(cells, edge, edge, edge);

        let mut flicker = 0;
        for _ in 0..self.config.steps {
            let next = lattice.step(&table);
            flicker = next.flicker(&lattice);
            lattice = next;
        }

        let volume = lattice.volume() as f64;
        let alive_fraction = lattice.alive_count() as f64 / volume;
        let flicker_fraction = flicker as f64 / volume;
        let passed = within(alive_fraction, self.config.alive_band)
            && within(flicker_fraction, self.config.flicker_band);

        Ok(ActivityReport {
            alive_fraction,
            flicker_fraction,
            passed,
        })
    }

    /// Evaluate every genome in parallel and add one point to each that passes.
    ///
    /// Returns the number of genomes awarded.
    pub fn score(
        &self,
        population: &mut Population,
        topology: Topology,
        rng: &mut GenomeRng,
    ) -> Result<usize, RuleError> {
        let family = population.family();
        let seeds: Vec<u64> = (0..population.len()).map(|_| rng.next_seed()).collect();

        let reports = population
            .genomes()
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(genome, &seed)| self.evaluate(genome, family, topology, seed))
            .collect::<Result<Vec<_>, _>>()?;

        let mut awarded = 0;
        for (score, report) in population.fitness_mut().iter_mut().zip(&reports) {
            if report.passed {
                *score += 1;
                awarded += 1;
            }
        }

        debug!(
            "Activity scoring awarded {}/{} genomes",
            awarded,
            population.len()
        );
        Ok(awarded)
    }
}

fn within(value: f64, (lo, hi): (f64, f64)) -> bool {
    lo <= value && value <= hi
}
