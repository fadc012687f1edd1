//! Generational search: truncation selection, pairwise crossover, mutation.

use log::{debug, info};

use crate::schema::{ConfigError, EvolutionConfig, MutationConfig};

use super::genome::{Genome, GenomeRng, genome_distance};
use super::population::{Population, PopulationError, rank_by_fitness};

/// Summary of one evolutionary cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Generation number produced by the cycle.
    pub generation: usize,
    /// Highest fitness in the scored input population.
    pub best_fitness: u32,
    /// Mean fitness of the scored input population.
    pub avg_fitness: f32,
    /// Lowest fitness among kept survivors.
    pub survivor_min_fitness: u32,
    /// Highest fitness among discarded genomes.
    pub discarded_max_fitness: u32,
    /// Genomes that received at least one flip.
    pub mutated_genomes: usize,
    /// Total flips applied.
    pub flips: usize,
    /// Mean pairwise distance between each parent pair.
    pub parent_distance: f32,
}

/// Per-generation history (one entry per cycle).
#[derive(Debug, Clone, Default)]
pub struct EvolutionHistory {
    pub best_fitness: Vec<u32>,
    pub avg_fitness: Vec<f32>,
    pub parent_distance: Vec<f32>,
}

/// Produces the next population from a scored one.
pub struct EvolutionEngine {
    rng: GenomeRng,
    mutation: MutationConfig,
    history: EvolutionHistory,
    generation: usize,
}

impl EvolutionEngine {
    /// Create a new evolution engine.
    pub fn new(mutation: MutationConfig, rng: GenomeRng) -> Result<Self, ConfigError> {
        mutation.validate()?;
        Ok(Self {
            rng,
            mutation,
            history: EvolutionHistory::default(),
            generation: 0,
        })
    }

    /// Create from an evolution configuration.
    pub fn from_config(config: &EvolutionConfig) -> Result<Self, ConfigError> {
        Self::new(config.mutation, GenomeRng::from_seed(config.random_seed))
    }

    /// Change mutation settings for subsequent cycles.
    pub fn set_mutation(&mut self, mutation: MutationConfig) -> Result<(), ConfigError> {
        mutation.validate()?;
        self.mutation = mutation;
        Ok(())
    }

    pub fn mutation(&self) -> &MutationConfig {
        &self.mutation
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    /// Cycles run so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Genome RNG, shared with callers that need the same stream.
    pub fn rng_mut(&mut self) -> &mut GenomeRng {
        &mut self.rng
    }

    /// Run one cycle. The input population is left untouched.
    ///
    /// The result has the same size and genome length, holds every surviving
    /// parent next to two crossover children per pair, and carries fitness 0
    /// for every genome. Mutation then runs over all of them, parents included.
    pub fn evolve(
        &mut self,
        population: &Population,
    ) -> Result<(Population, CycleReport), PopulationError> {
        let (genomes, report) = self.breed(population.genomes(), population.fitness())?;
        let next = Population::from_genomes(population.family(), genomes)?;
        Ok((next, report))
    }

    /// Selection, crossover and mutation over index-aligned genomes and scores.
    ///
    /// `genomes.len()` must be a non-zero multiple of 4 and `fitness` must
    /// hold one score per genome.
    pub fn breed(
        &mut self,
        genomes: &[Genome],
        fitness: &[u32],
    ) -> Result<(Vec<Genome>, CycleReport), PopulationError> {
        let n = genomes.len();
        if n == 0 || n % 4 != 0 {
            return Err(PopulationError::InvalidSize(n));
        }
        if fitness.len() != n {
            return Err(PopulationError::FitnessLength {
                expected: n,
                actual: fitness.len(),
            });
        }

        let ranked = rank_by_fitness(fitness);
        let (survivors, discarded) = ranked.split_at(n / 2);

        let mut pool: Vec<usize> = survivors.to_vec();
        let mut next: Vec<Genome> = Vec::with_capacity(n);
        let mut distance = 0.0f32;

        for _ in 0..n / 4 {
            let parent1 = &genomes[pool.remove(self.rng.index(pool.len()))];
            let parent2 = &genomes[pool.remove(self.rng.index(pool.len()))];

            let (child1, child2) = self.rng.crossover_pair(parent1, parent2);
            distance += genome_distance(parent1, parent2);

            next.push(parent1.clone());
            next.push(parent2.clone());
            next.push(child1);
            next.push(child2);
        }

        let mut mutated_genomes = 0;
        let mut flips = 0;
        for genome in next.iter_mut() {
            let applied = self.rng.mutate(genome, &self.mutation);
            if applied > 0 {
                mutated_genomes += 1;
                flips += applied;
            }
        }

        self.generation += 1;
        let report = CycleReport {
            generation: self.generation,
            best_fitness: fitness.iter().copied().max().unwrap_or(0),
            avg_fitness: fitness.iter().sum::<u32>() as f32 / n.max(1) as f32,
            survivor_min_fitness: survivors.iter().map(|&i| fitness[i]).min().unwrap_or(0),
            discarded_max_fitness: discarded.iter().map(|&i| fitness[i]).max().unwrap_or(0),
            mutated_genomes,
            flips,
            parent_distance: distance / (n / 4).max(1) as f32,
        };

        self.history.best_fitness.push(report.best_fitness);
        self.history.avg_fitness.push(report.avg_fitness);
        self.history.parent_distance.push(report.parent_distance);

        info!(
            "Generation {}: best={} avg={:.2} kept>={} dropped<={} mutated={} ({} flips)",
            report.generation,
            report.best_fitness,
            report.avg_fitness,
            report.survivor_min_fitness,
            report.discarded_max_fitness,
            report.mutated_genomes,
            report.flips
        );
        debug!("Mean parent distance {:.4}", report.parent_distance);

        Ok((next, report))
    }
}
