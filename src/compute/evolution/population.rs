//! Fixed-size population of genomes with index-aligned fitness scores.

use crate::schema::GenomeFamily;

use super::genome::{Genome, GenomeRng};

/// Population of same-family genomes plus one fitness score per genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    family: GenomeFamily,
    genomes: Vec<Genome>,
    fitness: Vec<u32>,
}

impl Population {
    /// Random population whose bits are live with probability `density`.
    pub fn random(
        family: GenomeFamily,
        size: usize,
        density: f64,
        rng: &mut GenomeRng,
    ) -> Result<Self, PopulationError> {
        let genomes = (0..size)
            .map(|_| rng.random_genome(family.genome_len(), density))
            .collect();
        Self::from_genomes(family, genomes)
    }

    /// Wrap genomes with all fitness scores at 0.
    pub fn from_genomes(family: GenomeFamily, genomes: Vec<Genome>) -> Result<Self, PopulationError> {
        let fitness = vec![0; genomes.len()];
        Self::with_fitness(family, genomes, fitness)
    }

    /// Wrap genomes with existing fitness scores.
    pub fn with_fitness(
        family: GenomeFamily,
        genomes: Vec<Genome>,
        fitness: Vec<u32>,
    ) -> Result<Self, PopulationError> {
        if genomes.is_empty() || genomes.len() % 4 != 0 {
            return Err(PopulationError::InvalidSize(genomes.len()));
        }
        if fitness.len() != genomes.len() {
            return Err(PopulationError::FitnessLength {
                expected: genomes.len(),
                actual: fitness.len(),
            });
        }
        let expected = family.genome_len();
        if let Some((index, genome)) = genomes
            .iter()
            .enumerate()
            .find(|(_, g)| g.len() != expected)
        {
            return Err(PopulationError::GenomeLength {
                index,
                expected,
                actual: genome.len(),
            });
        }

        Ok(Self {
            family,
            genomes,
            fitness,
        })
    }

    /// Number of genomes.
    #[inline]
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Never true for a constructed population.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    #[inline]
    pub fn family(&self) -> GenomeFamily {
        self.family
    }

    /// Bit length shared by every genome.
    #[inline]
    pub fn genome_len(&self) -> usize {
        self.family.genome_len()
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn genome(&self, index: usize) -> Option<&Genome> {
        self.genomes.get(index)
    }

    pub fn fitness(&self) -> &[u32] {
        &self.fitness
    }

    /// Scores in genome order; the length is fixed.
    pub(crate) fn fitness_mut(&mut self) -> &mut [u32] {
        &mut self.fitness
    }

    /// Award one selection to genome `index`.
    pub fn record_selection(&mut self, index: usize) -> Result<u32, PopulationError> {
        let len = self.fitness.len();
        let score = self
            .fitness
            .get_mut(index)
            .ok_or(PopulationError::IndexOutOfRange { index, len })?;
        *score += 1;
        Ok(*score)
    }

    /// Replace every fitness score (length must match).
    pub fn set_fitness(&mut self, fitness: Vec<u32>) -> Result<(), PopulationError> {
        if fitness.len() != self.genomes.len() {
            return Err(PopulationError::FitnessLength {
                expected: self.genomes.len(),
                actual: fitness.len(),
            });
        }
        self.fitness = fitness;
        Ok(())
    }

    /// Reset every fitness score to 0.
    pub fn clear_fitness(&mut self) {
        self.fitness.fill(0);
    }

    /// Genome indices sorted by fitness, highest first; ties keep index order.
    pub fn ranked(&self) -> Vec<usize> {
        rank_by_fitness(&self.fitness)
    }

    /// Mean fraction of live bits across the population.
    pub fn mean_density(&self) -> f64 {
        let ones: usize = self.genomes.iter().map(Genome::count_ones).sum();
        ones as f64 / (self.len() * self.genome_len()).max(1) as f64
    }
}

/// Indices sorted by score, highest first; ties keep index order.
pub fn rank_by_fitness(fitness: &[u32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitness.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(fitness[i]));
    order
}

/// Population invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    #[error("Population size {0} must be a non-zero multiple of 4")]
    InvalidSize(usize),
    #[error("Genome {index} has {actual} bits, expected {expected}")]
    GenomeLength {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Fitness array has {actual} entries, expected {expected}")]
    FitnessLength { expected: usize, actual: usize },
    #[error("Genome index {index} out of range for population of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(size: usize) -> Population {
        let mut rng = GenomeRng::new(42);
        Population::random(GenomeFamily::CompactMoore, size, 0.5, &mut rng).unwrap()
    }

    #[test]
    fn test_random_population() {
        let pop = population(8);
        assert_eq!(pop.len(), 8);
        assert!(pop.genomes().iter().all(|g| g.len() == 38));
        assert!(pop.fitness().iter().all(|&f| f == 0));
    }

    #[test]
    fn test_size_must_divide_by_four() {
        let mut rng = GenomeRng::new(1);
        assert!(matches!(
            Population::random(GenomeFamily::CompactMoore, 6, 0.5, &mut rng),
            Err(PopulationError::InvalidSize(6))
        ));
        assert!(Population::random(GenomeFamily::CompactMoore, 0, 0.5, &mut rng).is_err());
    }

    #[test]
    fn test_genome_length_checked() {
        let genomes = vec![Genome::zeros(38), Genome::zeros(38), Genome::zeros(14), Genome::zeros(38)];
        assert!(matches!(
            Population::from_genomes(GenomeFamily::CompactMoore, genomes),
            Err(PopulationError::GenomeLength { index: 2, .. })
        ));
    }

    #[test]
    fn test_record_selection() {
        let mut pop = population(4);
        assert_eq!(pop.record_selection(2).unwrap(), 1);
        assert_eq!(pop.record_selection(2).unwrap(), 2);
        assert_eq!(pop.fitness(), &[0, 0, 2, 0]);
        assert!(pop.record_selection(4).is_err());
    }

    #[test]
    fn test_ranked_is_stable() {
        let mut pop = population(8);
        pop.set_fitness(vec![1, 3, 1, 0, 3, 2, 0, 1]).unwrap();
        assert_eq!(pop.ranked(), vec![1, 4, 5, 0, 2, 7, 3, 6]);
    }

    #[test]
    fn test_set_fitness_length() {
        let mut pop = population(4);
        assert!(pop.set_fitness(vec![1, 2, 3]).is_err());
        pop.set_fitness(vec![1, 2, 3, 4]).unwrap();
        pop.clear_fitness();
        assert!(pop.fitness().iter().all(|&f| f == 0));
    }
}
