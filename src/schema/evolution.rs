//! Evolution configuration types for interactive rule search.

use serde::{Deserialize, Serialize};

use super::{ConfigError, GenomeFamily, SimulationConfig};

/// Top-level configuration for a population of rule genomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Lattice and rule encoding used to preview genomes.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Number of genomes (non-zero, divisible by 4).
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Probability that a bit of a freshly created genome is live.
    #[serde(default = "default_genome_density")]
    pub genome_density: f64,
    /// Mutation settings applied after crossover.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Number of genomes previewed at once.
    #[serde(default = "default_preview_count")]
    pub preview_count: usize,
    /// Metric-driven fitness settings (used when no human selects).
    #[serde(default)]
    pub fitness: FitnessConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            population_size: default_population_size(),
            genome_density: default_genome_density(),
            mutation: MutationConfig::default(),
            preview_count: default_preview_count(),
            fitness: FitnessConfig::default(),
            random_seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Genome family of the population.
    #[inline]
    pub fn family(&self) -> GenomeFamily {
        self.simulation.family
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        if self.population_size == 0 || self.population_size % 4 != 0 {
            return Err(ConfigError::InvalidPopulationSize(self.population_size));
        }
        if self.preview_count == 0 {
            return Err(ConfigError::InvalidPreviewCount);
        }
        self.mutation.validate()
    }
}

fn default_population_size() -> usize {
    200
}
fn default_genome_density() -> f64 {
    0.5
}
fn default_preview_count() -> usize {
    10
}

/// Per-genome mutation settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Chance (in percent) that a genome is mutated at all.
    #[serde(default = "default_mutation_percent")]
    pub percent: f64,
    /// Upper bound of flips per triggered genome (drawn from 1..=max_genes).
    #[serde(default = "default_mutation_genes")]
    pub max_genes: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            percent: default_mutation_percent(),
            max_genes: default_mutation_genes(),
        }
    }
}

impl MutationConfig {
    pub fn new(percent: f64, max_genes: usize) -> Self {
        Self { percent, max_genes }
    }

    /// Validate mutation parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.percent) {
            return Err(ConfigError::InvalidMutationPercent(self.percent));
        }
        if self.max_genes == 0 {
            return Err(ConfigError::InvalidMutationGenes);
        }
        Ok(())
    }

    /// Per-genome trigger probability.
    #[inline]
    pub fn trigger_probability(&self) -> f64 {
        self.percent / 100.0
    }
}

fn default_mutation_percent() -> f64 {
    10.0
}
fn default_mutation_genes() -> usize {
    3
}

/// Bands used by the activity metric to decide whether a rule is interesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Steps simulated per genome before scoring.
    #[serde(default = "default_fitness_steps")]
    pub steps: usize,
    /// Lattice edge length used for scoring (cubic lattice).
    #[serde(default = "default_fitness_edge")]
    pub edge: usize,
    /// Initial live density of the scoring lattice.
    #[serde(default = "default_seed_density")]
    pub seed_density: f64,
    /// Accepted range of the final alive fraction.
    #[serde(default = "default_alive_band")]
    pub alive_band: (f64, f64),
    /// Accepted range of the last-step flicker fraction.
    #[serde(default = "default_flicker_band")]
    pub flicker_band: (f64, f64),
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            steps: default_fitness_steps(),
            edge: default_fitness_edge(),
            seed_density: default_seed_density(),
            alive_band: default_alive_band(),
            flicker_band: default_flicker_band(),
        }
    }
}

fn default_fitness_steps() -> usize {
    30
}
fn default_fitness_edge() -> usize {
    24
}
fn default_seed_density() -> f64 {
    0.5
}
fn default_alive_band() -> (f64, f64) {
    (0.05, 0.6)
}
fn default_flicker_band() -> (f64, f64) {
    (0.001, 0.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EvolutionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_population_size_must_divide_by_four() {
        let config = EvolutionConfig {
            population_size: 10,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPopulationSize(10))
        ));
    }

    #[test]
    fn test_mutation_bounds() {
        assert!(MutationConfig::new(101.0, 1).validate().is_err());
        assert!(MutationConfig::new(10.0, 0).validate().is_err());
        assert!(MutationConfig::new(0.0, 1).validate().is_ok());
        assert!((MutationConfig::new(10.0, 1).trigger_probability() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EvolutionConfig =
            serde_json::from_str(r#"{ "population_size": 8 }"#).unwrap();
        assert_eq!(config.population_size, 8);
        assert_eq!(config.preview_count, 10);
        assert_eq!(config.mutation.max_genes, 3);
    }
}
