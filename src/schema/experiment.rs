//! Configuration and file formats for offline rule sampling.

use serde::{Deserialize, Serialize};

use super::{ConfigError, GenomeFamily, SimulationConfig, Topology};

/// Settings for one sampling experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
    /// Generations simulated before the last sample is taken (at least 2).
    pub warmup_iterations: usize,
    pub topology: Topology,
    pub family: GenomeFamily,
    /// Live density of the random seeding.
    #[serde(default = "default_seed_density")]
    pub seed_density: f64,
}

fn default_seed_density() -> f64 {
    0.5
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            depth: 32,
            warmup_iterations: 50,
            topology: Topology::LayeredMoore,
            family: GenomeFamily::Direct,
            seed_density: default_seed_density(),
        }
    }
}

impl SamplingConfig {
    /// Lattice configuration the samples run on.
    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            width: self.width,
            height: self.height,
            depth: self.depth,
            topology: self.topology,
            family: self.family,
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation().validate()?;
        if self.warmup_iterations < 2 {
            return Err(ConfigError::InvalidWarmup(self.warmup_iterations));
        }
        Ok(())
    }

    /// Metadata header describing this configuration.
    pub fn meta(&self, kind: ExperimentKind, created: u64) -> ExperimentMeta {
        ExperimentMeta {
            created,
            sizex: self.width,
            sizey: self.height,
            sizez: self.depth,
            warmup_iterations: self.warmup_iterations,
            rule_size: self.family.genome_len(),
            topology: Some(self.topology),
            kind,
        }
    }
}

/// Kind of experiment document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentKind {
    /// Full 7-column trajectory records from batch runs.
    Raw,
    /// Records collected for an explicit K range.
    Sample,
    /// Two-column (K, alive) density samples.
    Density,
}

/// Experiment metadata header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentMeta {
    /// Creation time (seconds since the Unix epoch).
    pub created: u64,
    pub sizex: usize,
    pub sizey: usize,
    pub sizez: usize,
    pub warmup_iterations: usize,
    /// Genome length in bits.
    pub rule_size: usize,
    /// Neighborhood layout the genomes were sampled against.
    #[serde(default)]
    pub topology: Option<Topology>,
    #[serde(rename = "type")]
    pub kind: ExperimentKind,
}

/// One trajectory record:
/// `[K, aliveA, aliveB, aliveC, flickerAB, flickerBC, flickerAC]`.
pub type TrajectoryRow = [usize; 7];

/// Batch sampling document (`{ meta, records }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDocument {
    pub meta: ExperimentMeta,
    pub records: Vec<TrajectoryRow>,
}

/// Single-metric sampling document (`{ meta, samples }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensityDocument {
    pub meta: ExperimentMeta,
    /// `[K, Y]` pairs.
    pub samples: Vec<[usize; 2]>,
}

/// A sampled genome exported alongside its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampledGenome {
    #[serde(rename = "K")]
    pub k: usize,
    /// Packed bits, 8 per byte, LSB first, base64 encoded.
    #[serde(rename = "genomeB64")]
    pub genome_b64: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_field_names() {
        let meta = SamplingConfig::default().meta(ExperimentKind::Raw, 0);
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"warmupIterations\":50"));
        assert!(json.contains("\"ruleSize\":524288"));
        assert!(json.contains("\"type\":\"raw\""));
    }

    #[test]
    fn test_meta_without_topology_parses() {
        let json = r#"{"created":0,"sizex":32,"sizey":32,"sizez":32,
            "warmupIterations":50,"ruleSize":524288,"type":"sample"}"#;
        let meta: ExperimentMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.topology, None);
        assert_eq!(meta.kind, ExperimentKind::Sample);
    }

    #[test]
    fn test_warmup_must_cover_three_generations() {
        let config = SamplingConfig {
            warmup_iterations: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWarmup(1))));
    }
}
