//! Configuration types for lattice simulations.

use serde::{Deserialize, Serialize};

/// Number of states of a 19-cell neighborhood (2^19).
pub const MOORE_STATES: usize = 1 << 19;

/// Number of states of a 7-cell neighborhood (2^7).
pub const VON_NEUMANN_STATES: usize = 1 << 7;

/// Neighbor set and bit layout used to index a rule table.
///
/// A genome only has meaning together with the topology it was authored
/// against: the two 19-cell layouts cover the same physical cells but assign
/// them different bit positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// 6 face neighbors + center (7 bits, center at bit 3).
    VonNeumann,
    /// 6 faces, 12 edges, center; grouped faces / XY / XZ / YZ edges
    /// (19 bits, center at bit 18).
    ReducedMoore,
    /// Same 19 cells re-indexed as bottom / middle / top z-layers
    /// (19 bits, center at bit 9).
    LayeredMoore,
}

impl Topology {
    /// Number of cells in the neighborhood, including the center.
    #[inline]
    pub fn cells(self) -> usize {
        match self {
            Topology::VonNeumann => 7,
            Topology::ReducedMoore | Topology::LayeredMoore => 19,
        }
    }

    /// Bit position of the center cell in a neighborhood index.
    #[inline]
    pub fn center_bit(self) -> u32 {
        match self {
            Topology::VonNeumann => 3,
            Topology::ReducedMoore => 18,
            Topology::LayeredMoore => 9,
        }
    }

    /// Number of distinct neighborhood indices (2^cells).
    #[inline]
    pub fn states(self) -> usize {
        1 << self.cells()
    }
}

/// Genome encoding family. All genomes in one population share a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeFamily {
    /// 19 dead-center totals followed by 19 live-center totals.
    CompactMoore,
    /// 7 dead-center totals followed by 7 live-center totals.
    CompactVonNeumann,
    /// One bit per 19-cell neighborhood state.
    Direct,
}

impl GenomeFamily {
    /// Fixed genome length in bits.
    #[inline]
    pub fn genome_len(self) -> usize {
        match self {
            GenomeFamily::CompactMoore => 38,
            GenomeFamily::CompactVonNeumann => 14,
            GenomeFamily::Direct => MOORE_STATES,
        }
    }

    /// Whether the family is expanded totalistically into a rule table.
    #[inline]
    pub fn is_compact(self) -> bool {
        !matches!(self, GenomeFamily::Direct)
    }

    /// Whether genomes of this family can drive the given topology.
    pub fn supports(self, topology: Topology) -> bool {
        match self {
            GenomeFamily::CompactVonNeumann => topology == Topology::VonNeumann,
            GenomeFamily::CompactMoore | GenomeFamily::Direct => topology.cells() == 19,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Lattice size along X.
    pub width: usize,
    /// Lattice size along Y.
    pub height: usize,
    /// Lattice size along Z.
    pub depth: usize,
    /// Neighborhood layout used for rule lookups.
    pub topology: Topology,
    /// Genome family the rules are drawn from.
    pub family: GenomeFamily,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            depth: 64,
            topology: Topology::ReducedMoore,
            family: GenomeFamily::CompactMoore,
        }
    }
}

impl SimulationConfig {
    /// Total number of cells (width * height * depth).
    #[inline]
    pub fn volume(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if !self.family.supports(self.topology) {
            return Err(ConfigError::IncompatibleTopology {
                family: self.family,
                topology: self.topology,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Lattice dimensions (width, height, depth) must be non-zero")]
    InvalidDimensions,
    #[error("Genome family {family:?} cannot drive topology {topology:?}")]
    IncompatibleTopology {
        family: GenomeFamily,
        topology: Topology,
    },
    #[error("Population size {0} must be a non-zero multiple of 4")]
    InvalidPopulationSize(usize),
    #[error("Mutation percent {0} must lie in [0, 100]")]
    InvalidMutationPercent(f64),
    #[error("Mutation gene count must be at least 1")]
    InvalidMutationGenes,
    #[error("Warm-up must cover at least 2 iterations, got {0}")]
    InvalidWarmup(usize),
    #[error("Preview count must be non-zero")]
    InvalidPreviewCount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_sizes() {
        assert_eq!(Topology::VonNeumann.states(), VON_NEUMANN_STATES);
        assert_eq!(Topology::ReducedMoore.states(), MOORE_STATES);
        assert_eq!(Topology::LayeredMoore.states(), MOORE_STATES);
    }

    #[test]
    fn test_family_lengths() {
        assert_eq!(GenomeFamily::CompactMoore.genome_len(), 38);
        assert_eq!(GenomeFamily::CompactVonNeumann.genome_len(), 14);
        assert_eq!(GenomeFamily::Direct.genome_len(), 524_288);
    }

    #[test]
    fn test_validate_rejects_mismatched_family() {
        let config = SimulationConfig {
            topology: Topology::VonNeumann,
            family: GenomeFamily::CompactMoore,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompatibleTopology { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let config = SimulationConfig {
            depth: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_config_json_roundtrip_names() {
        let json = serde_json::to_string(&SimulationConfig::default()).unwrap();
        assert!(json.contains("\"reduced_moore\""));
        assert!(json.contains("\"compact_moore\""));
    }
}
