//! Rule tables: neighborhood index -> next cell state.

use crate::schema::{GenomeFamily, Topology};

use super::Genome;

/// Read-only lookup table built from a genome for one topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    entries: Vec<u8>,
    topology: Topology,
}

impl RuleTable {
    /// Build the table for a genome of the given family.
    pub fn from_genome(
        genome: &Genome,
        family: GenomeFamily,
        topology: Topology,
    ) -> Result<Self, RuleError> {
        if !family.supports(topology) {
            return Err(RuleError::IncompatibleTopology { family, topology });
        }
        if family.is_compact() {
            Self::totalistic(genome, topology)
        } else {
            Self::direct(genome, topology)
        }
    }

    /// Expand a compact totalistic genome of `2 * cells` bits.
    ///
    /// For index `i` with center state `c`, the entry is
    /// `genome[c * (cells - 1) + popcount(i)]`: the first half of the genome
    /// covers dead centers by live-neighbor count, the second half live ones.
    pub fn totalistic(genome: &Genome, topology: Topology) -> Result<Self, RuleError> {
        let cells = topology.cells();
        if genome.len() != 2 * cells {
            return Err(RuleError::LengthMismatch {
                expected: 2 * cells,
                actual: genome.len(),
            });
        }

        let center_bit = topology.center_bit();
        let entries = (0..topology.states())
            .map(|i| {
                let center = (i >> center_bit) & 1;
                let q = center * (cells - 1) + i.count_ones() as usize;
                genome.bit(q)
            })
            .collect();

        Ok(Self { entries, topology })
    }

    /// Use a full-size genome directly as the table.
    pub fn direct(genome: &Genome, topology: Topology) -> Result<Self, RuleError> {
        if genome.len() != topology.states() {
            return Err(RuleError::LengthMismatch {
                expected: topology.states(),
                actual: genome.len(),
            });
        }

        let entries = genome
            .words()
            .iter()
            .flat_map(|&w| (0..64u32).map(move |b| ((w >> b) & 1) as u8))
            .take(genome.len())
            .collect();

        Ok(Self { entries, topology })
    }

    /// Next state for neighborhood index `index`.
    #[inline]
    pub fn get(&self, index: usize) -> u8 {
        self.entries[index]
    }

    /// Number of entries (2^cells).
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a built table.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Topology the table was built for.
    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Raw entries.
    pub fn entries(&self) -> &[u8] {
        &self.entries
    }
}

/// Rule construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Genome has {actual} bits, rule table needs {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Genome family {family:?} cannot drive topology {topology:?}")]
    IncompatibleTopology {
        family: GenomeFamily,
        topology: Topology,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::GenomeRng;

    #[test]
    fn test_von_neumann_expansion_endpoints() {
        let genome = Genome::parse_rule_str("11000001010001", 14);
        let table = RuleTable::totalistic(&genome, Topology::VonNeumann).unwrap();

        assert_eq!(table.len(), 128);
        assert_eq!(table.get(0), genome.bit(0));
        assert_eq!(table.get(127), genome.bit(13));
    }

    #[test]
    fn test_von_neumann_center_selects_half() {
        let genome = Genome::parse_rule_str("11000001010001", 14);
        let table = RuleTable::totalistic(&genome, Topology::VonNeumann).unwrap();

        // center only: q = 6 + 1 = 7
        assert_eq!(table.get(1 << 3), genome.bit(7));
        // one neighbor, center dead: q = 1
        assert_eq!(table.get(1 << 5), genome.bit(1));
        // one neighbor, center live: q = 8
        assert_eq!(table.get((1 << 5) | (1 << 3)), genome.bit(8));
    }

    #[test]
    fn test_moore_expansion_counts() {
        let mut rng = GenomeRng::new(2);
        let genome = rng.random_genome(38, 0.5);

        for topology in [Topology::ReducedMoore, Topology::LayeredMoore] {
            let table = RuleTable::totalistic(&genome, topology).unwrap();
            assert_eq!(table.len(), 524_288);
            assert_eq!(table.get(0), genome.bit(0));
            assert_eq!(table.get(524_287), genome.bit(37));
            assert_eq!(table.get(1 << topology.center_bit()), genome.bit(19));
        }
    }

    #[test]
    fn test_layouts_differ_for_same_genome() {
        // live only with a live center and no neighbors
        let mut genome = Genome::zeros(38);
        genome.set(19, true);
        let reduced = RuleTable::totalistic(&genome, Topology::ReducedMoore).unwrap();
        let layered = RuleTable::totalistic(&genome, Topology::LayeredMoore).unwrap();

        assert_eq!(reduced.get(1 << 18), 1);
        assert_eq!(layered.get(1 << 18), 0);
        assert_eq!(layered.get(1 << 9), 1);
    }

    #[test]
    fn test_direct_table_is_genome() {
        let mut rng = GenomeRng::new(4);
        let genome = rng.random_genome(524_288, 0.05);
        let table = RuleTable::direct(&genome, Topology::LayeredMoore).unwrap();

        assert_eq!(table.len(), genome.len());
        for i in (0..genome.len()).step_by(997) {
            assert_eq!(table.get(i), genome.bit(i));
        }
        assert_eq!(
            table.entries().iter().map(|&e| e as usize).sum::<usize>(),
            genome.count_ones()
        );
    }

    #[test]
    fn test_length_mismatch() {
        let genome = Genome::zeros(38);
        assert!(matches!(
            RuleTable::totalistic(&genome, Topology::VonNeumann),
            Err(RuleError::LengthMismatch {
                expected: 14,
                actual: 38
            })
        ));
        assert!(RuleTable::direct(&genome, Topology::ReducedMoore).is_err());
    }

    #[test]
    fn test_from_genome_checks_family() {
        let genome = Genome::zeros(14);
        assert!(matches!(
            RuleTable::from_genome(&genome, GenomeFamily::CompactVonNeumann, Topology::ReducedMoore),
            Err(RuleError::IncompatibleTopology { .. })
        ));
        assert!(
            RuleTable::from_genome(&genome, GenomeFamily::CompactVonNeumann, Topology::VonNeumann)
                .is_ok()
        );
    }
}
