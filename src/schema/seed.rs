//! Seed types for initializing lattices.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Default coverage of the chunk pattern (fraction of the volume).
pub const DEFAULT_CHUNK_COVERAGE: f64 = 0.01;

/// Edge length of a seeding chunk.
pub const CHUNK_EDGE: usize = 3;

/// Complete seed specification for lattice initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Pattern to use for seeding.
    pub pattern: Pattern,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            pattern: Pattern::Random {
                density: 0.5,
                seed: None,
            },
        }
    }
}

/// Predefined patterns for initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// Every cell independently live with probability `density`.
    Random {
        density: f64,
        /// Random seed (None = entropy).
        #[serde(default)]
        seed: Option<u64>,
    },
    /// A single live cell at (width/2, height/2, depth/2).
    Center,
    /// Sparse randomized 3x3x3 blocks.
    Chunks {
        /// Target fraction of the volume covered by chunks.
        coverage: f64,
        #[serde(default)]
        seed: Option<u64>,
    },
}

impl Pattern {
    fn seed(&self) -> Option<u64> {
        match self {
            Pattern::Random { seed, .. } | Pattern::Chunks { seed, .. } => *seed,
            Pattern::Center => None,
        }
    }
}

impl Seed {
    /// Convenience constructor for a uniform random seed.
    pub fn random(density: f64, seed: Option<u64>) -> Self {
        Self {
            pattern: Pattern::Random { density, seed },
        }
    }

    /// Convenience constructor for the single-center-cell seed.
    pub fn center() -> Self {
        Self {
            pattern: Pattern::Center,
        }
    }

    /// Generate a flat cell buffer, indexed `z * height * width + y * width + x`.
    ///
    /// Uses the pattern's own seed when present, entropy otherwise.
    pub fn generate(&self, width: usize, height: usize, depth: usize) -> Vec<u8> {
        let mut rng = match self.pattern.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.generate_with_rng(width, height, depth, &mut rng)
    }

    /// Generate a flat cell buffer drawing randomness from `rng`.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        width: usize,
        height: usize,
        depth: usize,
        rng: &mut R,
    ) -> Vec<u8> {
        let mut cells = vec![0u8; width * height * depth];
        if cells.is_empty() {
            return cells;
        }

        match &self.pattern {
            Pattern::Random { density, .. } => {
                let p = density.clamp(0.0, 1.0);
                for cell in cells.iter_mut() {
                    *cell = rng.gen_bool(p) as u8;
                }
            }
            Pattern::Center => {
                let idx = (depth / 2) * height * width + (height / 2) * width + width / 2;
                cells[idx] = 1;
            }
            Pattern::Chunks { coverage, .. } => {
                apply_chunks(&mut cells, *coverage, width, height, depth, rng);
            }
        }

        cells
    }
}

/// Randomize `volume * coverage / 27` blocks of 3x3x3 cells.
///
/// Block origins are uniform over the lattice and blocks wrap at the edges.
fn apply_chunks<R: Rng + ?Sized>(
    cells: &mut [u8],
    coverage: f64,
    width: usize,
    height: usize,
    depth: usize,
    rng: &mut R,
) {
    let volume = cells.len();
    let block = CHUNK_EDGE * CHUNK_EDGE * CHUNK_EDGE;
    let chunks = (volume as f64 * coverage.max(0.0) / block as f64).floor() as usize;

    for _ in 0..chunks {
        let cx = rng.gen_range(0..width);
        let cy = rng.gen_range(0..height);
        let cz = rng.gen_range(0..depth);

        for dz in 0..CHUNK_EDGE {
            let z = (cz + dz) % depth;
            for dy in 0..CHUNK_EDGE {
                let y = (cy + dy) % height;
                for dx in 0..CHUNK_EDGE {
                    let x = (cx + dx) % width;
                    cells[z * height * width + y * width + x] = rng.gen_bool(0.5) as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_seed() {
        let cells = Seed::center().generate(8, 6, 4);
        assert_eq!(cells.iter().map(|&c| c as usize).sum::<usize>(), 1);
        assert_eq!(cells[2 * 6 * 8 + 3 * 8 + 4], 1);
    }

    #[test]
    fn test_random_seed_is_reproducible() {
        let seed = Seed::random(0.5, Some(7));
        assert_eq!(seed.generate(8, 8, 8), seed.generate(8, 8, 8));
    }

    #[test]
    fn test_random_density_extremes() {
        let full = Seed::random(1.0, Some(1)).generate(4, 4, 4);
        assert!(full.iter().all(|&c| c == 1));
        let empty = Seed::random(0.0, Some(1)).generate(4, 4, 4);
        assert!(empty.iter().all(|&c| c == 0));
    }

    #[test]
    fn test_chunks_are_sparse() {
        let seed = Seed {
            pattern: Pattern::Chunks {
                coverage: DEFAULT_CHUNK_COVERAGE,
                seed: Some(3),
            },
        };
        let cells = seed.generate(32, 32, 32);
        let alive: usize = cells.iter().map(|&c| c as usize).sum();
        // 37 chunks of 27 cells at most
        assert!(alive <= 37 * 27);
        assert!(alive > 0);
    }

    #[test]
    fn test_chunks_on_tiny_lattice_wrap() {
        let seed = Seed {
            pattern: Pattern::Chunks {
                coverage: 1.0,
                seed: Some(5),
            },
        };
        let cells = seed.generate(2, 2, 2);
        assert_eq!(cells.len(), 8);
    }
}
