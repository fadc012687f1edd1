//! Toroidal 3D lattice of binary cells.
//!
//! Cells are stored as a flat buffer indexed `z * height * width + y * width + x`.

use crate::schema::{Seed, SimulationConfig, Topology};

use super::RuleTable;

/// Binary cell grid with wraparound on every axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    /// Cell states (0 or 1).
    cells: Vec<u8>,
    /// Lattice width (X dimension).
    pub width: usize,
    /// Lattice height (Y dimension).
    pub height: usize,
    /// Lattice depth (Z dimension).
    pub depth: usize,
}

impl Lattice {
    /// All-dead lattice.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            cells: vec![0; width * height * depth],
            width,
            height,
            depth,
        }
    }

    /// Create new lattice from seed.
    pub fn from_seed(seed: &Seed, config: &SimulationConfig) -> Self {
        Self::from_cells(
            seed.generate(config.width, config.height, config.depth),
            config.width,
            config.height,
            config.depth,
        )
    }

    /// Wrap an existing cell buffer. Non-zero values are stored as 1.
    pub fn from_cells(mut cells: Vec<u8>, width: usize, height: usize, depth: usize) -> Self {
        assert_eq!(
            cells.len(),
            width * height * depth,
            "cell buffer does not match lattice dimensions"
        );
        for cell in cells.iter_mut() {
            *cell = (*cell != 0) as u8;
        }
        Self {
            cells,
            width,
            height,
            depth,
        }
    }

    /// Total number of cells.
    #[inline]
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    /// Convert (x, y, z) coordinates to flat index.
    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.height * self.width + y * self.width + x
    }

    /// State of cell (x, y, z).
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        self.cells[self.idx(x, y, z)]
    }

    /// Set cell (x, y, z) to `value` (non-zero = live).
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u8) {
        let idx = self.idx(x, y, z);
        self.cells[idx] = (value != 0) as u8;
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: u8) {
        self.cells.fill((value != 0) as u8);
    }

    /// Raw cell buffer.
    #[inline]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Whether both lattices have identical dimensions.
    #[inline]
    pub fn same_shape(&self, other: &Lattice) -> bool {
        self.width == other.width && self.height == other.height && self.depth == other.depth
    }

    /// Compute the next generation.
    ///
    /// Every cell of the result is read from `table` using the table's
    /// neighborhood over the current generation only; `self` is never modified.
    pub fn step(&self, table: &RuleTable) -> Lattice {
        let topology = table.topology();
        let mut next = vec![0u8; self.cells.len()];
        let mut i = 0;
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    next[i] = table.get(topology.index(self, x, y, z));
                    i += 1;
                }
            }
        }

        Lattice {
            cells: next,
            width: self.width,
            height: self.height,
            depth: self.depth,
        }
    }

    /// Number of live cells.
    pub fn alive_count(&self) -> usize {
        self.cells.iter().map(|&c| c as usize).sum()
    }

    /// Number of cells whose state differs from `other`.
    ///
    /// Both lattices must have the same shape.
    pub fn flicker(&self, other: &Lattice) -> usize {
        assert!(self.same_shape(other), "flicker needs same-shaped lattices");
        self.cells
            .iter()
            .zip(&other.cells)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Number of cells whose state matches `other`.
    pub fn matches(&self, other: &Lattice) -> usize {
        self.volume() - self.flicker(other)
    }

    /// X-by-Y view of one z-slice, `view[x][y]` true for live cells.
    ///
    /// `z` is taken modulo the depth.
    pub fn z_slice(&self, z: usize) -> Vec<Vec<bool>> {
        let z = z % self.depth.max(1);
        (0..self.width)
            .map(|x| (0..self.height).map(|y| self.get(x, y, z) == 1).collect())
            .collect()
    }
}

/// Summary statistics of a lattice generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeStats {
    pub alive: usize,
    pub volume: usize,
}

impl LatticeStats {
    /// Compute statistics from a lattice.
    pub fn from_lattice(lattice: &Lattice) -> Self {
        Self {
            alive: lattice.alive_count(),
            volume: lattice.volume(),
        }
    }

    /// Fraction of live cells.
    pub fn density(&self) -> f64 {
        if self.volume == 0 {
            0.0
        } else {
            self.alive as f64 / self.volume as f64
        }
    }
}
