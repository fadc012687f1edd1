//! Neighborhood indexing on a toroidal lattice.
//!
//! Each topology packs the states of its neighbor set into an integer by
//! assigning every neighbor a fixed bit position. The layouts below are part
//! of the rule encoding: changing a bit position changes what every stored
//! genome means.
//!
//! # Von Neumann (7 cells)
//!
//! ```text
//! bit 0: z-1   bit 1: z+1   bit 2: y-1   bit 3: center
//! bit 4: y+1   bit 5: x-1   bit 6: x+1
//! ```
//!
//! # Reduced Moore (19 cells)
//!
//! ```text
//! faces     0: x-      1: x+      2: y-      3: y+      4: z-      5: z+
//! XY edges  6: x-y-    7: x-y+    8: x+y-    9: x+y+
//! XZ edges 10: x-z-   11: x-z+   12: x+z-   13: x+z+
//! YZ edges 14: y-z-   15: y-z+   16: y+z-   17: y+z+
//! center   18
//! ```
//!
//! # Layered Moore (19 cells)
//!
//! ```text
//! z-1:  0: y-   1: x-   2: c    3: x+   4: y+
//! z  :  5: x-y- 6: y-   7: x+y- 8: x-   9: center
//!      10: x+  11: x-y+ 12: y+  13: x+y+
//! z+1: 14: y-  15: x-  16: c   17: x+  18: y+
//! ```

use crate::schema::Topology;

use super::Lattice;

/// Wrapped coordinates around one cell: (minus, center, plus) per axis.
#[derive(Debug, Clone, Copy)]
struct Wrapped {
    xm: usize,
    x: usize,
    xp: usize,
    ym: usize,
    y: usize,
    yp: usize,
    zm: usize,
    z: usize,
    zp: usize,
}

impl Wrapped {
    #[inline]
    fn new(lattice: &Lattice, x: usize, y: usize, z: usize) -> Self {
        let (w, h, d) = (lattice.width, lattice.height, lattice.depth);
        Self {
            xm: (x + w - 1) % w,
            x,
            xp: (x + 1) % w,
            ym: (y + h - 1) % h,
            y,
            yp: (y + 1) % h,
            zm: (z + d - 1) % d,
            z,
            zp: (z + 1) % d,
        }
    }
}

impl Topology {
    /// Neighborhood index of cell (x, y, z), in `0..self.states()`.
    #[inline]
    pub fn index(self, lattice: &Lattice, x: usize, y: usize, z: usize) -> usize {
        let c = Wrapped::new(lattice, x, y, z);
        match self {
            Topology::VonNeumann => von_neumann_index(lattice, &c),
            Topology::ReducedMoore => reduced_moore_index(lattice, &c),
            Topology::LayeredMoore => layered_moore_index(lattice, &c),
        }
    }
}

#[inline]
fn von_neumann_index(l: &Lattice, c: &Wrapped) -> usize {
    let s = |x, y, z| l.get(x, y, z) as usize;
    s(c.x, c.y, c.zm)
        | s(c.x, c.y, c.zp) << 1
        | s(c.x, c.ym, c.z) << 2
        | s(c.x, c.y, c.z) << 3
        | s(c.x, c.yp, c.z) << 4
        | s(c.xm, c.y, c.z) << 5
        | s(c.xp, c.y, c.z) << 6
}

#[inline]
fn reduced_moore_index(l: &Lattice, c: &Wrapped) -> usize {
    let s = |x, y, z| l.get(x, y, z) as usize;
    // faces
    s(c.xm, c.y, c.z)
        | s(c.xp, c.y, c.z) << 1
        | s(c.x, c.ym, c.z) << 2
        | s(c.x, c.yp, c.z) << 3
        | s(c.x, c.y, c.zm) << 4
        | s(c.x, c.y, c.zp) << 5
        // XY edges
        | s(c.xm, c.ym, c.z) << 6
        | s(c.xm, c.yp, c.z) << 7
        | s(c.xp, c.ym, c.z) << 8
        | s(c.xp, c.yp, c.z) << 9
        // XZ edges
        | s(c.xm, c.y, c.zm) << 10
        | s(c.xm, c.y, c.zp) << 11
        | s(c.xp, c.y, c.zm) << 12
        | s(c.xp, c.y, c.zp) << 13
        // YZ edges
        | s(c.x, c.ym, c.zm) << 14
        | s(c.x, c.ym, c.zp) << 15
        | s(c.x, c.yp, c.zm) << 16
        | s(c.x, c.yp, c.zp) << 17
        | s(c.x, c.y, c.z) << 18
}

#[inline]
fn layered_moore_index(l: &Lattice, c: &Wrapped) -> usize {
    let s = |x, y, z| l.get(x, y, z) as usize;
    // bottom layer
    s(c.x, c.ym, c.zm)
        | s(c.xm, c.y, c.zm) << 1
        | s(c.x, c.y, c.zm) << 2
        | s(c.xp, c.y, c.zm) << 3
        | s(c.x, c.yp, c.zm) << 4
        // middle layer
        | s(c.xm, c.ym, c.z) << 5
        | s(c.x, c.ym, c.z) << 6
        | s(c.xp, c.ym, c.z) << 7
        | s(c.xm, c.y, c.z) << 8
        | s(c.x, c.y, c.z) << 9
        | s(c.xp, c.y, c.z) << 10
        | s(c.xm, c.yp, c.z) << 11
        | s(c.x, c.yp, c.z) << 12
        | s(c.xp, c.yp, c.z) << 13
        // top layer
        | s(c.x, c.ym, c.zp) << 14
        | s(c.xm, c.y, c.zp) << 15
        | s(c.x, c.y, c.zp) << 16
        | s(c.xp, c.y, c.zp) << 17
        | s(c.x, c.yp, c.zp) << 18
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Topology; 3] = [
        Topology::VonNeumann,
        Topology::ReducedMoore,
        Topology::LayeredMoore,
    ];

    fn lattice_with(cells: &[(usize, usize, usize)], size: usize) -> Lattice {
        let mut lattice = Lattice::new(size, size, size);
        for &(x, y, z) in cells {
            lattice.set(x, y, z, 1);
        }
        lattice
    }

    #[test]
    fn test_center_bit_matches_layout() {
        for topology in ALL {
            let lattice = lattice_with(&[(2, 2, 2)], 5);
            assert_eq!(
                topology.index(&lattice, 2, 2, 2),
                1 << topology.center_bit(),
                "{:?}",
                topology
            );
        }
    }

    #[test]
    fn test_full_neighborhood_sets_every_bit() {
        for topology in ALL {
            let mut lattice = Lattice::new(4, 4, 4);
            lattice.fill(1);
            assert_eq!(topology.index(&lattice, 0, 0, 0), topology.states() - 1);
        }
    }

    #[test]
    fn test_empty_neighborhood_is_zero() {
        for topology in ALL {
            let lattice = Lattice::new(4, 4, 4);
            assert_eq!(topology.index(&lattice, 1, 2, 3), 0);
        }
    }

    #[test]
    fn test_wraparound_minus_side() {
        // x-1 of x=0 is x=size-1
        let lattice = lattice_with(&[(4, 0, 0)], 5);
        assert_eq!(Topology::ReducedMoore.index(&lattice, 0, 0, 0), 1 << 0);
        assert_eq!(Topology::VonNeumann.index(&lattice, 0, 0, 0), 1 << 5);
        assert_eq!(Topology::LayeredMoore.index(&lattice, 0, 0, 0), 1 << 8);
    }

    #[test]
    fn test_wraparound_plus_side() {
        // x+1 of x=size-1 is x=0
        let lattice = lattice_with(&[(0, 0, 0)], 5);
        assert_eq!(Topology::ReducedMoore.index(&lattice, 4, 0, 0), 1 << 1);
        assert_eq!(Topology::VonNeumann.index(&lattice, 4, 0, 0), 1 << 6);
        assert_eq!(Topology::LayeredMoore.index(&lattice, 4, 0, 0), 1 << 10);
    }

    #[test]
    fn test_reduced_moore_edge_bits() {
        let lattice = lattice_with(&[(1, 3, 2), (2, 1, 1)], 5);
        // (x-1, y+1, z) -> bit 7, (x, y-1, z-1) -> bit 14
        assert_eq!(
            Topology::ReducedMoore.index(&lattice, 2, 2, 2),
            (1 << 7) | (1 << 14)
        );
    }

    #[test]
    fn test_layered_moore_layers() {
        let lattice = lattice_with(&[(2, 2, 1), (3, 3, 2), (2, 3, 3)], 5);
        // bottom center -> 2, middle x+y+ -> 13, top y+ -> 18
        assert_eq!(
            Topology::LayeredMoore.index(&lattice, 2, 2, 2),
            (1 << 2) | (1 << 13) | (1 << 18)
        );
    }

    #[test]
    fn test_corners_are_ignored() {
        // (x+1, y+1, z+1) is not part of any supported neighborhood
        let lattice = lattice_with(&[(3, 3, 3)], 5);
        for topology in ALL {
            assert_eq!(topology.index(&lattice, 2, 2, 2), 0);
        }
    }
}
