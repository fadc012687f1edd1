//! Compute module - lattice stepping, rule expansion and evolution.

mod lattice;
mod neighborhood;
mod rule_table;
mod sampling;
mod session;

pub mod evolution;

pub use evolution::{Genome, GenomeRng};
pub use lattice::*;
pub use rule_table::*;
pub use sampling::*;
pub use session::*;
