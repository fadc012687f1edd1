//! 3D binary cellular automata with evolutionary rule search.
//!
//! Candidate rules are encoded as bit genomes, expanded into lookup tables
//! and run on a toroidal lattice. A population of genomes is evolved by
//! truncation selection, uniform crossover and bit-flip mutation, with fitness
//! supplied by a human picking interesting previews or by an activity metric.
//!
//! # Architecture
//!
//! - `schema`: configuration, seeding and file-format types
//! - `compute`: neighborhood indexing, rule tables, lattice stepping,
//!   sampling and the `evolution` engine
//! - `explorer`: preview-select-evolve control surface
//!
//! # Example
//!
//! ```rust,no_run
//! use ca3d_evolve::{
//!     compute::{Genome, SimulationSession},
//!     schema::{GenomeFamily, Seed, SimulationConfig, Topology},
//! };
//!
//! let config = SimulationConfig {
//!     width: 32,
//!     height: 32,
//!     depth: 32,
//!     topology: Topology::VonNeumann,
//!     family: GenomeFamily::CompactVonNeumann,
//! };
//!
//! // born with one or two live neighbors, survive with three
//! let genome = Genome::parse_rule_str("01100000001000", 14);
//! let mut session = SimulationSession::new(&config, &genome, &Seed::center()).unwrap();
//!
//! let report = session.step_n(20).unwrap();
//! println!("Generation {}: {} alive", report.generation, report.alive);
//! ```

pub mod compute;
pub mod explorer;
pub mod schema;

// Re-export commonly used types
pub use compute::{Genome, Lattice, RuleTable, SimulationSession};
pub use explorer::{Explorer, LoadOutcome};
pub use schema::{EvolutionConfig, Seed, SimulationConfig, Topology};
