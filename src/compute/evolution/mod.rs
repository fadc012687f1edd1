//! Evolutionary rule discovery.
//!
//! # Overview
//!
//! - **Genomes** (`genome`): bit-packed rules, random generation, crossover
//!   and mutation driven by a seeded [`GenomeRng`].
//! - **Populations** (`population`): fixed-size genome sets with
//!   index-aligned fitness, incremented by selection events.
//! - **Search** (`search`): one cycle keeps the top half by fitness, pairs
//!   survivors at random and appends two crossover children per pair.
//! - **Fitness** (`fitness`): automatic activity scoring for unattended runs.
//! - **Persistence** (`store`): best-effort population storage.
//!
//! # Example
//!
//! ```rust,no_run
//! use ca3d_evolve::compute::evolution::{EvolutionEngine, GenomeRng, Population};
//! use ca3d_evolve::schema::{EvolutionConfig, GenomeFamily};
//!
//! let config = EvolutionConfig::default();
//! let mut rng = GenomeRng::new(7);
//! let mut population =
//!     Population::random(GenomeFamily::CompactMoore, 200, 0.5, &mut rng).unwrap();
//!
//! // a user liked genomes 3 and 17
//! population.record_selection(3).unwrap();
//! population.record_selection(17).unwrap();
//!
//! let mut engine = EvolutionEngine::from_config(&config).unwrap();
//! let (next, report) = engine.evolve(&population).unwrap();
//! println!("Generation {}: {} genomes mutated", report.generation, report.mutated_genomes);
//! assert_eq!(next.len(), 200);
//! ```

mod fitness;
mod genome;
mod population;
mod search;
mod store;

pub use fitness::{ActivityFitness, ActivityReport};
pub use genome::{Genome, GenomeError, GenomeRng, genome_distance};
pub use population::{Population, PopulationError, rank_by_fitness};
pub use search::{CycleReport, EvolutionEngine, EvolutionHistory};
pub use store::{
    GenomeRecord, JsonDirStore, MemoryStore, PopulationMeta, PopulationStore, RestoredPopulation,
    StoreError, StoredPopulation, restore_population,
};
