//! Interactive exploration: preview a handful of genomes, let a user pick the
//! interesting ones, evolve.
//!
//! The explorer owns the population, the evolution engine, one
//! [`SimulationSession`] per preview slot and a [`PopulationStore`]. Storage is
//! best-effort: failures are logged and reported, never raised.

use log::{info, warn};

use crate::compute::evolution::{
    ActivityFitness, CycleReport, EvolutionEngine, Population, PopulationError, PopulationStore, StoreError,
    restore_population,
};
use crate::compute::{Lattice, RuleError, RuleTable, SimulationSession, StepReport};
use crate::schema::{ConfigError, EvolutionConfig, MutationConfig, Pattern, Seed};

/// One previewed genome.
#[derive(Debug, Clone)]
pub struct PreviewSlot {
    /// Index of the genome in the population.
    pub genome_index: usize,
    pub session: SimulationSession,
    pub selected: bool,
}

/// What [`Explorer::load_population`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored population was adopted.
    Restored,
    /// Nothing was stored; the current population was saved instead.
    Empty,
    /// Stored data did not match the configuration; a fresh population replaced it.
    Rejected(String),
    /// Storage failed; the in-memory population is unchanged.
    Unavailable(String),
}

/// Explorer errors.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Population(#[from] PopulationError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error("Preview slot {slot} out of range ({len} slots)")]
    SlotOutOfRange { slot: usize, len: usize },
    #[error("Z-slice {z} out of range for depth {depth}")]
    ZSliceOutOfRange { z: usize, depth: usize },
}

/// Population, previews and controls of one exploration run.
pub struct Explorer<S: PopulationStore> {
    config: EvolutionConfig,
    population: Population,
    engine: EvolutionEngine,
    store: S,
    /// Genome indices not yet previewed since the last refill.
    deck: Vec<usize>,
    previews: Vec<PreviewSlot>,
    seed: Seed,
    z_slice: usize,
    running: bool,
    steps: u64,
    selections: usize,
}

impl<S: PopulationStore> Explorer<S> {
    /// Start with a fresh random population (the store is not touched).
    pub fn new(config: EvolutionConfig, store: S) -> Result<Self, ExplorerError> {
        config.validate()?;
        let mut engine = EvolutionEngine::from_config(&config)?;
        let population = Population::random(
            config.family(),
            config.population_size,
            config.genome_density,
            engine.rng_mut(),
        )?;

        let seed = Seed::random(0.5, None);
        let mut explorer = Self {
            config,
            population,
            engine,
            store,
            deck: Vec::new(),
            previews: Vec::new(),
            seed,
            z_slice: 0,
            running: false,
            steps: 0,
            selections: 0,
        };
        explorer.deal_previews()?;
        Ok(explorer)
    }

    /// Replace the population with fresh random genomes.
    ///
    /// `density` outside (0, 1) falls back to the configured genome density.
    /// The store is cleared and the new population saved.
    pub fn new_population(&mut self, density: Option<f64>) -> Result<(), ExplorerError> {
        let density = density
            .filter(|d| *d > 0.0 && *d < 1.0)
            .unwrap_or(self.config.genome_density);
        self.population = Population::random(
            self.config.family(),
            self.config.population_size,
            density,
            self.engine.rng_mut(),
        )?;
        info!(
            "New population of {} genomes (density {:.3})",
            self.population.len(),
            density
        );

        if let Err(e) = self.store.clear() {
            warn!("Could not clear stored population: {}", e);
        }
        self.save_population();
        self.selections = 0;
        self.deal_previews()
    }

    /// Run one evolutionary cycle with the given mutation settings.
    pub fn evolve(
        &mut self,
        mutation_percent: f64,
        max_genes: usize,
    ) -> Result<CycleReport, ExplorerError> {
        self.stop();
        self.engine
            .set_mutation(MutationConfig::new(mutation_percent, max_genes))?;
        let (next, report) = self.engine.evolve(&self.population)?;
        self.population = next;
        self.save_population();
        self.selections = 0;
        self.deal_previews()?;
        Ok(report)
    }

    /// Award one selection to genome `genome_index`.
    pub fn record_selection(&mut self, genome_index: usize) -> Result<u32, ExplorerError> {
        let score = self.population.record_selection(genome_index)?;
        self.save_fitness();
        Ok(score)
    }

    /// Score every genome with the configured activity metric.
    ///
    /// Returns the number of genomes awarded a point.
    pub fn score_activity(&mut self) -> Result<usize, ExplorerError> {
        let fitness = ActivityFitness::new(self.config.fitness.clone());
        let awarded = fitness.score(
            &mut self.population,
            self.config.simulation.topology,
            self.engine.rng_mut(),
        )?;
        self.save_fitness();
        Ok(awarded)
    }

    /// Flip the selected mark of preview `slot`. Returns the new mark.
    pub fn toggle_preview(&mut self, slot: usize) -> Result<bool, ExplorerError> {
        let len = self.previews.len();
        let preview = self
            .previews
            .get_mut(slot)
            .ok_or(ExplorerError::SlotOutOfRange { slot, len })?;
        preview.selected = !preview.selected;
        Ok(preview.selected)
    }

    /// Award +1 to every selected preview's genome, then deal new previews.
    ///
    /// Returns the awarded genome indices.
    pub fn commit_selection(&mut self) -> Result<Vec<usize>, ExplorerError> {
        self.stop();
        let awarded: Vec<usize> = self
            .previews
            .iter()
            .filter(|p| p.selected)
            .map(|p| p.genome_index)
            .collect();
        for &index in &awarded {
            self.population.record_selection(index)?;
        }
        self.save_fitness();
        self.selections += 1;
        self.deal_previews()?;
        Ok(awarded)
    }

    /// Advance every preview one generation.
    pub fn step(&mut self) -> Vec<StepReport> {
        self.steps += 1;
        self.previews.iter_mut().map(|p| p.session.step()).collect()
    }

    /// Stop the ticker and advance every preview `count` generations.
    pub fn step_n(&mut self, count: usize) -> Vec<StepReport> {
        self.stop();
        let mut reports = Vec::new();
        for _ in 0..count {
            reports = self.step();
        }
        reports
    }

    /// Arm the ticker. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    /// Disarm the ticker. Returns false if it was already stopped.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Called by the host scheduler; steps only while running.
    pub fn tick(&mut self) -> Option<Vec<StepReport>> {
        if self.running {
            Some(self.step())
        } else {
            None
        }
    }

    /// Choose the rendered z-slice.
    pub fn set_z_slice(&mut self, z: usize) -> Result<(), ExplorerError> {
        let depth = self.config.simulation.depth;
        if z >= depth {
            return Err(ExplorerError::ZSliceOutOfRange { z, depth });
        }
        self.z_slice = z;
        Ok(())
    }

    pub fn z_slice(&self) -> usize {
        self.z_slice
    }

    /// X-by-Y live-cell matrix of preview `slot` at the current z-slice.
    pub fn z_slice_view(&self, slot: usize) -> Result<Vec<Vec<bool>>, ExplorerError> {
        self.previews
            .get(slot)
            .map(|p| p.session.z_slice(self.z_slice))
            .ok_or(ExplorerError::SlotOutOfRange {
                slot,
                len: self.previews.len(),
            })
    }

    /// Reset every preview lattice from `seed`, keeping the shown genomes.
    ///
    /// Center seeding moves the z-slice to the middle of the lattice.
    pub fn reseed(&mut self, seed: Seed) {
        self.stop();
        if matches!(seed.pattern, Pattern::Center) {
            self.z_slice = self.config.simulation.depth / 2;
        }
        self.seed = seed;
        self.steps = 0;
        for preview in self.previews.iter_mut() {
            preview
                .session
                .reseed_with_rng(&self.seed, self.engine.rng_mut().rng_mut());
        }
    }

    /// Adopt the stored population if it matches the configuration.
    pub fn load_population(&mut self) -> LoadOutcome {
        let outcome = match restore_population(
            &self.store,
            self.config.family(),
            self.config.simulation.topology,
            self.config.population_size,
        ) {
            Ok(Some(restored)) => {
                info!(
                    "Restored population of {} genomes",
                    restored.population.len()
                );
                self.population = restored.population;
                if restored.fitness_reset {
                    self.save_fitness();
                }
                LoadOutcome::Restored
            }
            Ok(None) => {
                info!("No stored population, saving the current one");
                self.save_population();
                LoadOutcome::Empty
            }
            Err(StoreError::Mismatch(reason)) => {
                warn!("Rejected stored population: {}", reason);
                if let Err(e) = self.new_population(None) {
                    warn!("Could not regenerate population: {}", e);
                }
                LoadOutcome::Rejected(reason)
            }
            Err(e) => {
                warn!("Population storage unavailable: {}", e);
                LoadOutcome::Unavailable(e.to_string())
            }
        };

        if outcome == LoadOutcome::Restored
            && let Err(e) = self.deal_previews()
        {
            warn!("Could not rebuild previews: {}", e);
        }
        outcome
    }

    /// Write genomes, header and fitness. Returns false on failure.
    pub fn save_population(&mut self) -> bool {
        match self
            .store
            .save(&self.population, self.config.simulation.topology)
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not save population: {}", e);
                false
            }
        }
    }

    fn save_fitness(&mut self) -> bool {
        match self.store.save_fitness(self.population.fitness()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not save fitness: {}", e);
                false
            }
        }
    }

    /// Next genome index from the preview deck, refilling it when exhausted.
    fn draw_index(&mut self) -> usize {
        if self.deck.is_empty() {
            self.deck = (0..self.population.len()).collect();
        }
        let pick = self.engine.rng_mut().index(self.deck.len());
        self.deck.remove(pick)
    }

    /// Choose new preview genomes and seed fresh lattices for them.
    fn deal_previews(&mut self) -> Result<(), ExplorerError> {
        self.stop();
        self.steps = 0;
        let simulation = self.config.simulation.clone();

        let mut previews = Vec::with_capacity(self.config.preview_count);
        for _ in 0..self.config.preview_count {
            let genome_index = self.draw_index();
            let genome = &self.population.genomes()[genome_index];
            let table = RuleTable::from_genome(genome, simulation.family, simulation.topology)?;
            let cells = self.seed.generate_with_rng(
                simulation.width,
                simulation.height,
                simulation.depth,
                self.engine.rng_mut().rng_mut(),
            );
            let lattice = Lattice::from_cells(
                cells,
                simulation.width,
                simulation.height,
                simulation.depth,
            );
            previews.push(PreviewSlot {
                genome_index,
                session: SimulationSession::with_table(lattice, table, simulation.family),
                selected: false,
            });
        }
        self.previews = previews;
        Ok(())
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn previews(&self) -> &[PreviewSlot] {
        &self.previews
    }

    pub fn engine(&self) -> &EvolutionEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generations stepped since the previews were dealt or reseeded.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Selection rounds committed since the last cycle.
    pub fn selections(&self) -> usize {
        self.selections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::{Genome, MemoryStore, PopulationMeta, StoredPopulation};
    use crate::schema::{GenomeFamily, SimulationConfig, Topology};

    fn config() -> EvolutionConfig {
        EvolutionConfig {
            simulation: SimulationConfig {
                width: 6,
                height: 6,
                depth: 6,
                topology: Topology::VonNeumann,
                family: GenomeFamily::CompactVonNeumann,
            },
            population_size: 8,
            preview_count: 3,
            random_seed: Some(11),
            ..Default::default()
        }
    }

    fn explorer() -> Explorer<MemoryStore> {
        Explorer::new(config(), MemoryStore::new()).unwrap()
    }

    /// Store whose every call fails.
    struct BrokenStore;

    impl PopulationStore for BrokenStore {
        fn save_population(&mut self, _: &PopulationMeta, _: &[Genome]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }
        fn save_fitness(&mut self, _: &[u32]) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }
        fn load(&self) -> Result<StoredPopulation, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }
        fn clear(&mut self) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }
    }

    #[test]
    fn test_previews_dealt_without_repeats() {
        let explorer = explorer();
        let mut shown: Vec<usize> = explorer.previews().iter().map(|p| p.genome_index).collect();
        assert_eq!(shown.len(), 3);
        shown.sort_unstable();
        shown.dedup();
        assert_eq!(shown.len(), 3);
    }

    #[test]
    fn test_deck_covers_population_before_refill() {
        let mut explorer = explorer();
        // 3 dealt at start + 3 + 2 of the next deal exhaust the 8-genome deck
        let mut seen: Vec<usize> = explorer.previews().iter().map(|p| p.genome_index).collect();
        explorer.commit_selection().unwrap();
        seen.extend(explorer.previews().iter().map(|p| p.genome_index));
        explorer.commit_selection().unwrap();
        seen.extend(explorer.previews().iter().take(2).map(|p| p.genome_index));
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_commit_awards_selected() {
        let mut explorer = explorer();
        assert!(explorer.toggle_preview(1).unwrap());
        let chosen = explorer.previews()[1].genome_index;

        let awarded = explorer.commit_selection().unwrap();
        assert_eq!(awarded, vec![chosen]);
        assert_eq!(explorer.population().fitness()[chosen], 1);
        assert_eq!(explorer.selections(), 1);
        assert!(explorer.previews().iter().all(|p| !p.selected));
        assert!(explorer.toggle_preview(3).is_err());
    }

    #[test]
    fn test_evolve_resets_fitness_and_persists() {
        let mut explorer = explorer();
        explorer.record_selection(2).unwrap();
        explorer.record_selection(5).unwrap();

        let report = explorer.evolve(10.0, 3).unwrap();
        assert_eq!(report.best_fitness, 1);
        assert_eq!(explorer.population().len(), 8);
        assert!(explorer.population().fitness().iter().all(|&f| f == 0));

        let stored = restore_population(
            explorer.store(),
            GenomeFamily::CompactVonNeumann,
            Topology::VonNeumann,
            8,
        )
        .unwrap()
        .unwrap();
        assert_eq!(&stored.population, explorer.population());
        assert!(explorer.evolve(0.0, 0).is_err());
    }

    #[test]
    fn test_score_activity_with_open_bands() {
        let mut config = config();
        config.fitness.edge = 5;
        config.fitness.steps = 2;
        config.fitness.alive_band = (0.0, 1.0);
        config.fitness.flicker_band = (0.0, 1.0);
        let mut explorer = Explorer::new(config, MemoryStore::new()).unwrap();

        assert_eq!(explorer.score_activity().unwrap(), 8);
        assert!(explorer.population().fitness().iter().all(|&f| f == 1));
        let stored = explorer.store().load().unwrap();
        assert_eq!(stored.fitness, Some(vec![1; 8]));
    }

    #[test]
    fn test_record_selection_out_of_range() {
        let mut explorer = explorer();
        assert!(matches!(
            explorer.record_selection(8),
            Err(ExplorerError::Population(PopulationError::IndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_new_population_density_fallback() {
        let mut explorer = explorer();
        explorer.record_selection(0).unwrap();
        explorer.new_population(Some(1.5)).unwrap();
        assert!(explorer.population().fitness().iter().all(|&f| f == 0));

        explorer.new_population(Some(0.999_999)).unwrap();
        assert!(explorer.population().mean_density() > 0.9);
    }

    #[test]
    fn test_ticker_and_steps() {
        let mut explorer = explorer();
        assert!(explorer.tick().is_none());
        assert!(explorer.start());
        assert!(!explorer.start());
        assert_eq!(explorer.tick().unwrap().len(), 3);
        assert_eq!(explorer.step_n(4).len(), 3);
        assert!(!explorer.is_running());
        assert_eq!(explorer.steps(), 5);
        assert_eq!(explorer.previews()[0].session.generation(), 5);
    }

    #[test]
    fn test_z_slice_bounds_and_center_reseed() {
        let mut explorer = explorer();
        assert!(explorer.set_z_slice(5).is_ok());
        assert!(matches!(
            explorer.set_z_slice(6),
            Err(ExplorerError::ZSliceOutOfRange { z: 6, depth: 6 })
        ));

        explorer.reseed(Seed::center());
        assert_eq!(explorer.z_slice(), 3);
        let view = explorer.z_slice_view(0).unwrap();
        assert_eq!(view.len(), 6);
        assert!(view[3][3]);
        assert_eq!(view.iter().flatten().filter(|&&v| v).count(), 1);
    }

    #[test]
    fn test_load_round_trip() {
        let mut first = explorer();
        first.record_selection(4).unwrap();
        assert!(first.save_population());
        let store = first.store().clone();

        let mut second = Explorer::new(config(), store).unwrap();
        assert_eq!(second.load_population(), LoadOutcome::Restored);
        assert_eq!(second.population(), first.population());
    }

    #[test]
    fn test_load_rejects_size_mismatch() {
        let mut first = explorer();
        assert!(first.save_population());

        let mut other = config();
        other.population_size = 12;
        let mut second = Explorer::new(other, first.store().clone()).unwrap();

        assert!(matches!(second.load_population(), LoadOutcome::Rejected(_)));
        assert_eq!(second.population().len(), 12);
        assert_eq!(second.load_population(), LoadOutcome::Restored);
    }

    #[test]
    fn test_load_rejects_genomes_longer_than_header() {
        let mut store = MemoryStore::new();
        let meta = PopulationMeta {
            population_size: 8,
            genome_length: 14,
            in_storage: true,
            topology: Some(Topology::VonNeumann),
        };
        let long: Vec<Genome> = (0..8).map(|_| Genome::zeros(38)).collect();
        store.save_population(&meta, &long).unwrap();

        let mut explorer = Explorer::new(config(), store).unwrap();
        assert!(matches!(explorer.load_population(), LoadOutcome::Rejected(_)));
        assert!(explorer.population().genomes().iter().all(|g| g.len() == 14));
        assert_eq!(explorer.load_population(), LoadOutcome::Restored);
    }

    #[test]
    fn test_load_repairs_stored_fitness() {
        let mut first = explorer();
        assert!(first.save_population());
        let mut store = first.store().clone();
        store.save_fitness(&[5, 5]).unwrap();

        let mut second = Explorer::new(config(), store).unwrap();
        assert_eq!(second.load_population(), LoadOutcome::Restored);
        assert!(second.population().fitness().iter().all(|&f| f == 0));
        assert_eq!(second.store().load().unwrap().fitness, Some(vec![0; 8]));
    }

    #[test]
    fn test_empty_store_saves_current() {
        let mut explorer = explorer();
        assert_eq!(explorer.load_population(), LoadOutcome::Empty);
        assert_eq!(explorer.load_population(), LoadOutcome::Restored);
    }

    #[test]
    fn test_broken_store_is_not_fatal() {
        let mut explorer = Explorer::new(config(), BrokenStore).unwrap();
        let before = explorer.population().clone();

        assert!(matches!(explorer.load_population(), LoadOutcome::Unavailable(_)));
        assert_eq!(explorer.population(), &before);
        assert!(!explorer.save_population());
        explorer.record_selection(1).unwrap();
        explorer.new_population(None).unwrap();
        explorer.evolve(10.0, 2).unwrap();
    }
}
