//! Simulation session - one previewed rule running on its own lattice.
//!
//! A session owns its lattice and rule table. Stepping replaces the lattice
//! wholesale; the rule table is rebuilt only through [`SimulationSession::set_genome`].

use rand::Rng;

use crate::schema::{ConfigError, GenomeFamily, Seed, SimulationConfig, Topology};

use super::{Genome, Lattice, LatticeStats, RuleError, RuleTable};

/// Result of advancing a session by one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Generation reached by this step.
    pub generation: u64,
    /// Live cells in the new generation.
    pub alive: usize,
    /// Cells that changed state during this step.
    pub flicker: usize,
}

/// Errors raised while building a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Lattice plus rule table driven by explicit steps or an external ticker.
#[derive(Debug, Clone)]
pub struct SimulationSession {
    lattice: Lattice,
    table: RuleTable,
    topology: Topology,
    family: GenomeFamily,
    generation: u64,
    running: bool,
}

impl SimulationSession {
    /// Create a session running `genome` from `seed`.
    pub fn new(config: &SimulationConfig, genome: &Genome, seed: &Seed) -> Result<Self, SessionError> {
        config.validate()?;
        let table = RuleTable::from_genome(genome, config.family, config.topology)?;
        Ok(Self::with_table(Lattice::from_seed(seed, config), table, config.family))
    }

    /// Create a session from a prepared lattice and table.
    pub fn with_table(lattice: Lattice, table: RuleTable, family: GenomeFamily) -> Self {
        Self {
            topology: table.topology(),
            lattice,
            table,
            family,
            generation: 0,
            running: false,
        }
    }

    /// Replace the rule. The table is rebuilt before the next step.
    pub fn set_genome(&mut self, genome: &Genome) -> Result<(), RuleError> {
        self.table = RuleTable::from_genome(genome, self.family, self.topology)?;
        Ok(())
    }

    /// Reset the lattice from `seed` and restart the generation count.
    pub fn reseed(&mut self, seed: &Seed) {
        let cells = seed.generate(self.lattice.width, self.lattice.height, self.lattice.depth);
        self.replace_cells(cells);
    }

    /// Reset the lattice from `seed` drawing randomness from `rng`.
    pub fn reseed_with_rng<R: Rng + ?Sized>(&mut self, seed: &Seed, rng: &mut R) {
        let cells =
            seed.generate_with_rng(self.lattice.width, self.lattice.height, self.lattice.depth, rng);
        self.replace_cells(cells);
    }

    fn replace_cells(&mut self, cells: Vec<u8>) {
        self.lattice = Lattice::from_cells(
            cells,
            self.lattice.width,
            self.lattice.height,
            self.lattice.depth,
        );
        self.generation = 0;
    }

    /// Advance one generation.
    pub fn step(&mut self) -> StepReport {
        let next = self.lattice.step(&self.table);
        let flicker = next.flicker(&self.lattice);
        self.lattice = next;
        self.generation += 1;

        StepReport {
            generation: self.generation,
            alive: self.lattice.alive_count(),
            flicker,
        }
    }

    /// Advance `count` generations, returning the last report.
    pub fn step_n(&mut self, count: usize) -> Option<StepReport> {
        (0..count).map(|_| self.step()).last()
    }

    /// Arm the tick source. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        !std::mem::replace(&mut self.running, true)
    }

    /// Disarm the tick source. Returns false if it was already stopped.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Whether ticks currently advance the session.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Called by the host's periodic scheduler; steps only while running.
    pub fn tick(&mut self) -> Option<StepReport> {
        self.running.then(|| self.step())
    }

    /// Current lattice.
    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Current rule table.
    #[inline]
    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Generations stepped since the last reseed.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Summary of the current generation.
    pub fn stats(&self) -> LatticeStats {
        LatticeStats::from_lattice(&self.lattice)
    }

    /// X-by-Y live-cell matrix of slice `z`.
    pub fn z_slice(&self, z: usize) -> Vec<Vec<bool>> {
        self.lattice.z_slice(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig {
            width: 6,
            height: 6,
            depth: 6,
            topology: Topology::VonNeumann,
            family: GenomeFamily::CompactVonNeumann,
        }
    }

    fn blinker_genome() -> Genome {
        // every dead cell is born, every live cell dies
        Genome::parse_rule_str("11111110000000", 14)
    }

    #[test]
    fn test_step_reports_counts() {
        let mut session =
            SimulationSession::new(&config(), &blinker_genome(), &Seed::center()).unwrap();
        let report = session.step();

        assert_eq!(report.generation, 1);
        assert_eq!(report.alive, 215);
        assert_eq!(report.flicker, 216);
        assert_eq!(session.step().alive, 1);
    }

    #[test]
    fn test_step_n_returns_last_report() {
        let mut session =
            SimulationSession::new(&config(), &blinker_genome(), &Seed::center()).unwrap();
        let report = session.step_n(4).unwrap();
        assert_eq!(report.generation, 4);
        assert_eq!(report.alive, 1);
        assert!(session.step_n(0).is_none());
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut session =
            SimulationSession::new(&config(), &blinker_genome(), &Seed::center()).unwrap();

        assert!(session.tick().is_none());
        assert!(session.start());
        assert!(!session.start());
        assert!(session.tick().is_some());
        assert!(session.stop());
        assert!(!session.stop());
        assert!(session.tick().is_none());
        assert_eq!(session.generation(), 1);
    }

    #[test]
    fn test_set_genome_rebuilds_table() {
        let mut session =
            SimulationSession::new(&config(), &blinker_genome(), &Seed::center()).unwrap();
        session.set_genome(&Genome::zeros(14)).unwrap();
        assert_eq!(session.step().alive, 0);
        assert!(session.set_genome(&Genome::zeros(38)).is_err());
    }

    #[test]
    fn test_reseed_resets_generation() {
        let mut session =
            SimulationSession::new(&config(), &blinker_genome(), &Seed::center()).unwrap();
        session.step_n(3);
        session.reseed(&Seed::random(1.0, Some(1)));
        assert_eq!(session.generation(), 0);
        assert_eq!(session.stats().alive, 216);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config();
        bad.family = GenomeFamily::Direct;
        assert!(matches!(
            SimulationSession::new(&bad, &blinker_genome(), &Seed::center()),
            Err(SessionError::Config(_))
        ));
    }
}
