//! Run configuration.

use std::time::Duration;

use crate::error::ConfigError;
use crate::simulation::{Action, GameSettings};

/// Default ring slots reserved per worker.
pub const DEFAULT_BUFFER_PER_WORKER: usize = 1000;
/// Default pause before a worker told to WAIT asks again.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(100);
/// Default number of fresh games tried before pre-actions are declared degenerate.
pub const DEFAULT_MAX_REGENERATIONS: u32 = 10_000;

/// Everything the dispatch controller and worker pool need to know.
///
/// Build with struct update syntax over [`RunConfig::default`]:
/// ```
/// use bulk::{GameSettings, RunConfig};
///
/// let config = RunConfig {
///     seed: 195_971_295,
///     settings: GameSettings::EXPERT,
///     workers: 8,
///     ..Default::default()
/// };
/// assert_eq!(config.capacity(), 8_000);
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Seed of the episode generator; the same seed yields the same episodes
    /// in the same order regardless of worker count.
    pub seed: u64,
    pub settings: GameSettings,
    /// Number of worker threads.
    pub workers: usize,
    /// Ring capacity is `workers * buffer_per_worker`.
    pub buffer_per_worker: usize,
    /// Maximum pause of a waiting worker; drains wake it early.
    pub wait_interval: Duration,
    /// Fresh games tried per dispatch when pre-actions keep ending them.
    pub max_regenerations: u32,
    /// Fixed opening actions applied to every generated game.
    pub pre_actions: Vec<Action>,
    /// Record guess positions for state-frequency analysis.
    pub capture_decisions: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            seed: 0,
            settings: GameSettings::EXPERT,
            workers: num_cpus::get().max(1),
            buffer_per_worker: DEFAULT_BUFFER_PER_WORKER,
            wait_interval: DEFAULT_WAIT_INTERVAL,
            max_regenerations: DEFAULT_MAX_REGENERATIONS,
            pre_actions: Vec::new(),
            capture_decisions: false,
        }
    }
}

impl RunConfig {
    /// Number of slots in the ring buffer.
    pub fn capacity(&self) -> usize {
        self.workers * self.buffer_per_worker
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.buffer_per_worker == 0 {
            return Err(ConfigError::NoBuffer);
        }
        if self.capacity() < 2 {
            return Err(ConfigError::CapacityTooSmall(self.capacity()));
        }
        self.settings.validate()?;
        for action in &self.pre_actions {
            let location = action.location;
            if location.x >= self.settings.width || location.y >= self.settings.height {
                return Err(ConfigError::PreActionOutOfBounds {
                    x: location.x,
                    y: location.y,
                    width: self.settings.width,
                    height: self.settings.height,
                });
            }
        }
        Ok(())
    }
}
