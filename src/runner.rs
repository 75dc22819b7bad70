//! # Bulk Runner
//!
//! Wires a [`DispatchController`] and a worker pool together for one run.
//!
//! ```text
//!   BulkRunner::new(config, factory, solvers, consumer, predicate)
//!        │ validate
//!        ├── run()   ── blocks the caller ─────────────► RunReport
//!        └── start() ── spawns "bulk-runner" thread ──► RunHandle
//!                          │ report().await   (report as soon as the last worker stops)
//!                          │ request_stop()   (no new episodes, in-flight ones finish)
//!                          └ join()           ──────────► RunReport
//! ```
//!
//! A run ends when the termination predicate holds, when a stop is
//! requested, or when the pre-actions turn out to end every game. In all three
//! cases the report is delivered exactly once.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::{error, info};

use crate::config::RunConfig;
use crate::consumer::{Consumer, ReportLatch, TerminationPredicate};
use crate::controller::{DispatchController, RunStats};
use crate::error::BulkError;
use crate::simulation::SimulationFactory;
use crate::solver::SolverFactory;
use crate::worker::{run_pool, WorkerSummary};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport<C> {
    /// The consumer's rendered report, as delivered by the last worker.
    pub report: String,
    pub stats: RunStats,
    pub workers: Vec<WorkerSummary>,
    pub elapsed: Duration,
    /// The consumer itself, for callers that want more than the text report.
    pub consumer: C,
}

/// A configured run, ready to start.
pub struct BulkRunner<F: SimulationFactory, C: Consumer> {
    config: RunConfig,
    factory: F,
    solvers: SolverFactory<F::Game>,
    consumer: C,
    predicate: TerminationPredicate<C>,
    stop_requested: Arc<AtomicBool>,
}

impl<F: SimulationFactory, C: Consumer> BulkRunner<F, C> {
    /// Validates `config` and prepares a run. No thread is started yet.
    ///
    /// # Arguments
    /// * `config` - Seed, board, worker count and buffering
    /// * `factory` - Creates a fresh simulation for every episode
    /// * `solvers` - Creates a fresh solver for every episode
    /// * `consumer` - Receives results in sequence order
    /// * `predicate` - Ends the run once it holds for the consumer
    pub fn new(
        config: RunConfig,
        factory: F,
        solvers: SolverFactory<F::Game>,
        consumer: C,
        predicate: TerminationPredicate<C>,
    ) -> Result<Self, BulkError> {
        config.validate()?;
        Ok(BulkRunner {
            config,
            factory,
            solvers,
            consumer,
            predicate,
            stop_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Runs to completion on the calling thread.
    pub fn run(self) -> Result<RunReport<C>, BulkError> {
        let (latch, mut receiver) = ReportLatch::new(self.config.workers);
        let finished = self.execute(&latch)?;
        let report = receiver.try_recv().map_err(|_| BulkError::ReportLost)?;
        Ok(finished.into_report(report))
    }

    /// Starts the run on a background thread and returns immediately.
    pub fn start(self) -> Result<RunHandle<C>, BulkError>
    where
        F: 'static,
        C: 'static,
    {
        let stop_requested = self.stop_requested.clone();
        let (latch, receiver) = ReportLatch::new(self.config.workers);
        let thread = thread::Builder::new()
            .name("bulk-runner".to_string())
            .spawn(move || self.execute(&latch))?;

        Ok(RunHandle { stop_requested, thread, receiver, delivered: None })
    }

    fn execute(self, latch: &ReportLatch) -> Result<Finished<C>, BulkError> {
        let BulkRunner { config, factory, solvers, consumer, predicate, stop_requested } = self;
        info!(
            settings = %config.settings,
            seed = config.seed,
            workers = config.workers,
            pre_actions = config.pre_actions.len(),
            "Starting bulk run"
        );

        let started = Instant::now();
        let controller = DispatchController::new(&config, factory, consumer, predicate, stop_requested)?;
        let workers = panic::catch_unwind(AssertUnwindSafe(|| run_pool(&controller, &solvers, &config, latch)))
            .map_err(|_| {
                error!("Worker pool panicked");
                BulkError::WorkerPanicked
            })??;
        let elapsed = started.elapsed();

        let (consumer, stats) = controller.into_parts();
        info!(
            completed = stats.completed,
            abandoned = stats.abandoned,
            elapsed_ms = elapsed.as_millis() as u64,
            "Bulk run complete"
        );
        Ok(Finished { consumer, stats, workers, elapsed })
    }
}

/// A run state without the report text, which travels separately.
struct Finished<C> {
    consumer: C,
    stats: RunStats,
    workers: Vec<WorkerSummary>,
    elapsed: Duration,
}

impl<C> Finished<C> {
    fn into_report(self, report: String) -> RunReport<C> {
        RunReport {
            report,
            stats: self.stats,
            workers: self.workers,
            elapsed: self.elapsed,
            consumer: self.consumer,
        }
    }
}

/// A run in progress on its own thread.
pub struct RunHandle<C> {
    stop_requested: Arc<AtomicBool>,
    thread: JoinHandle<Result<Finished<C>, BulkError>>,
    receiver: oneshot::Receiver<String>,
    delivered: Option<String>,
}

impl<C> RunHandle<C> {
    /// Asks the controller to stop issuing episodes. Episodes already being
    /// played finish, but their results are no longer aggregated.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the report without blocking the executor.
    pub async fn report(&mut self) -> Result<String, BulkError> {
        if let Some(report) = &self.delivered {
            return Ok(report.clone());
        }
        let report = (&mut self.receiver).await.map_err(|_| BulkError::ReportLost)?;
        self.delivered = Some(report.clone());
        Ok(report)
    }

    /// Blocks until the run thread exits.
    pub fn join(mut self) -> Result<RunReport<C>, BulkError> {
        let finished = self.thread.join().map_err(|_| BulkError::WorkerPanicked)??;
        let report = match self.delivered.take() {
            Some(report) => report,
            None => self.receiver.try_recv().map_err(|_| BulkError::ReportLost)?,
        };
        Ok(finished.into_report(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::episodes_at_least;
    use crate::consumers::WinTally;
    use crate::error::ConfigError;
    use crate::games::minesweeper::{MinesweeperFactory, MinesweeperGame};
    use crate::simulation::{Action, GameSettings};
    use crate::solver::{LocalSolver, Solver};

    fn solvers() -> SolverFactory<MinesweeperGame> {
        Arc::new(|_: &MinesweeperGame| -> Box<dyn Solver<MinesweeperGame>> { Box::new(LocalSolver::new()) })
    }

    fn config(workers: usize) -> RunConfig {
        RunConfig {
            seed: 42,
            settings: GameSettings::BEGINNER,
            workers,
            buffer_per_worker: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_start() {
        let result = BulkRunner::new(
            RunConfig { workers: 0, ..config(1) },
            MinesweeperFactory,
            solvers(),
            WinTally::new(),
            episodes_at_least(10),
        );
        assert!(matches!(result, Err(BulkError::Config(ConfigError::NoWorkers))));
    }

    #[test]
    fn test_run_blocks_until_report() {
        let runner =
            BulkRunner::new(config(2), MinesweeperFactory, solvers(), WinTally::new(), episodes_at_least(40))
                .unwrap();
        let run = runner.run().unwrap();
        assert_eq!(run.consumer.played(), 40);
        assert_eq!(run.report, run.consumer.render_report());
        assert_eq!(run.workers.len(), 2);
    }

    #[test]
    fn test_win_count_independent_of_worker_count() {
        let play = |workers| {
            BulkRunner::new(config(workers), MinesweeperFactory, solvers(), WinTally::new(), episodes_at_least(60))
                .unwrap()
                .run()
                .unwrap()
                .consumer
        };
        assert_eq!(play(1), play(4));
    }

    #[test]
    fn test_degenerate_pre_actions_still_report() {
        let config = RunConfig {
            settings: GameSettings::new(3, 3, 8),
            pre_actions: vec![Action::clear(0, 0), Action::clear(2, 2)],
            max_regenerations: 3,
            ..config(2)
        };
        let run = BulkRunner::new(config, MinesweeperFactory, solvers(), WinTally::new(), episodes_at_least(10))
            .unwrap()
            .run()
            .unwrap();
        assert!(run.stats.halt.is_some());
        assert_eq!(run.consumer.played(), 0);
    }

    #[test]
    fn test_handle_stop_ends_unbounded_run() {
        let runner = BulkRunner::new(
            config(2),
            MinesweeperFactory,
            solvers(),
            WinTally::new(),
            Box::new(|_: &WinTally| false),
        )
        .unwrap();
        let handle = runner.start().unwrap();
        thread::sleep(Duration::from_millis(50));
        handle.request_stop();
        let run = handle.join().unwrap();
        assert_eq!(run.report, run.consumer.render_report());
    }
}
