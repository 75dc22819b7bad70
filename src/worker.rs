//! # Worker Pool
//!
//! A fixed set of workers, each running the same loop against the shared
//! [`DispatchController`]:
//!
//! ```text
//!        ┌───────────── next_work(previous) ─────────────┐
//!        ▼                                               │
//!   RUN ──► build solver ──► EpisodeDriver::play ──► FinishedEpisode
//!   WAIT ─► wait_for_progress(interval) ──────────────────┘
//!   STOP ─► leave loop ──► ReportLatch::worker_finished
//! ```
//!
//! Workers run on a dedicated rayon thread pool, one long-lived task per
//! thread, so the pool size is exactly the worker count. A worker only ever
//! holds one episode at a time and always hands it back before asking for the
//! next, so results flow back through the controller's critical section.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::consumer::{Consumer, EpisodeResult, MoveEvent, ReportLatch};
use crate::controller::{Assignment, DispatchController, FinishedEpisode, WorkItem};
use crate::driver::EpisodeDriver;
use crate::error::{BulkError, DriverError};
use crate::simulation::{Simulation, SimulationFactory};
use crate::solver::SolverFactory;

/// Per-worker counters, logged when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub index: usize,
    pub episodes: u64,
    pub abandoned: u64,
    pub waits: u64,
}

/// One worker of the pool.
pub struct Worker<'a, F: SimulationFactory, C: Consumer> {
    index: usize,
    controller: &'a DispatchController<F, C>,
    solvers: &'a SolverFactory<F::Game>,
    driver: EpisodeDriver,
    wait_interval: Duration,
}

impl<'a, F: SimulationFactory, C: Consumer> Worker<'a, F, C> {
    pub fn new(
        index: usize,
        controller: &'a DispatchController<F, C>,
        solvers: &'a SolverFactory<F::Game>,
        driver: EpisodeDriver,
        wait_interval: Duration,
    ) -> Self {
        Worker { index, controller, solvers, driver, wait_interval }
    }

    /// Runs until the controller says STOP.
    pub fn run(&self) -> WorkerSummary {
        let mut summary = WorkerSummary { index: self.index, ..Default::default() };
        let mut previous = None;

        loop {
            match self.controller.next_work(previous.take()) {
                WorkItem::Run(assignment) => {
                    let finished = self.play(assignment);
                    summary.episodes += 1;
                    if finished.result.is_err() {
                        summary.abandoned += 1;
                    }
                    previous = Some(finished);
                }
                WorkItem::Wait => {
                    summary.waits += 1;
                    self.controller.wait_for_progress(self.wait_interval);
                }
                WorkItem::Stop => break,
            }
        }
        summary
    }

    /// Plays one episode to the end. Failures become an abandoned result so the
    /// slot is still released in order.
    fn play(&self, assignment: Assignment<F::Game>) -> FinishedEpisode<F::Game> {
        let Assignment { sequence, slot, mut game } = assignment;
        let worker = self.index;

        let mut moves = Vec::new();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut solver = (self.solvers)(&game);
            self.driver.play(&mut game, &mut solver, |applied| {
                moves.push(MoveEvent { sequence, worker, applied: *applied });
            })
        }));

        let result = match outcome {
            Ok(Ok(played)) => Ok(EpisodeResult {
                sequence,
                seed: game.seed(),
                debug_key: game.debug_key(),
                outcome: played.outcome,
                decisions: played.decisions,
            }),
            Ok(Err(reason)) => Err(reason),
            Err(payload) => Err(DriverError::SolverPanicked {
                key: game.debug_key(),
                message: panic_message(payload.as_ref()),
            }),
        };

        if let Err(reason) = &result {
            warn!(worker = self.index, sequence, %reason, moves = moves.len(), "Abandoning episode");
        }

        FinishedEpisode { sequence, slot, game, result, moves }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs `config.workers` workers to completion on a dedicated thread pool.
///
/// Returns once every worker has stopped. The last worker to stop renders the
/// consumer's report and sends it through `latch`.
///
/// # Arguments
/// * `controller` - Shared dispatch state
/// * `solvers` - Builds a fresh solver for each episode
/// * `config` - Supplies the worker count, wait interval and capture flag
/// * `latch` - Counts workers down and delivers the report
pub fn run_pool<F, C>(
    controller: &DispatchController<F, C>,
    solvers: &SolverFactory<F::Game>,
    config: &RunConfig,
    latch: &ReportLatch,
) -> Result<Vec<WorkerSummary>, BulkError>
where
    F: SimulationFactory,
    C: Consumer,
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("worker-{}", i + 1))
        .build()?;

    let driver = EpisodeDriver::new().capturing_decisions(config.capture_decisions);
    let wait_interval = config.wait_interval;
    info!(workers = config.workers, capacity = controller.capacity(), "Starting worker pool");

    let summaries = parking_lot::Mutex::new(Vec::with_capacity(config.workers));
    pool.scope(|scope| {
        for index in 0..config.workers {
            let summaries = &summaries;
            scope.spawn(move |_| {
                let worker = Worker::new(index, controller, solvers, driver, wait_interval);
                let summary = worker.run();
                debug!(
                    worker = index,
                    episodes = summary.episodes,
                    abandoned = summary.abandoned,
                    waits = summary.waits,
                    "Worker stopped"
                );
                summaries.lock().push(summary);
                latch.worker_finished(|| controller.render_report());
            });
        }
    });

    let mut summaries = summaries.into_inner();
    summaries.sort_by_key(|summary| summary.index);
    info!(stats = ?controller.stats(), "Worker pool stopped");
    Ok(summaries)
}
