//! # Consumer Contract
//!
//! A consumer is the single sink of a bulk run. The dispatch controller calls it
//! from inside its critical section, so implementations need no locking of their
//! own, but every call stalls all workers for its duration: keep per-call work
//! small.
//!
//! ## Ordering
//! - [`Consumer::process_episode`] is called in strict sequence order, once per
//!   completed episode.
//! - [`Consumer::process_move`] receives an episode's moves in application
//!   order, immediately before that episode's `process_episode`. Moves of
//!   abandoned episodes are never delivered.
//!
//! Completion of the worker pool is signalled separately through
//! [`ReportLatch`]; consumers only render the report.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::driver::{AppliedMove, DecisionPoint, TerminalOutcome};

/// A finished episode as delivered to the consumer.
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    /// Generation order, starting at 1.
    pub sequence: u64,
    /// Seed of the simulation instance.
    pub seed: u64,
    pub debug_key: String,
    pub outcome: TerminalOutcome,
    /// Guess positions captured by the driver, empty unless capture is enabled.
    pub decisions: Vec<DecisionPoint>,
}

/// A move applied by a worker, forwarded to the consumer when its episode drains.
#[derive(Debug, Clone, Copy)]
pub struct MoveEvent {
    /// Sequence number of the episode the move belongs to.
    pub sequence: u64,
    /// Index of the worker playing the episode.
    pub worker: usize,
    pub applied: AppliedMove,
}

/// Receives ordered results of a bulk run and renders the final report.
pub trait Consumer: Send {
    /// Called once per completed episode, in sequence order.
    fn process_episode(&mut self, result: &EpisodeResult);

    /// Called once per applied move.
    fn process_move(&mut self, _event: &MoveEvent) {}

    /// Number of episodes passed to [`Consumer::process_episode`] so far.
    fn episodes_processed(&self) -> u64;

    /// Human-readable summary of everything aggregated so far.
    fn render_report(&self) -> String;
}

/// Decides, after every drained episode, whether the run is complete.
pub type TerminationPredicate<C> = Box<dyn Fn(&C) -> bool + Send + Sync>;

/// Stops the run once `limit` episodes have been processed.
pub fn episodes_at_least<C: Consumer>(limit: u64) -> TerminationPredicate<C> {
    Box::new(move |consumer: &C| consumer.episodes_processed() >= limit)
}

/// Counts down finishing workers and delivers the report exactly once.
///
/// The worker that brings the count to zero renders the report and sends it
/// through a one-shot channel. The receiver can be awaited from async code or
/// polled after the pool has been joined.
#[derive(Debug)]
pub struct ReportLatch {
    remaining: AtomicUsize,
    sender: Mutex<Option<oneshot::Sender<String>>>,
}

impl ReportLatch {
    pub fn new(workers: usize) -> (Self, oneshot::Receiver<String>) {
        let (sender, receiver) = oneshot::channel();
        let latch = ReportLatch {
            remaining: AtomicUsize::new(workers),
            sender: Mutex::new(Some(sender)),
        };
        (latch, receiver)
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Marks one worker as finished. Returns true for the last worker, which
    /// also renders and sends the report.
    pub fn worker_finished(&self, render: impl FnOnce() -> String) -> bool {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return false;
        }
        if let Some(sender) = self.sender.lock().take() {
            // The receiver may already be gone if the caller stopped listening.
            let _ = sender.send(render());
        }
        true
    }
}
