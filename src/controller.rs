//! # Dispatch Controller - Ordered, Backpressured Work Distribution
//!
//! The controller is the single synchronization point of a bulk run. Every
//! piece of shared mutable state lives behind one mutex:
//!
//! ```text
//! ┌──────────────────────────── Mutex<DispatchState> ───────────────────────────┐
//! │  seeder RNG ─► next sequence/slot ─► WorkItem::Run ──────────► worker       │
//! │                                                                   │         │
//! │  SlotRing: [ . . ✓ . ✓ ✓ . . ]  ◄── FinishedEpisode ◄─────────────┘         │
//! │              ▲ waiting slot                                                 │
//! │              └─ contiguous ready prefix ─► Consumer::process_episode        │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//! - Sequence numbers start at 1, are strictly increasing and gap-free, and
//!   `slot = (sequence - 1) % capacity`.
//! - The consumer sees completed episodes in sequence order, never out of order,
//!   even though workers finish them in any order. An episode's move events
//!   travel with its result and are delivered just before it.
//! - At most `capacity - 1` episodes are issued but not yet drained; beyond that
//!   workers are told to WAIT, so the ring never wraps onto an undrained slot.
//! - `finished` is a one-way latch. Once set, every call returns STOP and no
//!   further results reach the consumer.
//!
//! ## Waiting
//! Workers told to WAIT park on a condition variable for at most the configured
//! interval. Every drain and the finish latch notify it, so waiting workers
//! resume as soon as there is room again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand_xoshiro::rand_core::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::consumer::{Consumer, EpisodeResult, MoveEvent, TerminationPredicate};
use crate::error::{ConfigError, DriverError};
use crate::ring::SlotRing;
use crate::simulation::{Action, GameSettings, Simulation, SimulationFactory};

/// An episode handed to a worker.
#[derive(Debug)]
pub struct Assignment<G> {
    pub sequence: u64,
    pub slot: usize,
    pub game: G,
}

/// What a worker should do next.
#[derive(Debug)]
pub enum WorkItem<G> {
    /// Play the assigned episode and hand it back.
    Run(Assignment<G>),
    /// Nothing can be issued right now; pause and ask again.
    Wait,
    /// The run is over; exit.
    Stop,
}

/// An episode returned by a worker, completed or abandoned.
#[derive(Debug)]
pub struct FinishedEpisode<G> {
    pub sequence: u64,
    pub slot: usize,
    pub game: G,
    pub result: Result<EpisodeResult, DriverError>,
    /// Moves applied while playing, in order. Delivered just ahead of the
    /// result when it drains; dropped if the episode was abandoned.
    pub moves: Vec<MoveEvent>,
}

/// Why the controller latched `finished` without the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Pre-actions ended every freshly generated game.
    DegeneratePreActions { attempts: u32 },
}

/// Counters describing the run so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Episodes handed to workers.
    pub issued: u64,
    /// Episodes drained from the ring, completed or abandoned.
    pub drained: u64,
    /// Drained episodes delivered to the consumer.
    pub completed: u64,
    /// Drained episodes excluded because the driver abandoned them.
    pub abandoned: u64,
    /// Games thrown away because a pre-action ended them.
    pub regenerated: u64,
    /// Episodes returned after the run had finished.
    pub discarded: u64,
    pub halt: Option<HaltReason>,
}

/// Produces fresh episodes with the pre-actions applied.
struct EpisodeSource<F> {
    factory: F,
    settings: GameSettings,
    pre_actions: Vec<Action>,
    max_regenerations: u32,
    seeder: Xoshiro256PlusPlus,
}

impl<F: SimulationFactory> EpisodeSource<F> {
    /// Returns a game still in progress after the pre-actions, plus how many
    /// games were discarded on the way.
    fn generate(&mut self) -> Result<(F::Game, u32), HaltReason> {
        for attempt in 0..=self.max_regenerations {
            let mut game = self.factory.create(&self.settings, self.seeder.next_u64());
            for action in &self.pre_actions {
                game.apply(action);
                if game.status().is_terminal() {
                    break;
                }
            }
            if !game.status().is_terminal() {
                return Ok((game, attempt));
            }
        }
        Err(HaltReason::DegeneratePreActions { attempts: self.max_regenerations + 1 })
    }
}

struct DispatchState<F: SimulationFactory, C> {
    ring: SlotRing<FinishedEpisode<F::Game>>,
    /// Next sequence number to issue.
    next_sequence: u64,
    finished: bool,
    source: EpisodeSource<F>,
    consumer: C,
    stats: RunStats,
}

impl<F: SimulationFactory, C> DispatchState<F, C> {
    fn in_flight(&self) -> u64 {
        self.stats.issued - self.stats.drained
    }
}

/// The single critical section shared by all workers.
pub struct DispatchController<F: SimulationFactory, C: Consumer> {
    state: Mutex<DispatchState<F, C>>,
    progress: Condvar,
    stop_requested: Arc<AtomicBool>,
    predicate: TerminationPredicate<C>,
    capacity: usize,
}

impl<F: SimulationFactory, C: Consumer> DispatchController<F, C> {
    /// Creates a controller, rejecting any configuration that fails
    /// [`RunConfig::validate`]. The WAIT threshold needs a capacity of at least 2.
    ///
    /// # Arguments
    /// * `config` - Run configuration; `config.capacity()` sizes the ring
    /// * `factory` - Source of fresh simulation instances
    /// * `consumer` - Sink for ordered results
    /// * `predicate` - Evaluated after every drained episode
    /// * `stop_requested` - External stop flag, observed on the next call
    pub fn new(
        config: &RunConfig,
        factory: F,
        consumer: C,
        predicate: TerminationPredicate<C>,
        stop_requested: Arc<AtomicBool>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let capacity = config.capacity();
        let source = EpisodeSource {
            factory,
            settings: config.settings,
            pre_actions: config.pre_actions.clone(),
            max_regenerations: config.max_regenerations,
            seeder: Xoshiro256PlusPlus::seed_from_u64(config.seed),
        };
        Ok(DispatchController {
            state: Mutex::new(DispatchState {
                ring: SlotRing::new(capacity),
                next_sequence: 1,
                finished: false,
                source,
                consumer,
                stats: RunStats::default(),
            }),
            progress: Condvar::new(),
            stop_requested,
            predicate,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hands back the previous result (if any) and returns the next directive.
    pub fn next_work(&self, previous: Option<FinishedEpisode<F::Game>>) -> WorkItem<F::Game> {
        let mut state = self.state.lock();

        if let Some(done) = previous {
            if state.finished {
                state.stats.discarded += 1;
            } else {
                let slot = done.slot;
                state.ring.store(slot, done);
                if slot == state.ring.waiting_slot() {
                    self.drain(&mut state);
                }
            }
        }

        if state.finished {
            return WorkItem::Stop;
        }
        if self.stop_requested.load(Ordering::Acquire) || (self.predicate)(&state.consumer) {
            self.finish(&mut state);
            return WorkItem::Stop;
        }

        if state.in_flight() > (self.capacity - 2) as u64 {
            return WorkItem::Wait;
        }

        let game = match state.source.generate() {
            Ok((game, discarded)) => {
                state.stats.regenerated += discarded as u64;
                game
            }
            Err(reason) => {
                error!(?reason, "Pre-actions end every generated game, halting run");
                state.stats.halt = Some(reason);
                self.finish(&mut state);
                return WorkItem::Stop;
            }
        };

        let sequence = state.next_sequence;
        let slot = ((sequence - 1) % self.capacity as u64) as usize;
        state.next_sequence += 1;
        state.stats.issued += 1;

        WorkItem::Run(Assignment { sequence, slot, game })
    }

    /// Parks the caller until the next drain or for at most `timeout`.
    pub fn wait_for_progress(&self, timeout: Duration) {
        let mut state = self.state.lock();
        if !state.finished {
            self.progress.wait_for(&mut state, timeout);
        }
    }

    /// Snapshot of the run counters.
    pub fn stats(&self) -> RunStats {
        self.state.lock().stats.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().finished
    }

    /// Renders the consumer's report.
    pub fn render_report(&self) -> String {
        self.state.lock().consumer.render_report()
    }

    /// Consumes the controller, returning the consumer and final counters.
    pub fn into_parts(self) -> (C, RunStats) {
        let state = self.state.into_inner();
        (state.consumer, state.stats)
    }

    /// Delivers the contiguous ready prefix of the ring to the consumer.
    fn drain(&self, state: &mut DispatchState<F, C>) {
        let mut delivered = 0u64;
        while !state.finished {
            let Some(done) = state.ring.pop_ready() else {
                break;
            };
            state.stats.drained += 1;
            debug_assert_eq!(done.sequence, state.stats.drained, "drain out of sequence order");

            match &done.result {
                Ok(result) => {
                    for event in &done.moves {
                        state.consumer.process_move(event);
                    }
                    state.consumer.process_episode(result);
                    state.stats.completed += 1;
                }
                Err(reason) => {
                    warn!(sequence = done.sequence, %reason, "Episode abandoned, excluded from aggregation");
                    state.stats.abandoned += 1;
                }
            }
            delivered += 1;

            if (self.predicate)(&state.consumer) {
                self.finish(state);
            }
        }

        if delivered > 0 {
            debug!(
                delivered,
                drained = state.stats.drained,
                waiting_slot = state.ring.waiting_slot(),
                "Drained ready episodes"
            );
            self.progress.notify_all();
        }
    }

    fn finish(&self, state: &mut DispatchState<F, C>) {
        if state.finished {
            return;
        }
        state.finished = true;
        info!(
            issued = state.stats.issued,
            completed = state.stats.completed,
            abandoned = state.stats.abandoned,
            "Bulk run finished"
        );
        self.progress.notify_all();
    }
}
