//! # Episode Driver
//!
//! Plays one simulation to a terminal state by repeatedly asking the solver for
//! a batch of moves and applying them in order.
//!
//! ## Loop
//! ```text
//!   ┌──────────────┐  prepare + propose   ┌────────┐
//!   │  InProgress  │ ───────────────────► │ Solver │
//!   └──────┬───────┘ ◄─────────────────── └────────┘
//!          │ apply moves one by one           batch
//!          ▼
//!   WON / LOST ──► stop at once, even mid-batch
//! ```
//!
//! A solver fault, an empty batch or a batch that changes nothing abandons the
//! episode. Abandoned episodes are not retried; the caller logs them and drops
//! them from aggregation.
//!
//! Every applied move is reported through a callback before the next one is
//! played, so per-move consumers see them in application order.

use tracing::warn;

use crate::canonical::CanonicalBoardKey;
use crate::error::DriverError;
use crate::simulation::{GameStatus, Location, Move, Simulation};
use crate::solver::Solver;

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalOutcome {
    /// Either [`GameStatus::Won`] or [`GameStatus::Lost`].
    pub status: GameStatus,
    /// Moves applied by the driver (pre-actions are not counted).
    pub move_count: usize,
}

impl TerminalOutcome {
    pub fn is_win(&self) -> bool {
        self.status == GameStatus::Won
    }
}

/// A position where the solver had to guess, with the cell it chose.
#[derive(Debug, Clone)]
pub struct DecisionPoint {
    pub key: CanonicalBoardKey,
    /// In the frame of `key` as it was observed.
    pub location: Location,
}

/// A move as it was applied during an episode.
#[derive(Debug, Clone, Copy)]
pub struct AppliedMove {
    /// 1-based position of the move within the episode.
    pub move_number: usize,
    pub mv: Move,
    /// Whether the action changed the board.
    pub effective: bool,
    /// Game state right after the move.
    pub status_after: GameStatus,
}

/// Result of a completed episode.
#[derive(Debug, Clone)]
pub struct PlayedEpisode {
    pub outcome: TerminalOutcome,
    pub decisions: Vec<DecisionPoint>,
}

/// Plays episodes to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpisodeDriver {
    capture_decisions: bool,
}

impl EpisodeDriver {
    pub fn new() -> Self {
        EpisodeDriver { capture_decisions: false }
    }

    /// Records a [`DecisionPoint`] for every singleton batch whose move is not
    /// certain.
    pub fn capturing_decisions(mut self, capture: bool) -> Self {
        self.capture_decisions = capture;
        self
    }

    /// Drives `game` until it is won or lost.
    ///
    /// # Arguments
    /// * `game` - The episode, exclusively owned by the caller for its duration
    /// * `solver` - Move source for this episode
    /// * `on_move` - Invoked once per applied move, in application order
    pub fn play<G, S>(
        &self,
        game: &mut G,
        solver: &mut S,
        mut on_move: impl FnMut(&AppliedMove),
    ) -> Result<PlayedEpisode, DriverError>
    where
        G: Simulation,
        S: Solver<G> + ?Sized,
    {
        let mut move_count = 0;
        let mut decisions = Vec::new();

        let mut status = game.status();
        while !status.is_terminal() {
            let moves = solver
                .prepare(game)
                .and_then(|_| solver.propose_moves(game))
                .map_err(|source| DriverError::Solver { key: game.debug_key(), source })?;

            if moves.is_empty() {
                return Err(DriverError::NoMoves { key: game.debug_key() });
            }

            if self.capture_decisions && moves.len() == 1 && !moves[0].is_certain() {
                decisions.push(DecisionPoint {
                    key: CanonicalBoardKey::from_simulation(game),
                    location: moves[0].action.location,
                });
            }

            let mut progressed = false;
            for mv in &moves {
                if !mv.probability.is_valid() {
                    warn!(
                        game = %game.debug_key(),
                        probability = %mv.probability,
                        action = %mv.action,
                        "Move with probability outside (0, 1]"
                    );
                }

                let effective = game.apply(&mv.action);
                progressed |= effective;
                status = game.status();
                move_count += 1;

                on_move(&AppliedMove { move_number: move_count, mv: *mv, effective, status_after: status });

                if status.is_terminal() {
                    break;
                }
            }

            if !progressed && !status.is_terminal() {
                return Err(DriverError::Stalled { key: game.debug_key() });
            }
        }

        Ok(PlayedEpisode { outcome: TerminalOutcome { status, move_count }, decisions })
    }
}
