//! # Solver Capability Module
//!
//! The bulk runner treats the solver as an opaque capability: given the board a
//! player can see, propose an ordered batch of moves. This module defines that
//! contract and the small set of strategies that reshape a base solver's output.
//!
//! ## Strategies
//! Variants that the analyses need are selected by configuration rather than by
//! wrapping solvers in one another:
//! - [`Strategy::Default`]: pass the base batch through unchanged
//! - [`Strategy::SingleBest`]: play only the first move of each batch
//! - [`Strategy::EdgeNearest`]: play the one move closest to a board edge
//! - [`Strategy::CornersFirst`]: open all four corners first, then single-best
//! - [`Strategy::OpeningBook`]: consult a table of canonical positions first
//!
//! ## Thread Safety
//! A solver instance is created per episode by the worker that plays it and
//! never leaves that worker, so `Send` is all that is required.

pub mod local;
pub mod opening;

use std::sync::Arc;

use crate::error::SolverFault;
use crate::simulation::{Action, Move, Probability, Simulation};

pub use local::LocalSolver;
pub use opening::OpeningBook;

/// Proposes moves for a single episode.
pub trait Solver<G: Simulation>: Send {
    /// Called before every [`Solver::propose_moves`].
    fn prepare(&mut self, _game: &G) -> Result<(), SolverFault> {
        Ok(())
    }

    /// Returns the next batch of moves, in the order they should be played.
    ///
    /// Must return at least one move while the game is in progress.
    fn propose_moves(&mut self, game: &G) -> Result<Vec<Move>, SolverFault>;
}

impl<G: Simulation, S: Solver<G> + ?Sized> Solver<G> for Box<S> {
    fn prepare(&mut self, game: &G) -> Result<(), SolverFault> {
        (**self).prepare(game)
    }

    fn propose_moves(&mut self, game: &G) -> Result<Vec<Move>, SolverFault> {
        (**self).propose_moves(game)
    }
}

/// Builds a fresh solver for each episode handed to a worker.
pub type SolverFactory<G> = Arc<dyn Fn(&G) -> Box<dyn Solver<G>> + Send + Sync>;

/// How a base solver's batches are reshaped before the driver plays them.
#[derive(Debug, Clone, Default)]
pub enum Strategy {
    #[default]
    Default,
    SingleBest,
    EdgeNearest,
    CornersFirst,
    OpeningBook(Arc<OpeningBook>),
}

impl Strategy {
    /// Parses the command-line name of a strategy. The opening book variant
    /// needs a table and is built directly instead.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Strategy::Default),
            "single-best" => Some(Strategy::SingleBest),
            "edge-nearest" => Some(Strategy::EdgeNearest),
            "corners-first" => Some(Strategy::CornersFirst),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Default => "default",
            Strategy::SingleBest => "single-best",
            Strategy::EdgeNearest => "edge-nearest",
            Strategy::CornersFirst => "corners-first",
            Strategy::OpeningBook(_) => "opening-book",
        }
    }
}

/// A base solver with a [`Strategy`] applied to its output.
pub struct StrategySolver<S> {
    base: S,
    strategy: Strategy,
}

impl<S> StrategySolver<S> {
    pub fn new(base: S, strategy: Strategy) -> Self {
        StrategySolver { base, strategy }
    }
}

impl<G: Simulation, S: Solver<G>> Solver<G> for StrategySolver<S> {
    fn prepare(&mut self, game: &G) -> Result<(), SolverFault> {
        self.base.prepare(game)
    }

    fn propose_moves(&mut self, game: &G) -> Result<Vec<Move>, SolverFault> {
        match &self.strategy {
            Strategy::Default => self.base.propose_moves(game),
            Strategy::SingleBest => {
                let moves = self.base.propose_moves(game)?;
                Ok(moves.into_iter().take(1).collect())
            }
            Strategy::EdgeNearest => {
                let moves = self.base.propose_moves(game)?;
                let (width, height) = (game.width(), game.height());
                let best = moves.into_iter().min_by(|a, b| {
                    edge_distance(a, width, height)
                        .partial_cmp(&edge_distance(b, width, height))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                Ok(best.into_iter().collect())
            }
            Strategy::CornersFirst => {
                if game.action_count() == 0 {
                    return Ok(corner_moves(game));
                }
                let moves = self.base.propose_moves(game)?;
                Ok(moves.into_iter().take(1).collect())
            }
            Strategy::OpeningBook(book) => match book.lookup(game) {
                Some(location) => Ok(vec![Move::certain(Action::clear(location.x, location.y))]),
                None => self.base.propose_moves(game),
            },
        }
    }
}

/// Distance to the nearest edge, ties broken towards the nearer second edge.
fn edge_distance(mv: &Move, width: usize, height: usize) -> f64 {
    let location = mv.action.location;
    let from_rows = (height - 1 - location.y).min(location.y);
    let from_cols = (width - 1 - location.x).min(location.x);
    from_rows.min(from_cols) as f64 + 0.0001 * from_rows.max(from_cols) as f64
}

fn corner_moves<G: Simulation>(game: &G) -> Vec<Move> {
    let (width, height) = (game.width(), game.height());
    let cells = (width * height) as u64;
    let safe = Probability::new(cells - game.mines() as u64, cells);
    let mut corners = vec![(0, 0), (0, height - 1), (width - 1, 0), (width - 1, height - 1)];
    corners.sort_unstable();
    corners.dedup();
    corners
        .into_iter()
        .map(|(x, y)| Move::new(Action::clear(x, y), safe))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::minesweeper::MinesweeperGame;
    use crate::simulation::{GameSettings, Location};

    /// Always proposes the same fixed batch.
    struct Scripted(Vec<Move>);

    impl<G: Simulation> Solver<G> for Scripted {
        fn propose_moves(&mut self, _game: &G) -> Result<Vec<Move>, SolverFault> {
            Ok(self.0.clone())
        }
    }

    fn batch() -> Vec<Move> {
        vec![
            Move::new(Action::clear(4, 4), Probability::new(1, 2)),
            Move::new(Action::clear(0, 3), Probability::new(1, 2)),
            Move::new(Action::clear(3, 4), Probability::new(1, 2)),
        ]
    }

    #[test]
    fn test_single_best_keeps_first_move() {
        let game = MinesweeperGame::new(GameSettings::BEGINNER, 1);
        let mut solver = StrategySolver::new(Scripted(batch()), Strategy::SingleBest);
        let moves = solver.propose_moves(&game).unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].action.location, Location::new(4, 4));
    }

    #[test]
    fn test_edge_nearest_picks_edge_cell() {
        let game = MinesweeperGame::new(GameSettings::BEGINNER, 1);
        let mut solver = StrategySolver::new(Scripted(batch()), Strategy::EdgeNearest);
        let moves = solver.propose_moves(&game).unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].action.location, Location::new(0, 3));
    }

    #[test]
    fn test_corners_first_only_on_fresh_board() {
        let mut game = MinesweeperGame::new(GameSettings::BEGINNER, 1);
        let mut solver = StrategySolver::new(Scripted(batch()), Strategy::CornersFirst);
        let opening = solver.propose_moves(&game).unwrap();
        assert_eq!(opening.len(), 4);
        assert!(opening.iter().all(|m| m.probability == Probability::new(71, 81)));

        game.apply(&Action::clear(0, 0));
        let next = solver.propose_moves(&game).unwrap();
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_strategy_names_round_trip() {
        for name in ["default", "single-best", "edge-nearest", "corners-first"] {
            assert_eq!(Strategy::from_name(name).unwrap().name(), name);
        }
        assert!(Strategy::from_name("opening-book").is_none());
    }
}
