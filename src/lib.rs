//! # Minesweeper Bulk Runner
//!
//! Plays very large numbers of independent minesweeper episodes in parallel
//! and hands their results to a single consumer in generation order.
//!
//! ## Architecture
//! ```text
//!  ┌───────────┐   WorkItem    ┌──────────────────────┐
//!  │ worker-1  │ ◄───────────► │                      │  ordered  ┌──────────┐
//!  │ worker-2  │ ◄───────────► │  DispatchController  │ ────────► │ Consumer │
//!  │   ...     │  Finished-    │  (ring + seeder)     │   drain   └──────────┘
//!  │ worker-N  │ ◄──Episode──► │                      │
//!  └─────┬─────┘               └──────────────────────┘
//!        │ EpisodeDriver::play(game, solver)
//!        ▼
//!   Simulation ◄── Solver (Strategy over a base solver)
//! ```
//!
//! ## Modules
//! - [`controller`]: sequence assignment, backpressure, ordered draining
//! - [`ring`]: the fixed-capacity slot ring behind the controller
//! - [`worker`]: the worker loop and the rayon pool running it
//! - [`driver`]: plays one episode to WON or LOST
//! - [`canonical`]: board keys that are equal under mirror and transpose
//! - [`consumer`] and [`consumers`]: the result sink contract and its analyses
//! - [`solver`]: the solver capability, strategies and a reference solver
//! - [`games`]: the reference minesweeper simulation
//! - [`runner`]: one-call setup of a whole run
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use bulk::consumers::WinTally;
//! use bulk::games::minesweeper::{MinesweeperFactory, MinesweeperGame};
//! use bulk::solver::{LocalSolver, Solver};
//! use bulk::{episodes_at_least, BulkRunner, GameSettings, RunConfig};
//!
//! let config = RunConfig { settings: GameSettings::BEGINNER, workers: 4, ..Default::default() };
//! let solvers = Arc::new(|_: &MinesweeperGame| -> Box<dyn Solver<MinesweeperGame>> {
//!     Box::new(LocalSolver::new())
//! });
//! let run = BulkRunner::new(config, MinesweeperFactory, solvers, WinTally::new(), episodes_at_least(10_000))?
//!     .run()?;
//! println!("{}", run.report);
//! # Ok::<(), bulk::BulkError>(())
//! ```

pub mod canonical;
pub mod config;
pub mod consumer;
pub mod consumers;
pub mod controller;
pub mod driver;
pub mod error;
pub mod games;
pub mod ring;
pub mod runner;
pub mod simulation;
pub mod solver;
pub mod worker;

pub use crate::canonical::{CanonicalBoardKey, Symmetry};
pub use crate::config::RunConfig;
pub use crate::consumer::{episodes_at_least, Consumer, EpisodeResult, MoveEvent, TerminationPredicate};
pub use crate::controller::{DispatchController, HaltReason, RunStats, WorkItem};
pub use crate::driver::{EpisodeDriver, TerminalOutcome};
pub use crate::error::{BulkError, CanonicalError, ConfigError, DriverError, SolverFault};
pub use crate::runner::{BulkRunner, RunHandle, RunReport};
pub use crate::simulation::{
    Action, ActionKind, GameSettings, GameStatus, Location, Move, Probability, Simulation, SimulationFactory,
};
pub use crate::solver::{Solver, SolverFactory, Strategy, StrategySolver};
