//! # Reference Simulations
//!
//! Concrete implementations of the [`crate::simulation::Simulation`]
//! capability. The bulk runner itself never depends on a particular game; these
//! exist so the command-line analyses and the tests have something real to
//! drive.
//!
//! ## Supported Games
//! - **Minesweeper**: standard rules, safe first click, seeded mine placement

pub mod minesweeper;
