//! Error types for the bulk runner.
//!
//! Episode-level failures never stop a run: they are logged and the episode is
//! dropped from aggregation. Only configuration problems and a lost report
//! surface to the caller.

use thiserror::Error;

/// Raised by a solver that cannot produce moves for the current board.
#[derive(Debug, Error)]
pub enum SolverFault {
    #[error("Solver internal error: {0}")]
    Internal(String),

    #[error("Solver reached an inconsistent board: {0}")]
    Inconsistent(String),
}

/// Why an episode was abandoned before reaching WON or LOST.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Solver fault in game {key}: {source}")]
    Solver {
        key: String,
        #[source]
        source: SolverFault,
    },

    #[error("No moves returned by the solver for game {key}")]
    NoMoves { key: String },

    #[error("Solver batch changed nothing in game {key}")]
    Stalled { key: String },

    #[error("Solver panicked in game {key}: {message}")]
    SolverPanicked { key: String, message: String },
}

/// Invalid run or board configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("At least one worker is required")]
    NoWorkers,

    #[error("Buffer per worker must be at least 1")]
    NoBuffer,

    #[error("Ring capacity {0} is too small, need at least 2 slots")]
    CapacityTooSmall(usize),

    #[error("Board must have at least one cell")]
    EmptyBoard,

    #[error("Board has {cells} cells, cannot place {mines} mines")]
    TooManyMines { mines: usize, cells: usize },

    #[error("Invalid game setting '{0}', expected a preset name or WIDTHxHEIGHT/MINES")]
    BadSettings(String),

    #[error("Pre-action at {x},{y} lies outside the {width}x{height} board")]
    PreActionOutOfBounds { x: usize, y: usize, width: usize, height: usize },
}

/// Failure to compare boards from different equivalence classes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("Boards are not equivalent under any symmetry")]
    NotEquivalent,

    #[error("Cell ({x}, {y}) is outside the {width}x{height} board")]
    OffBoard { x: usize, y: usize, width: usize, height: usize },
}

/// Top-level error returned by [`crate::BulkRunner`].
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to spawn runner thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Workers stopped without delivering a report")]
    ReportLost,

    #[error("A worker thread panicked")]
    WorkerPanicked,
}
