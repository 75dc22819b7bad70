//! # Simulation Capability Module
//!
//! Defines the contract between the bulk runner and the board simulation it
//! drives. The runner never looks inside a game: it creates instances through a
//! [`SimulationFactory`], moves them into workers, and asks them about their
//! status and revealed cells. Everything else (mine placement, flood fill,
//! win/loss rules) belongs to the implementation.
//!
//! ## Coordinates
//! A [`Location`] is `(x, y)` with `x` the column in `0..width` and `y` the row
//! in `0..height`, matching the way boards are described (`30x16` is 30
//! columns by 16 rows).
//!
//! ## Query values
//! [`Simulation::query`] returns the revealed neighbour count (0–8) for opened
//! cells and a negative sentinel for everything else. Only the 0–8 range is
//! meaningful to the canonicalizer; any other value is folded into a single
//! "unknown" class.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Query value for a cell that has not been opened.
pub const HIDDEN: i8 = -1;
/// Query value for a cell carrying a flag.
pub const FLAGGED: i8 = -2;
/// Query value for an opened mine (only visible after a loss).
pub const MINE: i8 = -3;

/// Lifecycle state of a simulation instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// The game can still accept actions.
    InProgress,
    /// Every safe cell has been opened.
    Won,
    /// A mine was opened.
    Lost,
}

impl GameStatus {
    /// Check if the game has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// A cell coordinate on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub x: usize,
    pub y: usize,
}

impl Location {
    pub fn new(x: usize, y: usize) -> Self {
        Location { x, y }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What to do with a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Clear,
    Flag,
}

/// A single action against a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub location: Location,
    pub kind: ActionKind,
}

impl Action {
    pub fn clear(x: usize, y: usize) -> Self {
        Action { location: Location::new(x, y), kind: ActionKind::Clear }
    }

    pub fn flag(x: usize, y: usize) -> Self {
        Action { location: Location::new(x, y), kind: ActionKind::Flag }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::Clear => write!(f, "clear {}", self.location),
            ActionKind::Flag => write!(f, "flag {}", self.location),
        }
    }
}

/// Exact success probability of a move, kept as a rational.
///
/// The solver contract asks for values in `(0, 1]`; anything else is accepted
/// but reported as an anomaly by the episode driver.
#[derive(Debug, Clone, Copy)]
pub struct Probability {
    numerator: u64,
    denominator: u64,
}

impl Probability {
    /// Probability exactly 1.
    pub const CERTAIN: Probability = Probability { numerator: 1, denominator: 1 };

    pub fn new(numerator: u64, denominator: u64) -> Self {
        Probability { numerator, denominator }
    }

    pub fn numerator(&self) -> u64 {
        self.numerator
    }

    pub fn denominator(&self) -> u64 {
        self.denominator
    }

    /// A move is certain when its probability equals 1 exactly.
    pub fn is_certain(&self) -> bool {
        self.denominator != 0 && self.numerator == self.denominator
    }

    /// True when the value lies in `(0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.denominator != 0 && self.numerator > 0 && self.numerator <= self.denominator
    }

    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            f64::NAN
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }
}

impl PartialEq for Probability {
    fn eq(&self, other: &Self) -> bool {
        // A zero denominator is not a rational; those only equal each other.
        if self.denominator == 0 || other.denominator == 0 {
            return self.denominator == other.denominator;
        }
        // Cross-multiplication compares the rationals without reducing them.
        (self.numerator as u128) * (other.denominator as u128)
            == (other.numerator as u128) * (self.denominator as u128)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A proposed action together with the solver's estimate that it is safe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub action: Action,
    pub probability: Probability,
}

impl Move {
    pub fn new(action: Action, probability: Probability) -> Self {
        Move { action, probability }
    }

    /// A move the solver is sure about.
    pub fn certain(action: Action) -> Self {
        Move { action, probability: Probability::CERTAIN }
    }

    pub fn is_certain(&self) -> bool {
        self.probability.is_certain()
    }
}

/// Board dimensions and mine count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameSettings {
    pub width: usize,
    pub height: usize,
    pub mines: usize,
}

impl GameSettings {
    pub const BEGINNER: GameSettings = GameSettings { width: 9, height: 9, mines: 10 };
    pub const INTERMEDIATE: GameSettings = GameSettings { width: 16, height: 16, mines: 40 };
    pub const EXPERT: GameSettings = GameSettings { width: 30, height: 16, mines: 99 };

    pub fn new(width: usize, height: usize, mines: usize) -> Self {
        GameSettings { width, height, mines }
    }

    /// Reject boards that cannot be played.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        if self.mines >= self.width * self.height {
            return Err(ConfigError::TooManyMines {
                mines: self.mines,
                cells: self.width * self.height,
            });
        }
        Ok(())
    }

    /// The four corner cells, in row-major order.
    pub fn corners(&self) -> [Location; 4] {
        [
            Location::new(0, 0),
            Location::new(self.width - 1, 0),
            Location::new(0, self.height - 1),
            Location::new(self.width - 1, self.height - 1),
        ]
    }
}

impl fmt::Display for GameSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}/{}", self.width, self.height, self.mines)
    }
}

impl FromStr for GameSettings {
    type Err = ConfigError;

    /// Accepts a preset name (`beginner`, `intermediate`, `expert`) or
    /// `WIDTHxHEIGHT/MINES`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        match input.as_str() {
            "beginner" => return Ok(GameSettings::BEGINNER),
            "intermediate" => return Ok(GameSettings::INTERMEDIATE),
            "expert" => return Ok(GameSettings::EXPERT),
            _ => {}
        }

        let bad = || ConfigError::BadSettings(s.to_string());
        let (dims, mines) = input.split_once('/').ok_or_else(bad)?;
        let (width, height) = dims.split_once('x').ok_or_else(bad)?;
        let settings = GameSettings {
            width: width.trim().parse().map_err(|_| bad())?,
            height: height.trim().parse().map_err(|_| bad())?,
            mines: mines.trim().parse().map_err(|_| bad())?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// A single simulation instance (one episode).
///
/// Instances are owned by exactly one worker at a time, so implementations only
/// need to be `Send`.
pub trait Simulation: Send {
    /// Current lifecycle state.
    fn status(&self) -> GameStatus;
    /// Applies an action. Returns false when the action had no effect
    /// (already opened, out of bounds, game over).
    fn apply(&mut self, action: &Action) -> bool;
    /// Returns the visible value of a cell: 0–8 when opened, a negative
    /// sentinel otherwise.
    fn query(&self, location: Location) -> i8;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn mines(&self) -> usize;
    /// The seed this instance was generated from.
    fn seed(&self) -> u64;
    /// Number of actions that changed the board so far.
    fn action_count(&self) -> usize;
    /// Short identifier used in log lines.
    fn debug_key(&self) -> String;
}

/// Creates fresh simulation instances for the dispatch controller.
pub trait SimulationFactory: Send {
    type Game: Simulation;

    fn create(&self, settings: &GameSettings, seed: u64) -> Self::Game;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_certainty() {
        assert!(Probability::CERTAIN.is_certain());
        assert!(Probability::new(7, 7).is_certain());
        assert!(!Probability::new(6, 7).is_certain());
        assert_eq!(Probability::new(2, 4), Probability::new(1, 2));
    }

    #[test]
    fn test_probability_validity() {
        assert!(Probability::new(1, 3).is_valid());
        assert!(!Probability::new(0, 3).is_valid());
        assert!(!Probability::new(4, 3).is_valid());
        assert!(!Probability::new(1, 0).is_valid());
    }

    #[test]
    fn test_zero_denominator_only_equals_itself() {
        let undefined = Probability::new(0, 0);
        assert_ne!(undefined, Probability::new(1, 2));
        assert_ne!(undefined, Probability::CERTAIN);
        assert_ne!(Probability::new(1, 2), undefined);
        assert_eq!(undefined, Probability::new(3, 0));
        let click = Move::certain(Action::clear(0, 0));
        assert_ne!(click, Move { probability: undefined, ..click });
    }

    #[test]
    fn test_settings_presets() {
        assert_eq!("Expert".parse::<GameSettings>().unwrap(), GameSettings::EXPERT);
        assert_eq!("beginner".parse::<GameSettings>().unwrap(), GameSettings::BEGINNER);
    }

    #[test]
    fn test_settings_custom() {
        let settings: GameSettings = "60x60/900".parse().unwrap();
        assert_eq!(settings, GameSettings::new(60, 60, 900));
        assert_eq!(settings.to_string(), "60x60/900");
    }

    #[test]
    fn test_settings_rejects_garbage() {
        assert!("30x16".parse::<GameSettings>().is_err());
        assert!("axb/c".parse::<GameSettings>().is_err());
        assert!(matches!(
            "3x3/9".parse::<GameSettings>(),
            Err(ConfigError::TooManyMines { .. })
        ));
    }
}
