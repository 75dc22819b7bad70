//! Reference Minesweeper simulation.
//!
//! Standard rules with a safe first click: mines are placed from the episode
//! seed when the first cell is cleared, never on that cell. Opening a zero
//! floods its neighbours. The game is won once every safe cell is open.

use rand::seq::SliceRandom;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::simulation::{
    Action, ActionKind, GameSettings, GameStatus, Location, Simulation, SimulationFactory, FLAGGED,
    HIDDEN, MINE,
};

#[derive(Debug, Clone)]
pub struct MinesweeperGame {
    settings: GameSettings,
    seed: u64,
    /// `None` until the first clear places the mines.
    mines: Option<Vec<bool>>,
    revealed: Vec<bool>,
    flagged: Vec<bool>,
    status: GameStatus,
    actions: usize,
    safe_remaining: usize,
}

impl MinesweeperGame {
    pub fn new(settings: GameSettings, seed: u64) -> Self {
        let cells = settings.width * settings.height;
        MinesweeperGame {
            settings,
            seed,
            mines: None,
            revealed: vec![false; cells],
            flagged: vec![false; cells],
            status: GameStatus::InProgress,
            actions: 0,
            safe_remaining: cells - settings.mines,
        }
    }

    /// A game with a fixed mine layout. `settings.mines` is replaced by the
    /// number of distinct locations given.
    pub fn with_mines(settings: GameSettings, mines: &[Location]) -> Self {
        let cells = settings.width * settings.height;
        let mut layout = vec![false; cells];
        for location in mines {
            layout[location.y * settings.width + location.x] = true;
        }
        let count = layout.iter().filter(|&&m| m).count();
        let settings = GameSettings { mines: count, ..settings };
        MinesweeperGame {
            mines: Some(layout),
            safe_remaining: cells - count,
            ..MinesweeperGame::new(settings, 0)
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    fn index(&self, location: Location) -> Option<usize> {
        (location.x < self.settings.width && location.y < self.settings.height)
            .then(|| location.y * self.settings.width + location.x)
    }

    fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> {
        let width = self.settings.width;
        let height = self.settings.height;
        let (x, y) = (index % width, index / width);
        let xs = x.saturating_sub(1)..=(x + 1).min(width - 1);
        xs.flat_map(move |nx| (y.saturating_sub(1)..=(y + 1).min(height - 1)).map(move |ny| ny * width + nx))
            .filter(move |&n| n != index)
    }

    fn place_mines(&mut self, safe: usize) -> Vec<bool> {
        let cells = self.revealed.len();
        let mut candidates: Vec<usize> = (0..cells).filter(|&i| i != safe).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        candidates.shuffle(&mut rng);
        let mut layout = vec![false; cells];
        for &i in candidates.iter().take(self.settings.mines) {
            layout[i] = true;
        }
        layout
    }

    fn adjacent_mines(&self, mines: &[bool], index: usize) -> i8 {
        self.neighbours(index).filter(|&n| mines[n]).count() as i8
    }

    fn clear(&mut self, index: usize) -> bool {
        if self.revealed[index] || self.flagged[index] {
            return false;
        }
        let mines = match self.mines.take() {
            Some(mines) => mines,
            None => self.place_mines(index),
        };

        if mines[index] {
            self.revealed[index] = true;
            self.status = GameStatus::Lost;
            self.mines = Some(mines);
            return true;
        }

        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            if self.revealed[current] || self.flagged[current] {
                continue;
            }
            self.revealed[current] = true;
            self.safe_remaining -= 1;
            if self.adjacent_mines(&mines, current) == 0 {
                stack.extend(self.neighbours(current).filter(|&n| !self.revealed[n]));
            }
        }
        self.mines = Some(mines);

        if self.safe_remaining == 0 {
            self.status = GameStatus::Won;
        }
        true
    }
}

impl Simulation for MinesweeperGame {
    fn status(&self) -> GameStatus {
        self.status
    }

    fn apply(&mut self, action: &Action) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        let Some(index) = self.index(action.location) else {
            return false;
        };
        let changed = match action.kind {
            ActionKind::Clear => self.clear(index),
            ActionKind::Flag => {
                if self.revealed[index] || self.flagged[index] {
                    false
                } else {
                    self.flagged[index] = true;
                    true
                }
            }
        };
        if changed {
            self.actions += 1;
        }
        changed
    }

    fn query(&self, location: Location) -> i8 {
        let Some(index) = self.index(location) else {
            return HIDDEN;
        };
        if self.flagged[index] {
            return FLAGGED;
        }
        if !self.revealed[index] {
            return HIDDEN;
        }
        match &self.mines {
            Some(mines) if mines[index] => MINE,
            Some(mines) => self.adjacent_mines(mines, index),
            None => HIDDEN,
        }
    }

    fn width(&self) -> usize {
        self.settings.width
    }

    fn height(&self) -> usize {
        self.settings.height
    }

    fn mines(&self) -> usize {
        self.settings.mines
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn action_count(&self) -> usize {
        self.actions
    }

    fn debug_key(&self) -> String {
        format!("{}#{}", self.settings, self.seed)
    }
}

/// Creates [`MinesweeperGame`] instances for the dispatch controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinesweeperFactory;

impl SimulationFactory for MinesweeperFactory {
    type Game = MinesweeperGame;

    fn create(&self, settings: &GameSettings, seed: u64) -> MinesweeperGame {
        MinesweeperGame::new(*settings, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_click_is_safe() {
        for seed in 0..50 {
            let mut game = MinesweeperGame::new(GameSettings::new(4, 4, 15), seed);
            assert!(game.apply(&Action::clear(2, 1)));
            // Only one safe cell exists, so the first click wins.
            assert_eq!(game.status(), GameStatus::Won);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = MinesweeperGame::new(GameSettings::EXPERT, 99);
        let mut b = MinesweeperGame::new(GameSettings::EXPERT, 99);
        a.apply(&Action::clear(10, 10));
        b.apply(&Action::clear(10, 10));
        for y in 0..16 {
            for x in 0..30 {
                assert_eq!(a.query(Location::new(x, y)), b.query(Location::new(x, y)));
            }
        }
    }

    #[test]
    fn test_flood_fill_and_loss() {
        let mut game = MinesweeperGame::with_mines(GameSettings::new(3, 3, 1), &[Location::new(2, 2)]);
        assert!(game.apply(&Action::clear(0, 0)));
        assert_eq!(game.query(Location::new(0, 0)), 0);
        assert_eq!(game.query(Location::new(1, 1)), 1);
        assert_eq!(game.status(), GameStatus::Won);

        let mut game = MinesweeperGame::with_mines(GameSettings::new(3, 3, 1), &[Location::new(2, 2)]);
        assert!(game.apply(&Action::flag(1, 1)));
        assert_eq!(game.query(Location::new(1, 1)), FLAGGED);
        assert!(game.apply(&Action::clear(2, 2)));
        assert_eq!(game.status(), GameStatus::Lost);
        assert_eq!(game.query(Location::new(2, 2)), MINE);
        assert!(!game.apply(&Action::clear(0, 0)));
        assert_eq!(game.action_count(), 2);
    }

    #[test]
    fn test_ineffective_actions() {
        let mut game = MinesweeperGame::new(GameSettings::BEGINNER, 5);
        assert!(!game.apply(&Action::clear(9, 0)));
        assert!(game.apply(&Action::flag(3, 3)));
        assert!(!game.apply(&Action::flag(3, 3)));
        assert!(!game.apply(&Action::clear(3, 3)));
        assert_eq!(game.action_count(), 1);
        assert_eq!(game.debug_key(), "9x9/10#5");
    }
}
