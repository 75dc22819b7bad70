//! Precomputed opening table keyed by canonical board state.
//!
//! Locations are stored in the frame of the key they were inserted with; a
//! lookup maps them onto whatever orientation the live board happens to be in.

use std::collections::HashMap;

use crate::canonical::CanonicalBoardKey;
use crate::error::CanonicalError;
use crate::simulation::{GameSettings, Location, Simulation};

#[derive(Debug, Default, Clone)]
pub struct OpeningBook {
    entries: HashMap<CanonicalBoardKey, Location>,
}

impl OpeningBook {
    pub fn new() -> Self {
        OpeningBook { entries: HashMap::new() }
    }

    /// Clicks the opposite corner whenever a lone corner opened as a 1 or a 2.
    pub fn opposite_corner(settings: &GameSettings) -> Result<Self, CanonicalError> {
        let mut book = OpeningBook::new();
        let target = Location::new(settings.width.saturating_sub(1), settings.height.saturating_sub(1));
        for value in [1, 2] {
            book.insert(CanonicalBoardKey::from_cells(settings, &[(0, 0, value)])?, target);
        }
        Ok(book)
    }

    /// Adds or replaces the recommendation for a position. `location` is in
    /// `key`'s own frame.
    pub fn insert(&mut self, key: CanonicalBoardKey, location: Location) {
        self.entries.insert(key, location);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recommendation for the live board, mapped into its orientation.
    pub fn lookup<G: Simulation + ?Sized>(&self, game: &G) -> Option<Location> {
        let current = CanonicalBoardKey::from_simulation(game);
        self.lookup_key(&current)
    }

    pub fn lookup_key(&self, current: &CanonicalBoardKey) -> Option<Location> {
        let (stored, location) = self.entries.get_key_value(current)?;
        stored.map_from_canonical(current, *location).ok()
    }
}
