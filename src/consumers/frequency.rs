//! # Guess-Position Frequency Table
//!
//! Aggregates the decision points captured by the episode driver. Positions
//! that differ only by a board symmetry share one record, so the table
//! answers "how often does this shape come up, and what happens after it"
//! independently of orientation.
//!
//! ## Frames
//! Each record keeps the key it was first created with. Locations chosen on
//! later, differently oriented boards are mapped into that key's frame before
//! they are counted, so the report can show them against a single board.
//!
//! ## Report
//! Records are listed by appearances, most frequent first. Listing stops at the
//! first record with `appeared² < episodes`: rarer positions are noise at that
//! sample size.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::canonical::CanonicalBoardKey;
use crate::consumer::{Consumer, EpisodeResult};
use crate::simulation::Location;

/// Everything known about one class of equivalent positions.
#[derive(Debug, Clone)]
pub struct FrequencyRecord {
    key: CanonicalBoardKey,
    appeared: u64,
    won: u64,
    lost: u64,
    /// Chosen locations in `key`'s frame, with multiplicity.
    locations: BTreeMap<Location, u64>,
}

impl FrequencyRecord {
    pub fn new(key: CanonicalBoardKey) -> Self {
        FrequencyRecord { key, appeared: 0, won: 0, lost: 0, locations: BTreeMap::new() }
    }

    pub fn key(&self) -> &CanonicalBoardKey {
        &self.key
    }

    pub fn appeared(&self) -> u64 {
        self.appeared
    }

    pub fn won(&self) -> u64 {
        self.won
    }

    pub fn lost(&self) -> u64 {
        self.lost
    }

    pub fn locations(&self) -> &BTreeMap<Location, u64> {
        &self.locations
    }

    /// Counts one pass through this position.
    ///
    /// # Arguments
    /// * `observed` - The board as the solver saw it; must equal `self.key()`
    /// * `location` - The cell chosen there, in `observed`'s frame
    /// * `won` - Whether the episode was eventually won
    pub fn observe(&mut self, observed: &CanonicalBoardKey, location: Location, won: bool) {
        self.appeared += 1;
        if won {
            self.won += 1;
        } else {
            self.lost += 1;
        }
        match self.key.map_to_canonical(observed, location) {
            Ok(canonical) => *self.locations.entry(canonical).or_insert(0) += 1,
            Err(error) => warn!(%error, %location, "Decision point filed under a foreign key"),
        }
    }

    /// Percentage of `episodes` that passed through this position.
    pub fn frequency(&self, episodes: u64) -> f64 {
        if episodes == 0 {
            0.0
        } else {
            100.0 * self.appeared as f64 / episodes as f64
        }
    }

    /// Percentage of passes that ended in a win.
    pub fn win_rate(&self) -> f64 {
        let finished = self.won + self.lost;
        if finished == 0 {
            0.0
        } else {
            100.0 * self.won as f64 / finished as f64
        }
    }

    fn render(&self, episodes: u64) -> String {
        let clicks: Vec<String> = self.locations.keys().map(|location| location.to_string()).collect();
        format!(
            "{}\n\nProbability: {:.1}%\n\nWinrate: {:.1}%\n\nClick {}\n\n",
            self.key,
            self.frequency(episodes),
            self.win_rate(),
            clicks.join(" or ")
        )
    }
}

/// Canonical position → [`FrequencyRecord`].
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    records: HashMap<CanonicalBoardKey, FrequencyRecord>,
    episodes: u64,
    wins: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    /// Number of distinct positions seen.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &CanonicalBoardKey) -> Option<&FrequencyRecord> {
        self.records.get(key)
    }

    /// All records, most frequent first.
    pub fn ranked(&self) -> Vec<&FrequencyRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by(|a, b| b.appeared.cmp(&a.appeared));
        records
    }

    /// Records frequent enough to appear in the report.
    pub fn reportable(&self) -> Vec<&FrequencyRecord> {
        let episodes = self.episodes as u128;
        self.ranked()
            .into_iter()
            .take_while(|record| (record.appeared as u128) * (record.appeared as u128) >= episodes)
            .collect()
    }
}

impl Consumer for FrequencyTable {
    fn process_episode(&mut self, result: &EpisodeResult) {
        self.episodes += 1;
        let won = result.outcome.is_win();
        if won {
            self.wins += 1;
        }
        for decision in &result.decisions {
            self.records
                .entry(decision.key.clone())
                .or_insert_with(|| FrequencyRecord::new(decision.key.clone()))
                .observe(&decision.key, decision.location, won);
        }
    }

    fn episodes_processed(&self) -> u64 {
        self.episodes
    }

    fn render_report(&self) -> String {
        let records: String = self.reportable().iter().map(|record| record.render(self.episodes)).collect();
        format!("{}{} games won of {}", records, self.wins, self.episodes)
    }
}
