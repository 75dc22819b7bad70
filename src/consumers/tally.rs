//! Counting consumers.

use crate::consumer::{Consumer, EpisodeResult, MoveEvent, TerminationPredicate};
use crate::simulation::{ActionKind, GameStatus};

/// Played, won and lost counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WinTally {
    played: u64,
    won: u64,
    lost: u64,
}

impl WinTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> u64 {
        self.played
    }

    pub fn won(&self) -> u64 {
        self.won
    }

    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Fraction of played episodes that were won, 0 before any episode.
    pub fn win_rate(&self) -> f64 {
        if self.played == 0 {
            0.0
        } else {
            self.won as f64 / self.played as f64
        }
    }
}

impl Consumer for WinTally {
    fn process_episode(&mut self, result: &EpisodeResult) {
        self.played += 1;
        match result.outcome.status {
            GameStatus::Won => self.won += 1,
            GameStatus::Lost => self.lost += 1,
            GameStatus::InProgress => {}
        }
    }

    fn episodes_processed(&self) -> u64 {
        self.played
    }

    fn render_report(&self) -> String {
        format!(
            "{} games played, {} won, {} lost, win rate {:.4}%",
            self.played,
            self.won,
            self.lost,
            100.0 * self.win_rate()
        )
    }
}

/// Counts clear actions across all completed episodes, plus games won.
///
/// Flags are not clicks. Every clear the driver applies counts, including ones
/// that turned out to be no-ops. Abandoned episodes contribute no clicks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTally {
    clicks: u64,
    won: u64,
    played: u64,
}

impl ClickTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn won(&self) -> u64 {
        self.won
    }

    /// Stops the run once `limit` clicks have been made.
    pub fn clicks_at_least(limit: u64) -> TerminationPredicate<Self> {
        Box::new(move |tally: &ClickTally| tally.clicks >= limit)
    }
}

impl Consumer for ClickTally {
    fn process_episode(&mut self, result: &EpisodeResult) {
        self.played += 1;
        if result.outcome.is_win() {
            self.won += 1;
        }
    }

    fn process_move(&mut self, event: &MoveEvent) {
        if event.applied.mv.action.kind == ActionKind::Clear {
            self.clicks += 1;
        }
    }

    fn episodes_processed(&self) -> u64 {
        self.played
    }

    fn render_report(&self) -> String {
        format!("{} clicks made, {} games win.", self.clicks, self.won)
    }
}
