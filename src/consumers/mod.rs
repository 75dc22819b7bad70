//! Ready-made consumers for the bundled analyses.
//!
//! - [`WinTally`]: win rate over a fixed number of episodes
//! - [`ClickTally`]: clicks made versus games won, stopped by a click budget
//! - [`FrequencyTable`]: how often each guess position comes up, and how
//!   games that pass through it end

pub mod frequency;
pub mod tally;

pub use frequency::{FrequencyRecord, FrequencyTable};
pub use tally::{ClickTally, WinTally};
