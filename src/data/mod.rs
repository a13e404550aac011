//! Core data models for the GoalGPT client
//!
//! This module contains the typed records the rest of the crate works with:
//! predictions, bot statistics and match status. Untyped wire payloads are
//! converted into these at the edge (see `api::wire` and `live::wire`).

pub mod schema;

pub use schema::SchemaMismatchError;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider status code for a match that has not kicked off
pub const STATUS_NOT_STARTED: u8 = 1;
/// Provider status code for the first half
pub const STATUS_FIRST_HALF: u8 = 2;
/// Provider status code for half time
pub const STATUS_HALFTIME: u8 = 3;
/// Provider status code for a finished match
pub const STATUS_ENDED: u8 = 8;

/// Match lifecycle as reported by the live feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Halftime,
    Finished,
}

impl MatchStatus {
    /// Parses a feed status string; anything unrecognized yields `None`
    pub fn from_wire(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Some(MatchStatus::Scheduled),
            "live" => Some(MatchStatus::Live),
            "halftime" => Some(MatchStatus::Halftime),
            "finished" => Some(MatchStatus::Finished),
            _ => None,
        }
    }

    /// The provider status code used for display
    pub fn display_code(self) -> u8 {
        match self {
            MatchStatus::Scheduled => STATUS_NOT_STARTED,
            MatchStatus::Live => STATUS_FIRST_HALF,
            MatchStatus::Halftime => STATUS_HALFTIME,
            MatchStatus::Finished => STATUS_ENDED,
        }
    }

    /// Maps a provider status code back to a lifecycle state
    ///
    /// Codes 2 and 4-7 (halves, extra time, penalties) are all `Live`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            STATUS_NOT_STARTED => Some(MatchStatus::Scheduled),
            STATUS_HALFTIME => Some(MatchStatus::Halftime),
            STATUS_ENDED => Some(MatchStatus::Finished),
            2 | 4..=7 => Some(MatchStatus::Live),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Halftime => "HT",
            MatchStatus::Finished => "FT",
        };
        f.write_str(label)
    }
}

/// Settlement state of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionResult {
    #[default]
    Pending,
    Won,
    Lost,
}

/// An AI-generated prediction for a single match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Unique identifier for the prediction
    pub id: String,
    /// Match the prediction refers to; `None` means it never receives live updates
    pub match_id: Option<String>,
    /// Name of the bot that produced the prediction
    pub bot_name: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    /// Market text, e.g. "IY 0.5 ÜST"
    pub prediction: String,
    /// Model confidence percentage, if reported
    pub confidence: Option<f64>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Provider status code (see `MatchStatus::display_code`)
    pub status_id: u8,
    /// Match minute while live
    pub minute: Option<u16>,
    pub result: PredictionResult,
    /// When the prediction was created
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    pub fn status(&self) -> Option<MatchStatus> {
        MatchStatus::from_code(self.status_id)
    }

    pub fn is_live(&self) -> bool {
        matches!(self.status(), Some(MatchStatus::Live | MatchStatus::Halftime))
    }

    /// Score as "H - A", or "-" before kick-off
    pub fn score_line(&self) -> String {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => format!("{} - {}", home, away),
            _ => "-".to_string(),
        }
    }
}

/// Aggregate performance of one prediction bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStats {
    pub bot_name: String,
    pub total: u32,
    pub won: u32,
    pub lost: u32,
    pub pending: u32,
}

impl BotStats {
    /// Percentage of settled predictions that won
    ///
    /// Returns `None` if nothing has settled yet.
    pub fn win_rate(&self) -> Option<f64> {
        let settled = self.won + self.lost;
        if settled == 0 {
            return None;
        }
        Some(f64::from(self.won) * 100.0 / f64::from(settled))
    }
}
