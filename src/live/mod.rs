//! Live score updates
//!
//! Push updates arrive over a WebSocket (`feed`), are validated at the wire
//! boundary (`wire`), kept as the latest update per match (`LiveState`), and
//! projected onto prediction lists without mutating them (`merge`).

pub mod feed;
pub mod merge;
pub mod wire;

pub use feed::{ConnectionState, FeedError, LiveFeed};
pub use merge::{merge_live_updates, LiveRecord};
pub use wire::{parse_feed_message, parse_match_update, FeedMessage};

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::data::MatchStatus;

/// The most recent push update for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchUpdate {
    pub match_id: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// `None` when the feed sent a status we do not recognize
    pub status: Option<MatchStatus>,
    /// Only meaningful while `status` is `Live`
    pub minute: Option<u16>,
}

impl MatchUpdate {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            home_score: None,
            away_score: None,
            status: None,
            minute: None,
        }
    }
}

/// Latest update per tracked match
///
/// Updates replace each other wholesale. Changing the tracked set or calling
/// `clear` drops everything so scores from a previous subscription never leak
/// into the next one.
#[derive(Debug, Default)]
pub struct LiveState {
    tracked: BTreeSet<String>,
    updates: HashMap<String, MatchUpdate>,
}

impl LiveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> &BTreeSet<String> {
        &self.tracked
    }

    pub fn updates(&self) -> &HashMap<String, MatchUpdate> {
        &self.updates
    }

    /// Replaces the tracked set, clearing updates if it changed
    ///
    /// Returns `true` if the set changed.
    pub fn retrack(&mut self, ids: BTreeSet<String>) -> bool {
        if ids == self.tracked {
            return false;
        }
        self.tracked = ids;
        self.updates.clear();
        true
    }

    /// Stores `update` as the latest for its match
    ///
    /// Returns `false` (and drops the update) if the match is not tracked.
    pub fn apply(&mut self, update: MatchUpdate) -> bool {
        if !self.tracked.contains(&update.match_id) {
            return false;
        }
        self.updates.insert(update.match_id.clone(), update);
        true
    }

    pub fn clear(&mut self) {
        self.updates.clear();
    }
}
