//! Non-mutating projection of live updates onto a record list

use std::collections::HashMap;
use std::sync::Arc;

use super::MatchUpdate;
use crate::data::Prediction;

/// A record that can receive live score updates
pub trait LiveRecord: Sized {
    /// Match identifier, or `None` if the record never receives updates
    fn match_id(&self) -> Option<&str>;

    /// Returns a copy of `self` with the update's display fields applied
    fn with_update(&self, update: &MatchUpdate) -> Self;
}

impl LiveRecord for Prediction {
    fn match_id(&self) -> Option<&str> {
        self.match_id.as_deref()
    }

    fn with_update(&self, update: &MatchUpdate) -> Self {
        let mut merged = self.clone();
        if let Some(home) = update.home_score {
            merged.home_score = Some(home);
        }
        if let Some(away) = update.away_score {
            merged.away_score = Some(away);
        }
        // unknown status keeps whatever the record already showed
        if let Some(status) = update.status {
            merged.status_id = status.display_code();
        }
        if let Some(minute) = update.minute {
            merged.minute = Some(minute);
        }
        merged
    }
}

/// Folds pending live updates into `records`
///
/// The result has the same order and length as `records`. Records without a
/// match id or without a pending update are the same `Arc` as the input, so
/// callers can compare with `Arc::ptr_eq` to skip redrawing them. Neither
/// input is modified.
pub fn merge_live_updates<R: LiveRecord>(
    records: &[Arc<R>],
    updates: &HashMap<String, MatchUpdate>,
) -> Vec<Arc<R>> {
    records
        .iter()
        .map(|record| {
            match record.match_id().and_then(|id| updates.get(id)) {
                Some(update) => Arc::new(record.with_update(update)),
                None => Arc::clone(record),
            }
        })
        .collect()
}
