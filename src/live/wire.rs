//! Live feed wire format
//!
//! Server frames look like `{"type": "match_update", "data": {...}}`; the
//! client subscribes with `{"type": "subscribe", "matchIds": [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::MatchUpdate;
use crate::data::schema::{bounded, deserialize_id, require, MAX_MINUTE, MAX_SCORE};
use crate::data::{MatchStatus, SchemaMismatchError};

/// A decoded server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    MatchUpdate(MatchUpdate),
    /// Any other frame type; carried for logging only
    Other(String),
}

/// Outer frame; `data` is decoded once the type is known
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type", alias = "event")]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatchUpdate {
    #[serde(default, alias = "match_id", deserialize_with = "deserialize_id")]
    match_id: Option<String>,
    #[serde(alias = "home_score")]
    home_score: Option<i64>,
    #[serde(alias = "away_score")]
    away_score: Option<i64>,
    status: Option<String>,
    minute: Option<i64>,
}

/// Subscription request sent after connecting
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeCommand<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    match_ids: Vec<&'a str>,
}

impl<'a> SubscribeCommand<'a> {
    pub fn new(match_ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            kind: "subscribe",
            match_ids: match_ids.into_iter().collect(),
        }
    }
}

impl TryFrom<RawMatchUpdate> for MatchUpdate {
    type Error = SchemaMismatchError;

    fn try_from(raw: RawMatchUpdate) -> Result<Self, Self::Error> {
        let match_id = require(raw.match_id, "matchId")?;

        let status = raw.status.and_then(|s| {
            let parsed = MatchStatus::from_wire(&s);
            if parsed.is_none() {
                warn!(match_id = %match_id, status = %s, "unrecognized match status");
            }
            parsed
        });

        Ok(MatchUpdate {
            home_score: bounded(raw.home_score, "homeScore", MAX_SCORE)?,
            away_score: bounded(raw.away_score, "awayScore", MAX_SCORE)?,
            minute: bounded(raw.minute, "minute", MAX_MINUTE)?,
            status,
            match_id,
        })
    }
}

/// Validates one update payload
///
/// `matchId` is required. An unrecognized `status` is not an error: it is
/// logged and left as `None` so the merge keeps the prior status.
pub fn parse_match_update(value: &Value) -> Result<MatchUpdate, SchemaMismatchError> {
    RawMatchUpdate::deserialize(value)
        .map_err(|e| SchemaMismatchError::from_serde("data", e))?
        .try_into()
}

/// Decodes one text frame from the feed
pub fn parse_feed_message(text: &str) -> Result<FeedMessage, SchemaMismatchError> {
    let frame: RawFrame =
        serde_json::from_str(text).map_err(|e| SchemaMismatchError::from_serde("$", e))?;

    let kind = require(frame.kind, "type")?;
    if kind != "match_update" {
        return Ok(FeedMessage::Other(kind));
    }

    let data = require(frame.data, "data")?;
    parse_match_update(&data).map(FeedMessage::MatchUpdate)
}
