//! Typed parsing of prediction and bot-statistics payloads
//!
//! Every endpoint answers with `{"success": bool, "data": ...}`. Both
//! camelCase and snake_case field names are accepted; anything else that is
//! missing or mistyped is a `SchemaMismatchError`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::data::schema::{bounded, deserialize_id, require, MAX_MINUTE, MAX_SCORE};
use crate::data::{BotStats, Prediction, PredictionResult, SchemaMismatchError};

/// Highest status code the provider defines
const MAX_STATUS_ID: u8 = 13;

/// Status fields of the `{"success", "message", "data"}` wrapper
#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Prediction record as sent by the API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrediction {
    #[serde(default, alias = "prediction_id", deserialize_with = "deserialize_id")]
    id: Option<String>,
    #[serde(default, alias = "match_id", deserialize_with = "deserialize_id")]
    match_id: Option<String>,
    #[serde(alias = "bot_name")]
    bot_name: Option<String>,
    #[serde(alias = "league_name")]
    league: Option<String>,
    #[serde(alias = "home_team")]
    home_team: Option<String>,
    #[serde(alias = "away_team")]
    away_team: Option<String>,
    #[serde(alias = "prediction_type")]
    prediction: Option<String>,
    confidence: Option<f64>,
    #[serde(alias = "home_score")]
    home_score: Option<i64>,
    #[serde(alias = "away_score")]
    away_score: Option<i64>,
    #[serde(alias = "status_id")]
    status_id: Option<i64>,
    minute: Option<i64>,
    result: Option<String>,
    #[serde(alias = "created_at")]
    created_at: Option<String>,
}

/// Bot statistics record as sent by the API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBotStat {
    #[serde(alias = "bot_name")]
    bot_name: Option<String>,
    #[serde(alias = "total_predictions")]
    total: Option<i64>,
    #[serde(alias = "wins")]
    won: Option<i64>,
    #[serde(alias = "losses")]
    lost: Option<i64>,
    pending: Option<i64>,
}

/// Unwraps the `{"success", "data"}` envelope
pub fn unwrap_envelope(body: &Value) -> Result<&Value, SchemaMismatchError> {
    let header =
        EnvelopeHeader::deserialize(body).map_err(|e| SchemaMismatchError::from_serde("$", e))?;

    if !header.success {
        let message = header
            .message
            .unwrap_or_else(|| "request reported failure".to_string());
        return Err(SchemaMismatchError::new("success", message));
    }

    body.get("data")
        .filter(|v| !v.is_null())
        .ok_or_else(|| SchemaMismatchError::new("data", "missing required field"))
}

fn parse_result(raw: Option<String>) -> Result<PredictionResult, SchemaMismatchError> {
    match raw.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("pending") => Ok(PredictionResult::Pending),
        Some("won") | Some("win") => Ok(PredictionResult::Won),
        Some("lost") | Some("lose") | Some("loss") => Ok(PredictionResult::Lost),
        Some(other) => Err(SchemaMismatchError::new(
            "result",
            format!("unknown result '{}'", other),
        )),
    }
}

impl TryFrom<RawPrediction> for Prediction {
    type Error = SchemaMismatchError;

    fn try_from(raw: RawPrediction) -> Result<Self, Self::Error> {
        let id = require(raw.id, "id")?;

        let created_raw = require(raw.created_at, "createdAt")?;
        let created_at = DateTime::parse_from_rfc3339(&created_raw)
            .map_err(|e| SchemaMismatchError::new("createdAt", e.to_string()))?
            .with_timezone(&Utc);

        let status_id = require(bounded(raw.status_id, "statusId", MAX_STATUS_ID)?, "statusId")?;

        Ok(Prediction {
            id,
            match_id: raw.match_id,
            bot_name: require(raw.bot_name, "botName")?,
            league: require(raw.league, "league")?,
            home_team: require(raw.home_team, "homeTeam")?,
            away_team: require(raw.away_team, "awayTeam")?,
            prediction: require(raw.prediction, "prediction")?,
            confidence: raw.confidence,
            home_score: bounded(raw.home_score, "homeScore", MAX_SCORE)?,
            away_score: bounded(raw.away_score, "awayScore", MAX_SCORE)?,
            status_id,
            minute: bounded(raw.minute, "minute", MAX_MINUTE)?,
            result: parse_result(raw.result)?,
            created_at,
        })
    }
}

impl TryFrom<RawBotStat> for BotStats {
    type Error = SchemaMismatchError;

    /// `pending` may be omitted, in which case it is derived from the totals
    fn try_from(raw: RawBotStat) -> Result<Self, Self::Error> {
        let total = require(bounded(raw.total, "total", u32::MAX)?, "total")?;
        let won = require(bounded(raw.won, "won", u32::MAX)?, "won")?;
        let lost = require(bounded(raw.lost, "lost", u32::MAX)?, "lost")?;
        let pending = bounded(raw.pending, "pending", u32::MAX)?
            .unwrap_or_else(|| total.saturating_sub(won).saturating_sub(lost));

        Ok(BotStats {
            bot_name: require(raw.bot_name, "botName")?,
            total,
            won,
            lost,
            pending,
        })
    }
}

/// Parses a single prediction record
pub fn parse_prediction(value: &Value) -> Result<Prediction, SchemaMismatchError> {
    RawPrediction::deserialize(value)
        .map_err(|e| SchemaMismatchError::from_serde("prediction", e))?
        .try_into()
}

/// Parses a predictions response body
pub fn parse_predictions(body: &Value) -> Result<Vec<Prediction>, SchemaMismatchError> {
    Vec::<RawPrediction>::deserialize(unwrap_envelope(body)?)
        .map_err(|e| SchemaMismatchError::from_serde("data", e))?
        .into_iter()
        .map(Prediction::try_from)
        .collect()
}

/// Parses a single bot statistics record
pub fn parse_bot_stat(value: &Value) -> Result<BotStats, SchemaMismatchError> {
    RawBotStat::deserialize(value)
        .map_err(|e| SchemaMismatchError::from_serde("bot", e))?
        .try_into()
}

/// Parses a bot statistics response body
pub fn parse_bot_stats(body: &Value) -> Result<Vec<BotStats>, SchemaMismatchError> {
    Vec::<RawBotStat>::deserialize(unwrap_envelope(body)?)
        .map_err(|e| SchemaMismatchError::from_serde("data", e))?
        .into_iter()
        .map(BotStats::try_from)
        .collect()
}
