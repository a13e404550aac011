//! Shared pieces of the wire boundary
//!
//! Payloads are deserialized into private `Raw*` structs and then mapped to
//! domain types. The mapping step reports a `SchemaMismatchError` naming the
//! offending field instead of quietly substituting defaults.

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Highest plausible goal count for one side
pub const MAX_SCORE: u32 = 999;

/// Highest plausible match minute, extra time and stoppage included
pub const MAX_MINUTE: u16 = 200;

/// A wire payload did not have the expected shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema mismatch at `{field}`: {reason}")]
pub struct SchemaMismatchError {
    /// Name of the offending field (or `$` for the payload itself)
    pub field: String,
    pub reason: String,
}

impl SchemaMismatchError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a deserialization failure of the value at `field`
    pub fn from_serde(field: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(field, err.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

/// Deserializes an identifier sent as either a string or an integer
///
/// `null` and the empty string both read as absent. Use together with
/// `#[serde(default)]` so a missing field is also `None`.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawId>::deserialize(deserializer)? {
        None => None,
        Some(RawId::Text(s)) if s.is_empty() => None,
        Some(RawId::Text(s)) => Some(s),
        Some(RawId::Signed(n)) => Some(n.to_string()),
        Some(RawId::Unsigned(n)) => Some(n.to_string()),
    })
}

/// Turns an absent required field into an error
pub fn require<T>(value: Option<T>, field: &str) -> Result<T, SchemaMismatchError> {
    value.ok_or_else(|| SchemaMismatchError::new(field, "missing required field"))
}

/// Checks that an optional count lies in `0..=max` and narrows it
pub fn bounded<T>(
    value: Option<i64>,
    field: &str,
    max: T,
) -> Result<Option<T>, SchemaMismatchError>
where
    T: Copy + Into<i64> + TryFrom<i64>,
{
    let Some(n) = value else {
        return Ok(None);
    };
    if n < 0 {
        return Err(SchemaMismatchError::new(field, "expected a non-negative integer"));
    }
    if n > max.into() {
        return Err(SchemaMismatchError::new(
            field,
            format!("{} exceeds maximum {}", n, max.into()),
        ));
    }
    T::try_from(n)
        .map(Some)
        .map_err(|_| SchemaMismatchError::new(field, "integer out of range"))
}
