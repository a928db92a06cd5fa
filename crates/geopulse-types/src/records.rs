//! Wire format of the inbound poll source.
//!
//! The source answers each poll with a JSON array of [`RawRecord`]s. Field
//! presence and types are enforced by `serde` (a missing field fails the
//! whole batch); value ranges are enforced per record through
//! [`validator::Validate`] so one bad coordinate does not discard the rest
//! of the batch.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use validator::Validate;

/// One package record as delivered by the poll source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RawRecord {
    /// Latitude in degrees.
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Longitude in degrees.
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Category label (country name or code).
    #[validate(length(min = 1))]
    pub country: String,
    /// Whether the package is flagged as suspicious.
    ///
    /// Accepts JSON booleans as well as the numeric 0/1 flags emitted by
    /// the CSV replay sender.
    #[serde(deserialize_with = "deserialize_flag")]
    pub suspicious: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Float(f64),
}

/// Deserialize a truthy flag from a boolean or a number (non-zero = set).
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match FlagRepr::deserialize(deserializer)? {
        FlagRepr::Bool(flag) => flag,
        FlagRepr::Int(value) => value != 0,
        FlagRepr::Float(value) => value.abs() > f64::EPSILON,
    })
}
