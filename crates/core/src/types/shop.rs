//! Shop records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ShopId, ShopStatus};

/// A persisted shop.
///
/// This is both the API representation and the sync wire format, so every
/// column of the `supermarkets` table is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    /// Store-assigned identifier.
    pub id: ShopId,
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Category tag (`supermarket`, `convenience`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Street address, rarely known.
    #[serde(default)]
    pub address: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: ShopStatus,
    /// When the status was last changed.
    #[serde(default, with = "super::timestamp::option")]
    pub last_verified: Option<DateTime<Utc>>,
    /// Free-text notes from the last reporter.
    #[serde(default)]
    pub notes: Option<String>,
    /// Owning city.
    pub city: String,
}

/// A shop found by the map-data service or synthesized, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopCandidate {
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: String,
}
