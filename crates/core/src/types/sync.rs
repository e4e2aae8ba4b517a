//! Sync envelopes exchanged between independent stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Shop;

/// A batch of changed rows exported from one store.
///
/// `timestamp` is the exporter's clock at export time; the importer keeps it
/// as the watermark for its next pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncChangeSet {
    /// Export cursor.
    #[serde(with = "timestamp_text")]
    pub timestamp: DateTime<Utc>,
    /// Changed rows, applied in order on import.
    pub changes: Vec<Shop>,
}

impl SyncChangeSet {
    /// Number of rows in the change set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the change set carries no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Last watermark received from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Peer base URL.
    pub peer: String,
    /// Timestamp of the last change set imported from the peer.
    pub watermark: DateTime<Utc>,
    /// When the cursor was last advanced.
    pub updated_at: DateTime<Utc>,
}

mod timestamp_text {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::types::timestamp::format(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::types::timestamp::parse(&s).map_err(serde::de::Error::custom)
    }
}
