//! Timestamp text encoding.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! microsecond precision (`2026-01-02T03:04:05.000006Z`). Fixed width keeps
//! SQL text comparison in chronological order, which the sync watermark
//! relies on.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp in the stored text form.
#[must_use]
pub fn format(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse any RFC 3339 timestamp and convert it to UTC.
///
/// # Errors
///
/// Returns the `chrono` parse error if the input is not RFC 3339.
pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}

/// Serde adapter for optional timestamps in the stored text form.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize an optional timestamp.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)] // signature imposed by serde(with)
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&super::format(*ts)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional timestamp.
    ///
    /// # Errors
    ///
    /// Returns a custom error if the string is not RFC 3339.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
