//! Status enums for shops.

use serde::{Deserialize, Serialize};

/// Operational status of a shop as reported by volunteers.
///
/// Stored as lowercase text (`unknown`, `safe`, `danger`, `looted`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ShopStatus {
    /// Nobody has reported on this shop yet.
    #[default]
    Unknown,
    /// Open and safe to visit.
    Safe,
    /// Dangerous area or hostile crowd.
    Danger,
    /// Emptied or damaged.
    Looted,
}

impl ShopStatus {
    /// Every status value, in display order.
    pub const ALL: [Self; 4] = [Self::Unknown, Self::Safe, Self::Danger, Self::Looted];

    /// Returns the stored text form of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Safe => "safe",
            Self::Danger => "danger",
            Self::Looted => "looted",
        }
    }
}

impl std::fmt::Display for ShopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShopStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "safe" => Ok(Self::Safe),
            "danger" => Ok(Self::Danger),
            "looted" => Ok(Self::Looted),
            _ => Err(format!("invalid shop status: {s}")),
        }
    }
}
