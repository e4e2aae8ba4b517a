//! City name type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CityName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CityNameError {
    /// The input is empty or only whitespace.
    #[error("city name cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("city name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains control characters.
    #[error("city name cannot contain control characters")]
    ControlCharacter,
}

/// A user-typed city name.
///
/// The name is stored trimmed but otherwise as typed, so rows keep the
/// spelling of whoever loaded the city first. Comparisons against stored rows
/// go through [`CityName::key`], which is case-insensitive.
///
/// ## Examples
///
/// ```
/// use rescue_map_core::CityName;
///
/// let city = CityName::parse("  saint-étienne ").unwrap();
/// assert_eq!(city.as_str(), "saint-étienne");
/// assert_eq!(city.title_case(), "Saint-Étienne");
/// assert_eq!(city.key(), "saint-étienne");
///
/// assert!(CityName::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CityName(String);

impl CityName {
    /// Maximum length of a city name, in characters.
    pub const MAX_LENGTH: usize = 100;

    /// Parse a `CityName` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`CityName::MAX_LENGTH`] characters, or contains control characters.
    pub fn parse(s: &str) -> Result<Self, CityNameError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CityNameError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(CityNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed.chars().any(char::is_control) {
            return Err(CityNameError::ControlCharacter);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the city name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CityName` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Case-insensitive key used for locking and lookups.
    #[must_use]
    pub fn key(&self) -> String {
        self.0.to_lowercase()
    }

    /// Title-cased form: the first letter of every word is uppercased and the
    /// rest lowercased. A word starts after any non-alphabetic character, so
    /// `aix-en-provence` becomes `Aix-En-Provence`.
    #[must_use]
    pub fn title_case(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut at_word_start = true;
        for c in self.0.chars() {
            if c.is_alphabetic() {
                if at_word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                at_word_start = false;
            } else {
                out.push(c);
                at_word_start = true;
            }
        }
        out
    }
}

impl fmt::Display for CityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CityName {
    type Err = CityNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CityName {
    type Error = CityNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CityName> for String {
    fn from(city: CityName) -> Self {
        city.0
    }
}

impl AsRef<str> for CityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
