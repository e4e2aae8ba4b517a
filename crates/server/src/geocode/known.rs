//! Curated table of major French cities.

use async_trait::async_trait;

use rescue_map_core::{CityName, Coordinates};

use super::{CoordinateSource, GeocodeError, ResolutionSource};

/// A city with curated coordinates and search radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownCity {
    /// Title-cased name.
    pub name: &'static str,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Search radius in kilometres.
    pub radius: f64,
}

impl KnownCity {
    /// The city's coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon, self.radius)
    }
}

/// Known cities, in match priority order for fuzzy lookups.
pub const KNOWN_CITIES: &[KnownCity] = &[
    KnownCity {
        name: "Paris",
        lat: 48.8566,
        lon: 2.3522,
        radius: 15.0,
    },
    KnownCity {
        name: "Toulouse",
        lat: 43.6045,
        lon: 1.4440,
        radius: 20.0,
    },
    KnownCity {
        name: "Lyon",
        lat: 45.7640,
        lon: 4.8357,
        radius: 15.0,
    },
    KnownCity {
        name: "Marseille",
        lat: 43.2965,
        lon: 5.3698,
        radius: 20.0,
    },
    KnownCity {
        name: "Bordeaux",
        lat: 44.8378,
        lon: -0.5792,
        radius: 15.0,
    },
    KnownCity {
        name: "Lille",
        lat: 50.6292,
        lon: 3.0573,
        radius: 10.0,
    },
    KnownCity {
        name: "Nantes",
        lat: 47.2184,
        lon: -1.5536,
        radius: 15.0,
    },
    KnownCity {
        name: "Strasbourg",
        lat: 48.5734,
        lon: 7.7521,
        radius: 10.0,
    },
    KnownCity {
        name: "Montpellier",
        lat: 43.6109,
        lon: 3.8772,
        radius: 10.0,
    },
    KnownCity {
        name: "Nice",
        lat: 43.7102,
        lon: 7.2620,
        radius: 10.0,
    },
];

/// Exact match of the title-cased name against [`KNOWN_CITIES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KnownCities;

impl KnownCities {
    /// Look up a city without going through the async trait.
    #[must_use]
    pub fn lookup(city: &CityName) -> Option<&'static KnownCity> {
        let title = city.title_case();
        KNOWN_CITIES.iter().find(|known| known.name == title)
    }
}

#[async_trait]
impl CoordinateSource for KnownCities {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::KnownCity
    }

    async fn locate(&self, city: &CityName) -> Result<Option<Coordinates>, GeocodeError> {
        Ok(Self::lookup(city).map(KnownCity::coordinates))
    }
}

/// Loose match against [`KNOWN_CITIES`], used after the geocoders.
///
/// Matches when either name contains the other (case-insensitively) or when
/// both are equal once hyphens and spaces are treated alike. The first entry
/// of the table that matches wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyKnownCities;

impl FuzzyKnownCities {
    /// Look up a city without going through the async trait.
    #[must_use]
    pub fn lookup(city: &CityName) -> Option<&'static KnownCity> {
        let input = city.key();
        let input_normalized = normalize_separators(&input);

        KNOWN_CITIES.iter().find(|known| {
            let name = known.name.to_lowercase();
            input.contains(&name)
                || name.contains(&input)
                || normalize_separators(&name) == input_normalized
        })
    }
}

#[async_trait]
impl CoordinateSource for FuzzyKnownCities {
    fn source(&self) -> ResolutionSource {
        ResolutionSource::FuzzyMatch
    }

    async fn locate(&self, city: &CityName) -> Result<Option<Coordinates>, GeocodeError> {
        Ok(Self::lookup(city).map(KnownCity::coordinates))
    }
}

/// Collapse runs of hyphens and whitespace into a single `-`.
fn normalize_separators(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_separator = false;
    for c in s.chars() {
        if c == '-' || c.is_whitespace() {
            pending_separator = true;
        } else {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c);
        }
    }
    out
}
