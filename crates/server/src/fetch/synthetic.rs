//! Plausible stand-in inventories for when no real data is available.

use rand::Rng;

use rescue_map_core::{CityName, Coordinates, ShopCandidate};

/// Fewest shops a synthetic inventory holds.
pub const MIN_SHOPS: usize = 15;
/// Most shops a synthetic inventory holds.
pub const MAX_SHOPS: usize = 35;

const LARGE_CITIES: &[&str] = &["paris", "marseille", "lyon", "toulouse"];
const MEDIUM_CITIES: &[&str] = &[
    "nice",
    "nantes",
    "strasbourg",
    "montpellier",
    "bordeaux",
    "lille",
    "rennes",
    "reims",
    "toulon",
    "grenoble",
    "dijon",
    "angers",
];

const SUPERMARKET_CHAINS: &[&str] = &[
    "Carrefour Market",
    "Super U",
    "Intermarché",
    "Casino",
    "Monoprix",
    "Lidl",
    "Aldi",
];
const CONVENIENCE_CHAINS: &[&str] = &[
    "Carrefour City",
    "Franprix",
    "Proxi",
    "Spar",
    "Vival",
    "Utile",
];
const HYPERMARKET_CHAINS: &[&str] = &[
    "E.Leclerc",
    "Auchan",
    "Carrefour",
    "Hyper U",
    "Géant Casino",
];
const DISTRICTS: &[&str] = &["Centre", "Nord", "Sud", "Est", "Ouest", "Gare"];

/// Degrees of latitude a generated shop may lie from the center.
#[must_use]
pub fn scatter_degrees(city: &CityName) -> f64 {
    let key = city.key();
    if LARGE_CITIES.contains(&key.as_str()) {
        0.12
    } else if MEDIUM_CITIES.contains(&key.as_str()) {
        0.08
    } else {
        0.04
    }
}

/// Longitude spread matching `lat_spread` at latitude `lat`.
#[must_use]
pub fn longitude_spread(lat_spread: f64, lat: f64) -> f64 {
    lat_spread / lat.to_radians().cos().max(0.1)
}

/// Generate between [`MIN_SHOPS`] and [`MAX_SHOPS`] shops scattered around `center`.
pub fn generate<R: Rng + ?Sized>(
    city: &CityName,
    center: &Coordinates,
    rng: &mut R,
) -> Vec<ShopCandidate> {
    let count = rng.random_range(MIN_SHOPS..=MAX_SHOPS);
    let lat_spread = scatter_degrees(city);
    let lon_spread = longitude_spread(lat_spread, center.lat);
    let display_name = city.title_case();

    (0..count)
        .map(|_| {
            let (kind, chains) = pick_category(rng);
            let chain = pick(chains, rng);
            let name = if rng.random_bool(0.5) {
                format!("{chain} {display_name} {}", pick(DISTRICTS, rng))
            } else {
                format!("{chain} {display_name}")
            };

            ShopCandidate {
                name,
                lat: center.lat + rng.random_range(-lat_spread..=lat_spread),
                lon: center.lon + rng.random_range(-lon_spread..=lon_spread),
                kind: kind.to_string(),
            }
        })
        .collect()
}

/// 50% supermarket, 30% convenience, 20% hypermarket.
fn pick_category<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static [&'static str]) {
    match rng.random_range(0..10) {
        0..5 => ("supermarket", SUPERMARKET_CHAINS),
        5..8 => ("convenience", CONVENIENCE_CHAINS),
        _ => ("hypermarket", HYPERMARKET_CHAINS),
    }
}

fn pick<R: Rng + ?Sized>(items: &[&'static str], rng: &mut R) -> &'static str {
    items
        .get(rng.random_range(0..items.len()))
        .copied()
        .unwrap_or_default()
}
