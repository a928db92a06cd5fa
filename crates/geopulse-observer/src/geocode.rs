//! Offline reverse geocoding for packages submitted without a country.
//!
//! Coordinates are matched to the nearest known place in the embedded
//! `reverse_geocoder` city table, and its ISO 3166-1 alpha-2 code is
//! expanded to the country's English name. The table is loaded on first
//! use and kept for the life of the process.

use std::sync::LazyLock;

use isocountry::CountryCode;
use reverse_geocoder::ReverseGeocoder;
use tracing::{debug, info};

use crate::collector::UNKNOWN_COUNTRY;

static GEOCODER: LazyLock<ReverseGeocoder> = LazyLock::new(|| {
    let geocoder = ReverseGeocoder::new();
    info!("Reverse geocoding table loaded");
    geocoder
});

/// Name of the country nearest to (`latitude`, `longitude`).
///
/// Codes without an ISO entry are returned as-is. Non-finite or
/// out-of-range coordinates resolve to [`UNKNOWN_COUNTRY`].
pub fn country_for(latitude: f64, longitude: f64) -> String {
    if !((-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)) {
        return UNKNOWN_COUNTRY.to_owned();
    }

    let code = &GEOCODER.search((latitude, longitude)).record.cc;
    if code.trim().is_empty() {
        return UNKNOWN_COUNTRY.to_owned();
    }

    CountryCode::for_alpha2(code).map_or_else(
        |_| {
            debug!(code = %code, "No ISO country for code");
            code.clone()
        },
        |country| country.name().to_owned(),
    )
}

/// [`country_for`] on the blocking pool, since the first call loads the
/// table.
pub async fn resolve_country(latitude: f64, longitude: f64) -> String {
    tokio::task::spawn_blocking(move || country_for(latitude, longitude))
        .await
        .unwrap_or_else(|_| UNKNOWN_COUNTRY.to_owned())
}
