//! Per-country location pools.
//!
//! The game config's `country` selects which fixed list a round's location
//! is sampled from. Pools are compiled in; the `Global` pool carries the
//! classic location list.

use rand::Rng;

/// Country used when a config arrives without (or with an unknown) one.
pub const DEFAULT_COUNTRY: &str = "Canada";

const CANADA: &[&str] = &[
    "Hockey Arena",
    "Maple Syrup Farm",
    "Niagara Falls Tour Boat",
    "Ski Chalet",
    "Ice Fishing Hut",
    "CN Tower Restaurant",
    "Lumber Camp",
    "Polar Research Station",
    "Trans-Canada Train",
    "Curling Club",
    "National Park Campground",
    "Coastal Ferry",
];

const UNITED_STATES: &[&str] = &[
    "Baseball Stadium",
    "Hollywood Film Set",
    "Las Vegas Casino",
    "Grand Canyon Lookout",
    "Route 66 Diner",
    "Wall Street Bank",
    "State Fair",
    "Space Launch Facility",
    "County Courthouse",
    "Surf Shop",
    "National Mall",
    "Rodeo",
];

const GLOBAL: &[&str] = &[
    "Airplane",
    "Bank",
    "Beach",
    "Broadway Theater",
    "Casino",
    "Cathedral",
    "Circus Tent",
    "Corporate Party",
    "Crusader Army",
    "Day Spa",
    "Embassy",
    "Hospital",
    "Hotel",
    "Military Base",
    "Movie Studio",
    "Ocean Liner",
    "Passenger Train",
    "Pirate Ship",
    "Polar Station",
    "Police Station",
    "Restaurant",
    "School",
    "Service Station",
    "Space Station",
    "Submarine",
    "Supermarket",
    "University",
];

/// All selectable countries, in display order.
pub const COUNTRIES: &[&str] = &["Canada", "United States", "Global"];

/// The location pool for a country. Unknown countries fall back to the
/// default pool rather than failing a round start.
pub fn locations_for(country: &str) -> &'static [&'static str] {
    match country {
        "Canada" => CANADA,
        "United States" => UNITED_STATES,
        "Global" => GLOBAL,
        other => {
            tracing::warn!(country = other, "unknown country, using default pool");
            CANADA
        }
    }
}

/// Pick one location uniformly at random from the country's pool.
pub fn random_location(country: &str) -> &'static str {
    let pool = locations_for(country);
    let mut rng = rand::rng();
    pool[rng.random_range(0..pool.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_country_has_a_pool() {
        for country in COUNTRIES {
            assert!(!locations_for(country).is_empty());
        }
    }

    #[test]
    fn test_unknown_country_falls_back() {
        assert_eq!(locations_for("Atlantis"), locations_for(DEFAULT_COUNTRY));
    }

    #[test]
    fn test_random_location_draws_from_pool() {
        for _ in 0..50 {
            let location = random_location("Canada");
            assert!(locations_for("Canada").contains(&location));
        }
    }

    #[test]
    fn test_pools_have_no_duplicate_entries() {
        for country in COUNTRIES {
            let pool = locations_for(country);
            let mut seen = std::collections::HashSet::new();
            for location in pool {
                assert!(seen.insert(location), "duplicate location: {}", location);
            }
        }
    }
}
