//! Travel time estimation between stops

use crate::config::TravelConfig;
use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Travel cost reported for stops beyond the configured range
pub const UNREACHABLE_MINUTES: u32 = 10_000;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// A located stop as the estimator sees it
#[derive(Debug, Clone, Copy)]
pub struct TravelStop<'a> {
    pub coordinates: Coordinates,
    pub address: &'a str,
}

/// Deterministic travel-minutes estimator.
///
/// Same-building stops cost a flat constant regardless of raw distance;
/// everything else is great-circle distance scaled to a road estimate and
/// pushed through piecewise speed bands, with a fixed preparation time, a
/// same-street discount, and a clamp to the configured minute range.
/// Distances beyond the configured range report [`UNREACHABLE_MINUTES`]
/// instead of erroring.
#[derive(Debug, Clone)]
pub struct TravelTimeEstimator {
    config: TravelConfig,
}

impl TravelTimeEstimator {
    pub fn new(config: TravelConfig) -> Self {
        Self { config }
    }

    /// Estimate travel minutes between two stops
    pub fn minutes(&self, from: TravelStop<'_>, to: TravelStop<'_>) -> u32 {
        let cfg = &self.config;

        if same_building(from.address, to.address) {
            return cfg.same_building_minutes;
        }

        let km = haversine_distance(&from.coordinates, &to.coordinates);
        if km > cfg.max_range_km {
            return UNREACHABLE_MINUTES;
        }

        let road_km = km * cfg.road_factor;
        let speed_kmh = if road_km < cfg.walk_cutoff_km {
            cfg.walk_speed_kmh
        } else if road_km < cfg.mixed_cutoff_km {
            cfg.mixed_speed_kmh
        } else {
            cfg.vehicle_speed_kmh
        };

        let mut estimate = (road_km / speed_kmh) * 60.0 + cfg.base_minutes as f64;
        if km <= cfg.same_street_max_km && same_street(from.address, to.address) {
            estimate -= cfg.same_street_discount_minutes as f64;
        }

        (estimate.ceil() as i64).clamp(cfg.min_minutes as i64, cfg.max_minutes as i64) as u32
    }

    /// Calculate travel-minutes matrix between all stops
    /// Returns a 2D vector where matrix[i][j] is minutes from stop i to stop j
    pub fn matrix(&self, stops: &[TravelStop<'_>]) -> Vec<Vec<u32>> {
        let n = stops.len();
        let mut matrix = vec![vec![0u32; n]; n];

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    matrix[i][j] = self.minutes(stops[i], stops[j]);
                }
            }
        }

        matrix
    }

    /// Fixed preparation minutes charged on every non-same-building leg
    pub fn base_minutes(&self) -> u32 {
        self.config.base_minutes
    }
}

fn normalize_building(address: &str) -> String {
    address
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn same_building(a: &str, b: &str) -> bool {
    let a = normalize_building(a);
    !a.is_empty() && a == normalize_building(b)
}

/// Street part of an address: the segment before the first comma with
/// trailing house-number tokens stripped.
fn street_of(address: &str) -> String {
    let head = address.split(',').next().unwrap_or("");
    let mut tokens: Vec<&str> = head.split_whitespace().collect();
    while let Some(last) = tokens.last() {
        if last.chars().any(|c| c.is_ascii_digit()) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ").to_lowercase()
}

fn same_street(a: &str, b: &str) -> bool {
    let a = street_of(a);
    !a.is_empty() && a == street_of(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(lat: f64, lng: f64, address: &str) -> TravelStop<'_> {
        TravelStop {
            coordinates: Coordinates { lat, lng },
            address,
        }
    }

    fn estimator() -> TravelTimeEstimator {
        TravelTimeEstimator::new(TravelConfig::default())
    }

    #[test]
    fn test_haversine_prague_brno() {
        let prague = Coordinates { lat: 50.0755, lng: 14.4378 };
        let brno = Coordinates { lat: 49.1951, lng: 16.6068 };

        let distance = haversine_distance(&prague, &brno);

        // Prague to Brno is approximately 185 km
        assert!((distance - 185.0).abs() < 5.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinates { lat: 50.0, lng: 14.0 };
        assert!(haversine_distance(&point, &point).abs() < 0.001);
    }

    #[test]
    fn test_same_building_is_flat_constant() {
        // ~50 m apart but the same building string
        let a = stop(50.0800, 14.4300, "Vodickova 12, Praha 1");
        let b = stop(50.0804, 14.4301, "Vodickova  12,  Praha 1");
        assert_eq!(estimator().minutes(a, b), 3);
    }

    #[test]
    fn test_same_building_ignores_distance() {
        // Even an absurd distance keeps the flat cost when the building matches
        let a = stop(50.0, 14.0, "Vodickova 12");
        let b = stop(49.0, 16.0, "vodickova 12");
        assert_eq!(estimator().minutes(a, b), 3);
    }

    #[test]
    fn test_empty_addresses_never_match_as_building() {
        let a = stop(50.0, 14.0, "");
        let b = stop(50.0001, 14.0, "");
        assert!(estimator().minutes(a, b) > 0);
        assert_ne!(estimator().minutes(a, b), 3);
    }

    #[test]
    fn test_walking_band_short_hop() {
        // 0.002 deg lat ~ 0.222 km; road 0.289 km -> walking band
        // 0.289 / 5 * 60 + 5 = 8.47 -> 9
        let a = stop(50.000, 14.0, "Krymska 5, Praha 10");
        let b = stop(50.002, 14.0, "Slezska 40, Praha 2");
        assert_eq!(estimator().minutes(a, b), 9);
    }

    #[test]
    fn test_same_street_discount_applies_close_by() {
        // Same hop as above but both stops on one street -> minus 2 minutes
        let a = stop(50.000, 14.0, "Krymska 5, Praha 10");
        let b = stop(50.002, 14.0, "Krymska 28, Praha 10");
        assert_eq!(estimator().minutes(a, b), 7);
    }

    #[test]
    fn test_vehicle_band_longer_leg() {
        // 0.09 deg lat ~ 10.01 km; road 13.01 km -> vehicle band
        // 13.01 / 40 * 60 + 5 = 24.5 -> 25
        let a = stop(50.00, 14.0, "A 1");
        let b = stop(50.09, 14.0, "B 2");
        assert_eq!(estimator().minutes(a, b), 25);
    }

    #[test]
    fn test_clamped_to_max_minutes() {
        // ~47.8 km is inside range but the estimate exceeds the 90 min cap
        let a = stop(50.00, 14.0, "A 1");
        let b = stop(50.43, 14.0, "B 2");
        assert_eq!(estimator().minutes(a, b), 90);
    }

    #[test]
    fn test_beyond_range_is_unreachable() {
        // ~60 km, beyond the default 50 km range
        let a = stop(50.00, 14.0, "A 1");
        let b = stop(50.54, 14.0, "B 2");
        assert_eq!(estimator().minutes(a, b), UNREACHABLE_MINUTES);
    }

    #[test]
    fn test_estimate_is_symmetric() {
        let a = stop(50.00, 14.00, "A 1");
        let b = stop(50.03, 14.02, "B 2");
        let est = estimator();
        assert_eq!(est.minutes(a, b), est.minutes(b, a));
    }

    #[test]
    fn test_min_clamp() {
        let mut config = TravelConfig::default();
        config.base_minutes = 0;
        let est = TravelTimeEstimator::new(config);
        let a = stop(50.0, 14.0, "A 1");
        let b = stop(50.0, 14.0, "B 2");
        assert_eq!(est.minutes(a, b), 1);
    }

    #[test]
    fn test_matrix_diagonal_and_symmetry() {
        let stops = vec![
            stop(50.00, 14.00, "A 1"),
            stop(50.01, 14.01, "B 2"),
            stop(50.02, 14.02, "C 3"),
        ];
        let matrix = estimator().matrix(&stops);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix[0][0], 0);
        assert_eq!(matrix[1][1], 0);
        assert_eq!(matrix[0][1], matrix[1][0]);
        assert!(matrix[0][2] > 0);
    }

    #[test]
    fn test_street_extraction() {
        assert_eq!(street_of("Na Prikope 12, Praha 1"), "na prikope");
        assert_eq!(street_of("Krymska 5"), "krymska");
        assert_eq!(street_of("12"), "");
        assert!(same_street("Krymska 5, Praha 10", "KRYMSKA 28"));
        assert!(!same_street("Krymska 5", "Slezska 5"));
    }
}
