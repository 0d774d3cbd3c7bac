//! Spreads markers that share a coordinate around a small ring.
//!
//! Groups are keyed by the exact `(lat, lon)` pair, no tolerance. Two
//! coordinates that differ only by float noise form separate groups.
//! Offsets are fixed at registration and never recomputed as a group grows.

use std::f64::consts::TAU;

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::geo::projector::{project, Vec3};

/// Ring radius in degrees of latitude/longitude.
pub const DEFAULT_OFFSET_DEG: f64 = 1.5;
/// Groups up to this size are spaced evenly at `TAU / MIN_RING_SLOTS`.
pub const MIN_RING_SLOTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },
}

type CoordKey = (OrderedFloat<f64>, OrderedFloat<f64>);

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Placement {
    pub entity_id: String,
    pub lat: f64,
    pub lon: f64,
    pub adjusted_lat: f64,
    pub adjusted_lon: f64,
    pub group_index: usize,
    pub angle: f64,
}

impl Placement {
    pub fn position(&self, radius: f64) -> Vec3 {
        project(self.adjusted_lat, self.adjusted_lon, radius)
    }
}

/// Angle for the `index`-th member once the group holds `group_size` members.
pub fn ring_angle(index: usize, group_size: usize) -> f64 {
    index as f64 * TAU / group_size.max(MIN_RING_SLOTS) as f64
}

#[derive(Debug, Default)]
struct Registry {
    groups: AHashMap<CoordKey, Vec<String>>, // insertion order preserved per group
    placements: Vec<Placement>,
}

/// Owns every location group for the lifetime of the host.
///
/// `register` takes a single lock around append + offset so concurrent
/// callers never receive the same slot.
#[derive(Debug)]
pub struct MarkerClusterer {
    distance_deg: f64,
    inner: Mutex<Registry>,
}

impl Default for MarkerClusterer {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET_DEG)
    }
}

impl MarkerClusterer {
    pub fn new(distance_deg: f64) -> Self {
        Self { distance_deg, inner: Mutex::new(Registry::default()) }
    }

    pub fn distance_deg(&self) -> f64 {
        self.distance_deg
    }

    /// Always appends, even for an entity id seen before.
    #[instrument(level = "debug", skip(self))]
    pub fn register(&self, entity_id: &str, lat: f64, lon: f64) -> Result<Placement, GeoError> {
        if !lat.is_finite() || !lon.is_finite() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidCoordinate { lat, lon });
        }

        let mut registry = self.inner.lock();
        let group = registry.groups.entry((OrderedFloat(lat), OrderedFloat(lon))).or_default();
        group.push(entity_id.to_string());
        let group_index = group.len() - 1;
        let angle = ring_angle(group_index, group.len());

        let placement = Placement {
            entity_id: entity_id.to_string(),
            lat,
            lon,
            adjusted_lat: lat + angle.sin() * self.distance_deg,
            adjusted_lon: lon + angle.cos() * self.distance_deg,
            group_index,
            angle,
        };
        registry.placements.push(placement.clone());
        drop(registry);

        metrics::counter!("depthglobe_markers_registered_total").increment(1);
        debug!(group_index, angle, "Registered marker");
        Ok(placement)
    }

    /// Entity ids registered at exactly this coordinate, in registration order.
    pub fn group(&self, lat: f64, lon: f64) -> Vec<String> {
        self.inner
            .lock()
            .groups
            .get(&(OrderedFloat(lat), OrderedFloat(lon)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn placements(&self) -> Vec<Placement> {
        self.inner.lock().placements.clone()
    }

    pub fn group_count(&self) -> usize {
        self.inner.lock().groups.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_three_at_same_coordinate() {
        let clusterer = MarkerClusterer::default();
        let placements: Vec<Placement> = ["a", "b", "c"]
            .iter()
            .map(|id| clusterer.register(id, 35.0, 139.0).unwrap())
            .collect();

        // Denominator is max(8, size), not the group size.
        let expected = [0.0, TAU / 8.0, 2.0 * TAU / 8.0];
        for (p, angle) in placements.iter().zip(expected) {
            assert!((p.angle - angle).abs() < EPS);
            assert!((p.adjusted_lon - (139.0 + angle.cos() * 1.5)).abs() < EPS);
            assert!((p.adjusted_lat - (35.0 + angle.sin() * 1.5)).abs() < EPS);
        }
        assert!((placements[0].adjusted_lon - 140.5).abs() < EPS);
        assert!((placements[0].adjusted_lat - 35.0).abs() < EPS);
        assert!((placements[2].adjusted_lat - 36.5).abs() < EPS);
        assert_eq!(clusterer.group(35.0, 139.0), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_offsets_not_recomputed_past_eight() {
        let clusterer = MarkerClusterer::default();
        let first: Vec<Placement> = (0..8).map(|i| clusterer.register(&format!("x{i}"), 0.0, 0.0).unwrap()).collect();
        let ninth = clusterer.register("x8", 0.0, 0.0).unwrap();

        assert!((ninth.angle - 8.0 * TAU / 9.0).abs() < EPS);
        assert_eq!(clusterer.placements()[..8], first[..]);
        assert!((first[7].angle - 7.0 * TAU / 8.0).abs() < EPS);
    }

    #[test]
    fn test_exact_key_matching() {
        let clusterer = MarkerClusterer::default();
        let a = clusterer.register("a", 35.0, 139.0).unwrap();
        let b = clusterer.register("b", 35.0 + 1e-12, 139.0).unwrap();
        assert_eq!(a.group_index, 0);
        assert_eq!(b.group_index, 0);
        assert_eq!(clusterer.group_count(), 2);
    }

    #[test]
    fn test_reregistration_appends() {
        let clusterer = MarkerClusterer::default();
        clusterer.register("binance", 1.0, 2.0).unwrap();
        let again = clusterer.register("binance", 1.0, 2.0).unwrap();
        assert_eq!(again.group_index, 1);
        assert_eq!(clusterer.len(), 2);
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let clusterer = MarkerClusterer::default();
        assert!(clusterer.register("a", 91.0, 0.0).is_err());
        assert!(clusterer.register("a", 0.0, -180.5).is_err());
        assert!(clusterer.register("a", f64::NAN, 0.0).is_err());
        assert!(clusterer.is_empty());
    }

    #[test]
    fn test_concurrent_registration_gets_unique_slots() {
        let clusterer = MarkerClusterer::default();
        std::thread::scope(|s| {
            for t in 0..8 {
                let clusterer = &clusterer;
                s.spawn(move || {
                    for i in 0..50 {
                        clusterer.register(&format!("t{t}-{i}"), 10.0, 20.0).unwrap();
                    }
                });
            }
        });
        let indices: BTreeSet<usize> = clusterer.placements().iter().map(|p| p.group_index).collect();
        assert_eq!(indices.len(), 400);
        assert_eq!(indices.iter().max(), Some(&399));
    }

    #[test]
    fn test_marker_position_on_marker_shell() {
        let clusterer = MarkerClusterer::default();
        let p = clusterer.register("okx", 35.6762, 139.6503).unwrap();
        let pos = p.position(crate::geo::projector::MARKER_RADIUS);
        assert!((pos.length() - 102.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_small_groups_evenly_spaced(n in 2usize..=8, lat in -80.0f64..80.0, lon in -170.0f64..170.0) {
            let clusterer = MarkerClusterer::default();
            let placements: Vec<Placement> = (0..n)
                .map(|i| clusterer.register(&i.to_string(), lat, lon).unwrap())
                .collect();
            for pair in placements.windows(2) {
                prop_assert!((pair[1].angle - pair[0].angle - TAU / 8.0).abs() < 1e-9);
            }
            for p in &placements {
                let dlat = p.adjusted_lat - lat;
                let dlon = p.adjusted_lon - lon;
                prop_assert!(((dlat * dlat + dlon * dlon).sqrt() - DEFAULT_OFFSET_DEG).abs() < 1e-9);
            }
        }
    }
}
