// Latitude/longitude → point on a sphere.

use std::f64::consts::PI;

/// Radius of the rendered globe.
pub const GLOBE_RADIUS: f64 = 100.0;
/// Continent outlines sit just above the surface.
pub const OUTLINE_RADIUS: f64 = 101.0;
/// Exchange markers float above the outlines.
pub const MARKER_RADIUS: f64 = 102.0;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Spherical to Cartesian with +y through the north pole.
///
/// Longitude is rotated by 180° so the texture's prime meridian lines up.
/// Pure trigonometry: the same inputs always give the same bits.
pub fn project(lat: f64, lon: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat) * (PI / 180.0);
    let theta = (lon + 180.0) * (PI / 180.0);
    Vec3 {
        x: -radius * phi.sin() * theta.cos(),
        y: radius * phi.cos(),
        z: radius * phi.sin() * theta.sin(),
    }
}

/// Inverse of [`project`]. Longitude comes back in `[-180, 180]`; at the
/// poles it is meaningless and reported as whatever `atan2` yields.
pub fn unproject(point: &Vec3) -> (f64, f64) {
    let radius = point.length();
    if radius == 0.0 {
        return (0.0, 0.0);
    }
    let phi = (point.y / radius).clamp(-1.0, 1.0).acos();
    let theta = point.z.atan2(-point.x);
    let lat = 90.0 - phi.to_degrees();
    let mut lon = theta.to_degrees() - 180.0;
    if lon < -180.0 {
        lon += 360.0;
    }
    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(&b) < EPS
    }

    #[test]
    fn test_origin_maps_to_positive_x() {
        let p = project(0.0, 0.0, 100.0);
        assert!(close(p, Vec3 { x: 100.0, y: 0.0, z: 0.0 }), "{p:?}");
    }

    #[test]
    fn test_north_pole_collapses() {
        let expected = Vec3 { x: 0.0, y: 50.0, z: 0.0 };
        for lon in [-180.0, -90.0, 0.0, 45.0, 139.6503, 180.0] {
            let p = project(90.0, lon, 50.0);
            assert!(close(p, expected), "lon {lon}: {p:?}");
        }
    }

    #[test]
    fn test_quarter_turns() {
        assert!(close(project(0.0, 90.0, 1.0), Vec3 { x: 0.0, y: 0.0, z: -1.0 }));
        assert!(close(project(0.0, -90.0, 1.0), Vec3 { x: 0.0, y: 0.0, z: 1.0 }));
        assert!(close(project(-90.0, 12.0, 1.0), Vec3 { x: 0.0, y: -1.0, z: 0.0 }));
    }

    #[test]
    fn test_on_sphere_and_reproducible() {
        let a = project(35.6762, 139.6503, MARKER_RADIUS);
        let b = project(35.6762, 139.6503, MARKER_RADIUS);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
        assert_eq!(a.z.to_bits(), b.z.to_bits());
        assert!((a.length() - MARKER_RADIUS).abs() < EPS);
    }

    #[test]
    fn test_unproject_round_trip() {
        for (lat, lon) in [(35.6762, 139.6503), (37.7749, -122.4194), (1.3521, 103.8198), (-33.9, 18.4)] {
            let (lat2, lon2) = unproject(&project(lat, lon, GLOBE_RADIUS));
            assert!((lat - lat2).abs() < EPS, "{lat} vs {lat2}");
            assert!((lon - lon2).abs() < EPS, "{lon} vs {lon2}");
        }
    }
}
