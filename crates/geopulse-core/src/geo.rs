//! Latitude/longitude to globe-space projection.
//!
//! Pure functions, no state. The mapping puts the north pole at `+y` and
//! longitude -180° on the `+x` side, matching the equirectangular texture
//! orientation used by the globe renderer:
//!
//! ```text
//! phi   = (90 - lat)  in radians   (polar angle from +y)
//! theta = (lon + 180) in radians
//! x = -r * sin(phi) * cos(theta)
//! y =  r * cos(phi)
//! z =  r * sin(phi) * sin(theta)
//! ```
//!
//! Inputs are not clamped. Callers validate coordinates before projecting.

use geopulse_types::Position3D;

/// Project a latitude/longitude pair (degrees) onto a sphere of `radius`.
pub fn project(lat: f64, lon: f64, radius: f64) -> Position3D {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    Position3D::new(
        -radius * sin_phi * cos_theta,
        radius * cos_phi,
        radius * sin_phi * sin_theta,
    )
}

/// Outward radial unit vector at a latitude/longitude pair.
pub fn surface_normal(lat: f64, lon: f64) -> Position3D {
    project(lat, lon, 1.0)
}

/// Midpoint of a beam of `length` standing on `anchor` along `direction`.
pub fn beam_center(anchor: Position3D, direction: Position3D, length: f64) -> Position3D {
    anchor.offset_along(direction, length / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn assert_close(actual: Position3D, expected: Position3D) {
        assert!(
            actual.distance_to(expected) < TOLERANCE,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn north_pole_is_up() {
        assert_close(project(90.0, 0.0, 1.0), Position3D::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn south_pole_is_down() {
        assert_close(project(-90.0, 45.0, 2.0), Position3D::new(0.0, -2.0, 0.0));
    }

    #[test]
    fn equator_meridians() {
        // lon 0 -> theta = 180 degrees -> x = +r
        assert_close(project(0.0, 0.0, 1.0), Position3D::new(1.0, 0.0, 0.0));
        // lon 90 -> theta = 270 degrees -> z = -r
        assert_close(project(0.0, 90.0, 1.0), Position3D::new(0.0, 0.0, -1.0));
        // lon -180 -> theta = 0 -> x = -r
        assert_close(project(0.0, -180.0, 1.0), Position3D::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn projection_lies_on_sphere() {
        for (lat, lon) in [(48.85, 2.35), (-33.87, 151.21), (40.71, -74.0), (0.0, 0.0)] {
            let p = project(lat, lon, 1.01);
            assert!((p.length() - 1.01).abs() < TOLERANCE);
        }
    }

    #[test]
    fn projection_is_deterministic() {
        assert_eq!(project(12.5, -7.25, 1.0), project(12.5, -7.25, 1.0));
    }

    #[test]
    fn surface_normal_is_unit_and_radial() {
        let normal = surface_normal(35.68, 139.69);
        assert!((normal.length() - 1.0).abs() < TOLERANCE);
        let point = project(35.68, 139.69, 1.01);
        assert_close(point.normalized(), normal);
    }

    #[test]
    fn beam_center_is_half_a_length_out() {
        let anchor = project(0.0, 0.0, 1.01);
        let direction = surface_normal(0.0, 0.0);
        let center = beam_center(anchor, direction, 0.2);
        assert!((center.length() - 1.11).abs() < TOLERANCE);
    }
}
