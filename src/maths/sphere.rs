//! Unit-sphere helpers and physical constants.

use glam::DVec3;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KMS: f64 = 6371.009;

/// Seconds in one million years (Julian years).
pub const SECONDS_PER_MY: f64 = 1.0e6 * 365.25 * 86_400.0;

/// Converts a velocity in cm/yr to km/My.
pub const CM_PER_YR_TO_KMS_PER_MY: f64 = 10.0;

/// Converts latitude/longitude in degrees to a unit vector.
pub fn lat_lon_to_unit(lat_degrees: f64, lon_degrees: f64) -> DVec3 {
    let lat = lat_degrees.to_radians();
    let lon = lon_degrees.to_radians();
    DVec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Converts a (not necessarily unit) vector to latitude/longitude in degrees.
pub fn unit_to_lat_lon(v: DVec3) -> (f64, f64) {
    let v = v.normalize_or_zero();
    let lat = v.z.clamp(-1.0, 1.0).asin();
    let lon = v.y.atan2(v.x);
    (lat.to_degrees(), lon.to_degrees())
}

/// Great-circle angle (radians) between two unit vectors.
///
/// Uses `atan2` so that nearly coincident and nearly antipodal points keep
/// full precision.
pub fn angular_distance(a: DVec3, b: DVec3) -> f64 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Spherical linear interpolation between two unit vectors.
///
/// Antipodal inputs have no unique great circle; the first point is returned.
pub fn slerp_unit(a: DVec3, b: DVec3, t: f64) -> DVec3 {
    let theta = angular_distance(a, b);
    let sin_theta = theta.sin();
    if sin_theta.abs() < 1e-12 {
        if theta > 1.0 {
            return a;
        }
        let v = a.lerp(b, t);
        return if v.length_squared() > 0.0 { v.normalize() } else { a };
    }
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;
    (a * wa + b * wb).normalize()
}

/// Local east/north tangent basis at a point on the unit sphere.
///
/// At the poles east is taken along +Y.
pub fn local_east_north(point: DVec3) -> (DVec3, DVec3) {
    let east = DVec3::Z.cross(point);
    let east = if east.length_squared() < 1e-24 {
        DVec3::Y
    } else {
        east.normalize()
    };
    let north = point.cross(east).normalize_or_zero();
    (east, north)
}
