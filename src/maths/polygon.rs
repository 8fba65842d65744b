//! Polygons on the unit sphere.

use glam::DVec3;

use super::small_circle::BoundingSmallCircle;
use super::sphere::angular_distance;

/// A closed polygon on the unit sphere.
///
/// The interior is the region the boundary winds around when seen from the
/// query point, so polygons should be smaller than a hemisphere.
#[derive(Debug, Clone)]
pub struct PolygonOnSphere {
    vertices: Vec<DVec3>,
    bounding_small_circle: BoundingSmallCircle,
}

impl PolygonOnSphere {
    /// Creates a polygon from its ring of vertices (not repeated at the end).
    ///
    /// Returns `None` for fewer than three vertices.
    pub fn new(vertices: Vec<DVec3>) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }
        let vertices: Vec<DVec3> = vertices.into_iter().map(|v| v.normalize()).collect();
        let bounding_small_circle = BoundingSmallCircle::from_points(vertices.iter().copied())?;
        Some(Self {
            vertices,
            bounding_small_circle,
        })
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn bounding_small_circle(&self) -> &BoundingSmallCircle {
        &self.bounding_small_circle
    }

    /// Iterates the great-circle arcs of the boundary, closing the ring.
    pub fn edges(&self) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Point-in-polygon test by winding angle around the point.
    ///
    /// Points on a vertex count as inside.
    pub fn contains_point(&self, point: DVec3) -> bool {
        if !self.bounding_small_circle.contains(point) {
            return false;
        }

        let mut winding = 0.0;
        for (a, b) in self.edges() {
            let ta = a - point * a.dot(point);
            let tb = b - point * b.dot(point);
            if ta.length_squared() < 1e-24 || tb.length_squared() < 1e-24 {
                // Query point coincides with a vertex (or its antipode, which
                // the bounding circle has already excluded).
                return true;
            }
            winding += ta.cross(tb).dot(point).atan2(ta.dot(tb));
        }

        winding.abs() > std::f64::consts::PI
    }

    /// Minimum angular distance (radians) from a point to the boundary.
    pub fn minimum_distance(&self, point: DVec3) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_arc(point, a, b))
            .fold(f64::MAX, f64::min)
    }
}

/// Angular distance from `p` to the minor great-circle arc `a`-`b`.
pub fn distance_to_arc(p: DVec3, a: DVec3, b: DVec3) -> f64 {
    let normal = a.cross(b);
    if normal.length_squared() < 1e-24 {
        return angular_distance(p, a).min(angular_distance(p, b));
    }
    let normal = normal.normalize();

    let projected = p - normal * p.dot(normal);
    if projected.length_squared() > 1e-24 {
        let q = projected.normalize();
        // q lies on the arc when it is "after" a and "before" b.
        if a.cross(q).dot(normal) >= 0.0 && q.cross(b).dot(normal) >= 0.0 {
            return angular_distance(p, q);
        }
    }

    angular_distance(p, a).min(angular_distance(p, b))
}
