//! Bounding small circles used to cull topologies before point tests.

use glam::DVec3;

use super::sphere::angular_distance;

/// A small circle (centre + angular radius) bounding a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSmallCircle {
    centre: DVec3,
    angular_radius: f64,
}

impl BoundingSmallCircle {
    pub fn new(centre: DVec3, angular_radius: f64) -> Self {
        Self {
            centre: centre.normalize(),
            angular_radius: angular_radius.max(0.0),
        }
    }

    /// Bounds a set of unit vectors.
    ///
    /// The centre is the normalized centroid. When the centroid vanishes
    /// (points spread evenly around the globe) the first point is used as
    /// centre, which still yields a valid, if loose, bound.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = DVec3>,
        I::IntoIter: Clone,
    {
        let iter = points.into_iter();
        let mut first = None;
        let mut sum = DVec3::ZERO;
        for p in iter.clone() {
            first.get_or_insert(p);
            sum += p;
        }
        let first = first?;
        let centre = if sum.length_squared() > 1e-20 {
            sum.normalize()
        } else {
            first.normalize()
        };
        let angular_radius = iter
            .map(|p| angular_distance(centre, p))
            .fold(0.0_f64, f64::max);
        Some(Self {
            centre,
            angular_radius,
        })
    }

    pub fn centre(&self) -> DVec3 {
        self.centre
    }

    pub fn angular_radius(&self) -> f64 {
        self.angular_radius
    }

    pub fn contains(&self, point: DVec3) -> bool {
        angular_distance(self.centre, point) <= self.angular_radius + 1e-12
    }

    /// True unless the two circles are certainly disjoint.
    pub fn intersects(&self, other: &BoundingSmallCircle) -> bool {
        angular_distance(self.centre, other.centre)
            <= self.angular_radius + other.angular_radius + 1e-12
    }

    /// Returns a copy with the radius grown by `delta` radians.
    pub fn expanded(&self, delta: f64) -> Self {
        Self {
            centre: self.centre,
            angular_radius: self.angular_radius + delta.max(0.0),
        }
    }
}
