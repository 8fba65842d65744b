//! Geometries on the sphere and their tessellation into point lists.

use glam::DVec3;

use super::sphere::{angular_distance, slerp_unit};

/// A geometry on the unit sphere.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryOnSphere {
    Point(DVec3),
    MultiPoint(Vec<DVec3>),
    Polyline(Vec<DVec3>),
    /// Polygon ring; the first vertex is not repeated at the end.
    Polygon(Vec<DVec3>),
}

impl GeometryOnSphere {
    /// The original vertices of the geometry.
    pub fn vertices(&self) -> &[DVec3] {
        match self {
            GeometryOnSphere::Point(p) => std::slice::from_ref(p),
            GeometryOnSphere::MultiPoint(points)
            | GeometryOnSphere::Polyline(points)
            | GeometryOnSphere::Polygon(points) => points,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices().len()
    }

    pub fn is_point(&self) -> bool {
        matches!(self, GeometryOnSphere::Point(_))
    }
}

/// Records which original vertices a tessellated point lies between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointInterpolation {
    pub first_vertex: usize,
    pub second_vertex: usize,
    /// Fraction along the arc from the first to the second vertex.
    pub fraction: f64,
}

impl PointInterpolation {
    fn at_vertex(vertex: usize) -> Self {
        Self {
            first_vertex: vertex,
            second_vertex: vertex,
            fraction: 0.0,
        }
    }
}

/// A geometry flattened into points, with the vertex each point came from.
#[derive(Debug, Clone, Default)]
pub struct TessellatedGeometry {
    pub points: Vec<DVec3>,
    pub interpolations: Vec<PointInterpolation>,
}

impl TessellatedGeometry {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Flattens a geometry into a point list.
///
/// Polyline and polygon arcs longer than `max_segment_angle` (radians) are
/// subdivided along their great circle. Points and multipoints are copied
/// as is.
pub fn tessellate(geometry: &GeometryOnSphere, max_segment_angle: Option<f64>) -> TessellatedGeometry {
    let vertices = geometry.vertices();
    let closed = match geometry {
        GeometryOnSphere::Point(_) | GeometryOnSphere::MultiPoint(_) => {
            return TessellatedGeometry {
                points: vertices.iter().map(|v| v.normalize()).collect(),
                interpolations: (0..vertices.len()).map(PointInterpolation::at_vertex).collect(),
            };
        }
        GeometryOnSphere::Polyline(_) => false,
        GeometryOnSphere::Polygon(_) => true,
    };

    let mut out = TessellatedGeometry::default();
    let n = vertices.len();
    if n == 0 {
        return out;
    }

    let num_arcs = if closed { n } else { n - 1 };
    for i in 0..num_arcs {
        let j = (i + 1) % n;
        let a = vertices[i].normalize();
        let b = vertices[j].normalize();
        out.points.push(a);
        out.interpolations.push(PointInterpolation::at_vertex(i));

        let Some(max_angle) = max_segment_angle.filter(|m| *m > 0.0) else {
            continue;
        };
        let angle = angular_distance(a, b);
        // Antipodal arcs have no unique great circle to subdivide along.
        if angle >= std::f64::consts::PI - 1e-9 {
            continue;
        }
        let segments = (angle / max_angle).ceil() as usize;
        for k in 1..segments {
            let fraction = k as f64 / segments as f64;
            out.points.push(slerp_unit(a, b, fraction));
            out.interpolations.push(PointInterpolation {
                first_vertex: i,
                second_vertex: j,
                fraction,
            });
        }
    }
    if !closed {
        out.points.push(vertices[n - 1].normalize());
        out.interpolations.push(PointInterpolation::at_vertex(n - 1));
    }

    out
}
