use parry3d_f64::na::{Isometry3, Point3};
use parry3d_f64::shape::{ConvexPolyhedron, Shape};
use selfmask_types::{MaskError, Transform3D, Vec3};
use tracing::warn;

use super::{
    Body, BodyKind, BoundingSphere, ZERO, shape_contains, shape_ray_hits, to_isometry, to_point,
};

/// The convex hull of a vertex cloud, used for mesh-shaped links.
///
/// Inflation moves every vertex radially away from the vertex centroid:
/// `c + d̂·(|d|·scale + padding)`.  The hull is rebuilt whenever scale or
/// padding change, which only happens at configuration time.
#[derive(Debug, Clone)]
pub struct ConvexMeshBody {
    vertices: Vec<Vec3>,
    center: Vec3,
    scale: f64,
    padding: f64,
    pose: Transform3D,
    // derived
    hull: ConvexPolyhedron,
    volume: f64,
    iso: Isometry3<f64>,
}

impl ConvexMeshBody {
    /// Build a body from mesh vertices (in the link's collision frame).
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::InvalidShape`] when the vertices do not span a
    /// volume (fewer than four points, or all coplanar).
    pub fn new(vertices: Vec<Vec3>) -> Result<Self, MaskError> {
        if vertices.len() < 4 || vertices.iter().any(|v| !v.is_finite()) {
            return Err(MaskError::InvalidShape(format!(
                "convex mesh needs at least 4 finite vertices, got {}",
                vertices.len()
            )));
        }
        let center = vertices
            .iter()
            .fold(Vec3::zero(), |acc, v| acc.add(*v))
            .scale(1.0 / vertices.len() as f64);
        let (hull, volume) = build_hull(&vertices)?;
        Ok(Self {
            vertices,
            center,
            scale: 1.0,
            padding: 0.0,
            pose: Transform3D::identity(),
            hull,
            volume,
            iso: Isometry3::identity(),
        })
    }

    /// Number of corners on the current hull.
    pub fn hull_vertices(&self) -> usize {
        self.hull.points().len()
    }

    fn update(&mut self) {
        let inflated: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|v| {
                let d = v.sub(self.center);
                let l = d.norm();
                if l > ZERO {
                    self.center.add(d.scale(self.scale + self.padding / l))
                } else {
                    self.center
                }
            })
            .collect();
        // Radial inflation of a solid hull stays solid.
        match build_hull(&inflated) {
            Ok((hull, volume)) => {
                self.hull = hull;
                self.volume = volume;
            }
            Err(e) => warn!(error = %e, "keeping previous convex hull"),
        }
    }
}

fn build_hull(vertices: &[Vec3]) -> Result<(ConvexPolyhedron, f64), MaskError> {
    let points: Vec<Point3<f64>> = vertices.iter().map(|v| to_point(*v)).collect();
    let flat = || MaskError::InvalidShape("convex mesh vertices do not enclose a volume".into());
    let hull = ConvexPolyhedron::from_convex_hull(&points).ok_or_else(flat)?;
    // Unit density, so the mass is the volume.
    let inv_mass = hull.mass_properties(1.0).inv_mass;
    if inv_mass <= 0.0 || !inv_mass.is_finite() {
        return Err(flat());
    }
    Ok((hull, 1.0 / inv_mass))
}

impl Body for ConvexMeshBody {
    fn kind(&self) -> BodyKind {
        BodyKind::ConvexMesh
    }

    fn contains_point(&self, p: Vec3) -> bool {
        shape_contains(&self.hull, &self.iso, p)
    }

    fn intersects_ray(&self, origin: Vec3, dir: Vec3, max_hits: usize) -> Vec<Vec3> {
        shape_ray_hits(
            &self.hull,
            &self.iso,
            self.compute_bounding_sphere(),
            origin,
            dir,
            max_hits,
        )
    }

    fn compute_volume(&self) -> f64 {
        self.volume
    }

    fn compute_bounding_sphere(&self) -> BoundingSphere {
        self.hull.bounding_sphere(&self.iso).into()
    }

    fn set_pose(&mut self, pose: Transform3D) {
        self.pose = pose;
        self.iso = to_isometry(pose);
    }

    fn pose(&self) -> Transform3D {
        self.pose
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
        self.update();
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn set_padding(&mut self, padding: f64) {
        self.padding = padding;
        self.update();
    }

    fn padding(&self) -> f64 {
        self.padding
    }
}
