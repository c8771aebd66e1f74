use parry3d_f64::na::{Isometry3, Vector3};
use parry3d_f64::shape::Cuboid;
use selfmask_types::{Transform3D, Vec3};

use super::{Body, BodyKind, BoundingSphere, shape_contains, shape_ray_hits, to_isometry};

/// An oriented box centred on its pose origin.
#[derive(Debug, Clone)]
pub struct BoxBody {
    dims: Vec3,
    scale: f64,
    padding: f64,
    pose: Transform3D,
    // derived
    cuboid: Cuboid,
    iso: Isometry3<f64>,
}

impl BoxBody {
    /// Create a box from its full edge lengths.
    pub fn new(dims: Vec3) -> Self {
        let mut body = Self {
            dims,
            scale: 1.0,
            padding: 0.0,
            pose: Transform3D::identity(),
            cuboid: Cuboid::new(Vector3::zeros()),
            iso: Isometry3::identity(),
        };
        body.update();
        body
    }

    /// Inflated half extents along the body axes.
    pub fn half_extents(&self) -> Vec3 {
        let h = self.cuboid.half_extents;
        Vec3::new(h.x, h.y, h.z)
    }

    fn update(&mut self) {
        let half = self
            .dims
            .scale(self.scale * 0.5)
            .add(Vec3::splat(self.padding));
        self.cuboid = Cuboid::new(Vector3::new(half.x, half.y, half.z));
    }
}

impl Body for BoxBody {
    fn kind(&self) -> BodyKind {
        BodyKind::Box
    }

    fn contains_point(&self, p: Vec3) -> bool {
        shape_contains(&self.cuboid, &self.iso, p)
    }

    fn intersects_ray(&self, origin: Vec3, dir: Vec3, max_hits: usize) -> Vec<Vec3> {
        shape_ray_hits(
            &self.cuboid,
            &self.iso,
            self.compute_bounding_sphere(),
            origin,
            dir,
            max_hits,
        )
    }

    fn compute_volume(&self) -> f64 {
        let h = self.cuboid.half_extents;
        8.0 * h.x * h.y * h.z
    }

    fn compute_bounding_sphere(&self) -> BoundingSphere {
        self.cuboid.bounding_sphere(&self.iso).into()
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
