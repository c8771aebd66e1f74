use parry3d_f64::na::Isometry3;
use parry3d_f64::shape::Ball;
use selfmask_types::{Transform3D, Vec3};

use super::{Body, BodyKind, BoundingSphere, shape_contains, shape_ray_hits, to_isometry};

/// A sphere centred on its pose origin.
#[derive(Debug, Clone)]
pub struct SphereBody {
    radius: f64,
    scale: f64,
    padding: f64,
    pose: Transform3D,
    // derived
    ball: Ball,
    iso: Isometry3<f64>,
}

impl SphereBody {
    pub fn new(radius: f64) -> Self {
        let mut body = Self {
            radius,
            scale: 1.0,
            padding: 0.0,
            pose: Transform3D::identity(),
            ball: Ball::new(radius),
            iso: Isometry3::identity(),
        };
        body.update();
        body
    }

    /// Effective (inflated) radius.
    pub fn radius(&self) -> f64 {
        self.ball.radius
    }

    fn update(&mut self) {
        self.ball = Ball::new(self.radius * self.scale + self.padding);
    }
}

impl Body for SphereBody {
    fn kind(&self) -> BodyKind {
        BodyKind::Sphere
    }

    fn contains_point(&self, p: Vec3) -> bool {
        shape_contains(&self.ball, &self.iso, p)
    }

    fn intersects_ray(&self, origin: Vec3, dir: Vec3, max_hits: usize) -> Vec<Vec3> {
        shape_ray_hits(
            &self.ball,
            &self.iso,
            self.compute_bounding_sphere(),
            origin,
            dir,
            max_hits,
        )
    }

    fn compute_volume(&self) -> f64 {
        4.0 * std::f64::consts::PI * self.ball.radius.powi(3) / 3.0
    }

    fn compute_bounding_sphere(&self) -> BoundingSphere {
        self.ball.bounding_sphere(&self.iso).into()
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
