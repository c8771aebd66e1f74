use std::f64::consts::FRAC_PI_2;

use parry3d_f64::na::{Isometry3, Vector3};
use parry3d_f64::shape::Cylinder;
use selfmask_types::{Transform3D, Vec3};

use super::{Body, BodyKind, BoundingSphere, shape_contains, shape_ray_hits, to_isometry};

/// A cylinder centred on its pose origin with its axis along local z.
///
/// parry's cylinder runs along its local y axis, so the shape sits behind a
/// fixed quarter turn about x.
#[derive(Debug, Clone)]
pub struct CylinderBody {
    radius: f64,
    length: f64,
    scale: f64,
    padding: f64,
    pose: Transform3D,
    // derived
    cylinder: Cylinder,
    iso: Isometry3<f64>,
}

fn z_axis_iso(pose: Transform3D) -> Isometry3<f64> {
    to_isometry(pose) * Isometry3::rotation(Vector3::x() * FRAC_PI_2)
}

impl CylinderBody {
    pub fn new(radius: f64, length: f64) -> Self {
        let mut body = Self {
            radius,
            length,
            scale: 1.0,
            padding: 0.0,
            pose: Transform3D::identity(),
            cylinder: Cylinder::new(length * 0.5, radius),
            iso: z_axis_iso(Transform3D::identity()),
        };
        body.update();
        body
    }

    fn update(&mut self) {
        self.cylinder = Cylinder::new(
            self.length * self.scale * 0.5 + self.padding,
            self.radius * self.scale + self.padding,
        );
    }
}

impl Body for CylinderBody {
    fn kind(&self) -> BodyKind {
        BodyKind::Cylinder
    }

    fn contains_point(&self, p: Vec3) -> bool {
        shape_contains(&self.cylinder, &self.iso, p)
    }

    fn intersects_ray(&self, origin: Vec3, dir: Vec3, max_hits: usize) -> Vec<Vec3> {
        shape_ray_hits(
            &self.cylinder,
            &self.iso,
            self.compute_bounding_sphere(),
            origin,
            dir,
            max_hits,
        )
    }

    fn compute_volume(&self) -> f64 {
        let c = &self.cylinder;
        2.0 * std::f64::consts::PI * c.radius * c.radius * c.half_height
    }

    fn compute_bounding_sphere(&self) -> BoundingSphere {
        self.cylinder.bounding_sphere(&self.iso).into()
    }

    fn set_pose(&mut self, pose: Transform3D) {
        self.pose = pose;
        self.iso = z_axis_iso(pose);
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

#[cfg(test)]
mod tests {
    use super::*;
    use selfmask_types::Quaternion;
    use std::f64::consts::PI;

    #[test]
    fn contains_checks_axis_and_radius() {
        let c = CylinderBody::new(0.5, 2.0);
        assert!(c.contains_point(Vec3::new(0.3, 0.0, 0.9)));
        assert!(!c.contains_point(Vec3::new(0.0, 0.0, 1.1)));
        assert!(!c.contains_point(Vec3::new(0.51, 0.0, 0.0)));
        // The axis is z, not parry's native y.
        assert!(!c.contains_point(Vec3::new(0.0, 0.9, 0.0)));
    }

    #[test]
    fn padding_grows_radius_and_length() {
        let mut c = CylinderBody::new(0.5, 2.0);
        c.set_padding(0.1);
        assert!(c.contains_point(Vec3::new(0.55, 0.0, 0.0)));
        assert!(c.contains_point(Vec3::new(0.0, 0.0, 1.05)));
        assert!(!c.contains_point(Vec3::new(0.0, 0.0, 1.15)));
    }

    #[test]
    fn volume_and_bounding_sphere() {
        let c = CylinderBody::new(1.0, 2.0);
        assert!((c.compute_volume() - 2.0 * PI).abs() < 1e-12);
        assert!((c.compute_bounding_sphere().radius - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn ray_across_side_wall() {
        let c = CylinderBody::new(1.0, 4.0);
        let hits = c.intersects_ray(Vec3::new(-3.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.0), 0);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].distance(Vec3::new(-1.0, 0.0, 0.5)) < 1e-6);
        assert!(hits[1].distance(Vec3::new(1.0, 0.0, 0.5)) < 1e-6);
    }

    #[test]
    fn ray_along_axis_hits_caps() {
        let c = CylinderBody::new(1.0, 2.0);
        let hits = c.intersects_ray(Vec3::new(0.2, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0), 1);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance(Vec3::new(0.2, 0.0, -1.0)) < 1e-6);
    }

    #[test]
    fn rotated_cylinder_lies_along_x() {
        let mut c = CylinderBody::new(0.1, 2.0);
        c.set_pose(Transform3D::new(
            Vec3::zero(),
            Quaternion::from_rpy(0.0, FRAC_PI_2, 0.0),
        ));
        assert!(c.contains_point(Vec3::new(0.9, 0.0, 0.0)));
        assert!(!c.contains_point(Vec3::new(0.0, 0.0, 0.9)));
    }
}
