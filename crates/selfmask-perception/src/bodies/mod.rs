//! Solid collision bodies.
//!
//! A [`Body`] is a posed, inflatable solid that can answer the three
//! questions the self filter asks of every link: does it contain a point,
//! where does a ray first hit it, and how large is it.  Four kinds exist:
//!
//! | Kind | Type | Geometry in the body frame |
//! |------|------|----------------------------|
//! | sphere   | [`SphereBody`]     | centred on the origin                |
//! | box      | [`BoxBody`]        | centred, edges along x/y/z           |
//! | cylinder | [`CylinderBody`]   | centred, axis along z                |
//! | mesh     | [`ConvexMeshBody`] | convex hull of the mesh vertices     |
//!
//! Inflation follows the same rule everywhere: linear dimensions are
//! multiplied by `scale` and then grown by `padding`, so a body with
//! `scale >= 1` and `padding >= 0` always encloses its unit-scale twin.
//!
//! The geometry itself is `parry3d-f64`: each body keeps the inflated parry
//! shape plus its pose as an `Isometry3`, and answers point and ray queries
//! through [`PointQuery`] and [`RayCast`].  Surface points count as inside.

mod convex_mesh;
mod cuboid;
mod cylinder;
mod sphere;

pub use convex_mesh::ConvexMeshBody;
pub use cuboid::BoxBody;
pub use cylinder::CylinderBody;
pub use sphere::SphereBody;

use parry3d_f64::bounding_volume::BoundingSphere as ParrySphere;
use parry3d_f64::na::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use parry3d_f64::query::{PointQuery, Ray, RayCast};
use selfmask_types::{Transform3D, Vec3};

/// Numerical tolerance shared by the ray and containment tests.
pub(crate) const ZERO: f64 = 1e-9;

/// The shape kind of a [`Body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Sphere,
    Box,
    Cylinder,
    ConvexMesh,
}

/// Capability set every collision body exposes.
///
/// Call sites in the filter only ever talk to this trait, so shape kinds can
/// be added without touching classification logic.
pub trait Body: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> BodyKind;

    /// True when `p` (in the pose's parent frame) lies inside the inflated
    /// body.
    fn contains_point(&self, p: Vec3) -> bool;

    /// Intersections of the ray `origin + t·dir` (`t > 0`) with the body
    /// surface, nearest first.  At most `max_hits` points are returned when
    /// `max_hits > 0`.  A zero `dir` never intersects.
    fn intersects_ray(&self, origin: Vec3, dir: Vec3, max_hits: usize) -> Vec<Vec3>;

    /// Volume of the inflated body.
    fn compute_volume(&self) -> f64;

    /// A sphere enclosing the inflated body at its current pose.
    fn compute_bounding_sphere(&self) -> BoundingSphere;

    fn set_pose(&mut self, pose: Transform3D);
    fn pose(&self) -> Transform3D;

    fn set_scale(&mut self, scale: f64);
    fn scale(&self) -> f64;

    fn set_padding(&mut self, padding: f64);
    fn padding(&self) -> f64;
}

// ────────────────────────────────────────────────────────────────────────────
// Bounding spheres
// ────────────────────────────────────────────────────────────────────────────

/// A sphere used for cheap rejection tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// True when `p` is inside or on the sphere.
    pub fn contains(&self, p: Vec3) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }

    /// True when `other` lies entirely within this sphere.
    pub fn encloses(&self, other: &BoundingSphere) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius
    }
}

/// Grow a sphere around `spheres` one at a time.
///
/// Each step produces the smallest sphere enclosing the running result and
/// the next input, so the final sphere encloses every input.  An empty slice
/// yields a zero-radius sphere at the origin.
pub fn merge_bounding_spheres(spheres: &[BoundingSphere]) -> BoundingSphere {
    let Some((first, rest)) = spheres.split_first() else {
        return BoundingSphere::default();
    };
    rest.iter().fold(*first, |acc, s| {
        if acc.encloses(s) {
            return acc;
        }
        if s.encloses(&acc) {
            return *s;
        }
        let offset = s.center.sub(acc.center);
        let d = offset.norm();
        let radius = (d + acc.radius + s.radius) * 0.5;
        // Non-enclosing spheres are never concentric, so d > 0 here.
        let center = acc
            .center
            .add(offset.scale((radius - acc.radius) / d));
        BoundingSphere::new(center, radius)
    })
}

impl From<ParrySphere> for BoundingSphere {
    fn from(s: ParrySphere) -> Self {
        Self::new(from_point(s.center()), s.radius())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// parry boundary
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn to_isometry(pose: Transform3D) -> Isometry3<f64> {
    let (t, q) = (pose.translation, pose.rotation);
    Isometry3::from_parts(
        Translation3::new(t.x, t.y, t.z),
        UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

pub(crate) fn to_point(v: Vec3) -> Point3<f64> {
    Point3::new(v.x, v.y, v.z)
}

pub(crate) fn to_vector(v: Vec3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn from_point(p: &Point3<f64>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

/// Closed containment test of `shape` posed at `iso`.
pub(crate) fn shape_contains<S: PointQuery + ?Sized>(shape: &S, iso: &Isometry3<f64>, p: Vec3) -> bool {
    p.is_finite() && shape.contains_point(iso, &to_point(p))
}

/// Forward surface crossings of `origin + t·dir` with a convex shape.
///
/// A convex solid is crossed at most twice.  The first cast finds the nearest
/// crossing; when more are wanted, a second cast comes back from beyond
/// `bound` and finds the far one.
pub(crate) fn shape_ray_hits<S: RayCast + ?Sized>(
    shape: &S,
    iso: &Isometry3<f64>,
    bound: BoundingSphere,
    origin: Vec3,
    dir: Vec3,
    max_hits: usize,
) -> Vec<Vec3> {
    let Some(dir) = dir.normalize() else {
        return Vec::new();
    };
    if !origin.is_finite() {
        return Vec::new();
    }
    // Past this parameter the ray is outside `bound` for good.
    let limit = origin.distance(bound.center) + bound.radius + 1.0;
    let ray = Ray::new(to_point(origin), to_vector(dir));
    let Some(near) = shape.cast_ray(iso, &ray, limit, false) else {
        return Vec::new();
    };
    let mut ts = vec![near];
    if max_hits != 1 || near <= ZERO {
        let back = Ray::new(ray.point_at(limit), -ray.dir);
        if let Some(t) = shape.cast_ray(iso, &back, limit, false) {
            ts.push(limit - t);
        }
    }
    ray_points(origin, dir, ts, max_hits)
}

/// Sort ray parameters, drop near-duplicates and non-forward hits, then map
/// them onto the ray.
pub(crate) fn ray_points(origin: Vec3, dir: Vec3, mut ts: Vec<f64>, max_hits: usize) -> Vec<Vec3> {
    ts.retain(|t| *t > ZERO && t.is_finite());
    ts.sort_by(|a, b| a.total_cmp(b));
    ts.dedup_by(|b, a| (*b - *a).abs() < ZERO);
    if max_hits > 0 {
        ts.truncate(max_hits);
    }
    ts.into_iter().map(|t| origin.add(dir.scale(t))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_empty_is_zero_sphere() {
        let s = merge_bounding_spheres(&[]);
        assert_eq!(s.radius, 0.0);
        assert_eq!(s.center, Vec3::zero());
    }

    #[test]
    fn merge_two_disjoint_spheres() {
        let a = BoundingSphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0);
        let b = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let m = merge_bounding_spheres(&[a, b]);
        assert!((m.radius - 3.0).abs() < 1e-12);
        assert!(m.center.norm() < 1e-12);
    }

    #[test]
    fn merge_keeps_enclosing_sphere() {
        let big = BoundingSphere::new(Vec3::zero(), 5.0);
        let small = BoundingSphere::new(Vec3::new(1.0, 1.0, 0.0), 0.5);
        assert_eq!(merge_bounding_spheres(&[small, big]), big);
        assert_eq!(merge_bounding_spheres(&[big, small]), big);
    }

    #[test]
    fn merged_sphere_encloses_every_input() {
        let inputs = [
            BoundingSphere::new(Vec3::new(0.0, 0.0, 0.0), 0.3),
            BoundingSphere::new(Vec3::new(1.0, 2.0, 0.0), 0.5),
            BoundingSphere::new(Vec3::new(-1.5, 0.2, 1.0), 0.2),
            BoundingSphere::new(Vec3::new(0.4, -0.7, -2.0), 1.0),
        ];
        let m = merge_bounding_spheres(&inputs);
        for s in &inputs {
            assert!(
                m.center.distance(s.center) + s.radius <= m.radius + 1e-9,
                "{s:?} escapes {m:?}"
            );
        }
    }

    #[test]
    fn isometry_matches_transform() {
        let pose = Transform3D::new(
            Vec3::new(1.0, -2.0, 0.5),
            selfmask_types::Quaternion::from_rpy(0.4, 0.1, -1.3),
        );
        let p = Vec3::new(0.3, 0.7, -0.2);
        let via_parry = from_point(&(to_isometry(pose) * to_point(p)));
        assert!(via_parry.distance(pose.apply(p)) < 1e-12);
    }

    #[test]
    fn ray_points_filters_backward_and_duplicate_hits() {
        let hits = ray_points(
            Vec3::zero(),
            Vec3::new(1.0, 0.0, 0.0),
            vec![2.0, -1.0, 1.0, 1.0 + 1e-12],
            0,
        );
        assert_eq!(hits, vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]);
    }
}
