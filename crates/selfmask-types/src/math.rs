//! Rigid-body math primitives.
//!
//! [`Vec3`], [`Quaternion`] and [`Transform3D`] are deliberately small value
//! types: every body pose, ray and sensor position in the workspace is built
//! from them.
//!
//! # Example
//!
//! ```rust
//! use selfmask_types::math::{Quaternion, Transform3D, Vec3};
//!
//! // link frame is 1 m forward of the base, yawed 90°.
//! let base_t_link = Transform3D::new(
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Quaternion::from_rpy(0.0, 0.0, std::f64::consts::FRAC_PI_2),
//! );
//! let p = base_t_link.apply(Vec3::new(1.0, 0.0, 0.0));
//! assert!((p.x - 1.0).abs() < 1e-9);
//! assert!((p.y - 1.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector or point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// A vector with all three components equal to `v`.
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Component-wise product.
    pub fn mul_elem(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        self.sub(other).norm()
    }

    pub fn distance_squared(self, other: Self) -> f64 {
        self.sub(other).norm_squared()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalize(self) -> Option<Self> {
        let n = self.norm();
        if n > f64::EPSILON && n.is_finite() {
            Some(self.scale(1.0 / n))
        } else {
            None
        }
    }

    /// Read component `axis` (0 = x, 1 = y, anything else = z).
    pub fn axis(self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// Rotation stored as a unit quaternion, scalar part first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Raw components, stored as given. Use [`Quaternion::normalized`] on
    /// anything that did not come from a rotation constructor.
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Build a rotation from fixed-axis roll, pitch and yaw (radians), applied
    /// in that order about X, Y and Z.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }

    /// Rescale to unit length.  A degenerate quaternion becomes the identity.
    pub fn normalized(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if n > f64::EPSILON && n.is_finite() {
            Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
        } else {
            Self::identity()
        }
    }

    /// `self` after `rhs`: rotating by the product equals rotating by `rhs`
    /// and then by `self`.
    pub fn mul(self, rhs: Self) -> Self {
        let (a, b) = (self.vector(), rhs.vector());
        let v = b.scale(self.w).add(a.scale(rhs.w)).add(a.cross(b));
        Self::new(self.w * rhs.w - a.dot(b), v.x, v.y, v.z)
    }

    /// The reverse rotation.
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    fn vector(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v + 2w(u × v) + 2u × (u × v), u being the vector part.
        let u = self.vector();
        let uv = u.cross(v);
        v.add(uv.scale(2.0 * self.w)).add(u.cross(uv).scale(2.0))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// Pose of a child frame in its parent: a point given in the child frame is
/// rotated by `rotation`, then offset by `translation`, to land in the
/// parent frame.
///
/// Names like `base_t_link` read as "link expressed in base".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub const fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub const fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// A pure translation.
    pub const fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quaternion::identity())
    }

    /// Chain poses: `a_t_b.compose(b_t_c)` is `a_t_c`.
    pub fn compose(self, other: Self) -> Self {
        Self::new(self.apply(other.translation), self.rotation.mul(other.rotation))
    }

    /// `b_t_a` for `self` = `a_t_b`.
    pub fn inverse(self) -> Self {
        let inv_rot = self.rotation.conjugate();
        Self::new(inv_rot.rotate(self.translation).neg(), inv_rot)
    }

    /// Child-frame point into the parent frame.
    pub fn apply(self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p).add(self.translation)
    }

    /// Like [`Transform3D::apply`] but ignores the translation.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        self.rotation.rotate(v)
    }

    /// Parent-frame point into the child frame.
    pub fn apply_inverse(self, p: Vec3) -> Vec3 {
        self.rotation.conjugate().rotate(p.sub(self.translation))
    }

    pub fn rotate_inverse(self, v: Vec3) -> Vec3 {
        self.rotation.conjugate().rotate(v)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-9
    }

    // ── Vec3 ────────────────────────────────────────────────────────────────

    #[test]
    fn normalize_zero_vector_is_none() {
        assert!(Vec3::zero().normalize().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).normalize().unwrap();
        assert!((n.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        let z = Vec3::new(1.0, 0.0, 0.0).cross(Vec3::new(0.0, 1.0, 0.0));
        assert!(close(z, Vec3::new(0.0, 0.0, 1.0)));
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quarter_turn_about_z_maps_x_onto_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(close(r, Vec3::new(0.0, 1.0, 0.0)), "got {r:?}");
    }

    #[test]
    fn rotate_agrees_with_conjugation() {
        let q = Quaternion::from_rpy(0.7, -1.2, 2.5);
        let v = Vec3::new(0.3, -4.0, 1.5);
        let sandwich = q.mul(Quaternion::new(0.0, v.x, v.y, v.z)).mul(q.conjugate());
        assert!(close(q.rotate(v), Vec3::new(sandwich.x, sandwich.y, sandwich.z)));
        assert!((q.rotate(v).norm() - v.norm()).abs() < 1e-12);
    }

    #[test]
    fn product_applies_right_operand_first() {
        let yaw = Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2);
        let roll = Quaternion::from_rpy(FRAC_PI_2, 0.0, 0.0);
        let v = Vec3::new(0.0, 1.0, 0.0);
        // roll takes y to z, which yaw leaves alone.
        assert!(close(yaw.mul(roll).rotate(v), Vec3::new(0.0, 0.0, 1.0)));
        // yaw takes y to -x, which roll leaves alone.
        assert!(close(roll.mul(yaw).rotate(v), Vec3::new(-1.0, 0.0, 0.0)));
    }

    #[test]
    fn from_rpy_matches_axis_quaternion() {
        let q = Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-12);

        let roll = Quaternion::from_rpy(FRAC_PI_2, 0.0, 0.0);
        let r = roll.rotate(Vec3::new(0.0, 1.0, 0.0));
        assert!(close(r, Vec3::new(0.0, 0.0, 1.0)), "got {r:?}");
    }

    #[test]
    fn normalized_degenerate_is_identity() {
        assert_eq!(
            Quaternion::new(0.0, 0.0, 0.0, 0.0).normalized(),
            Quaternion::identity()
        );
    }

    // ── Transform3D ─────────────────────────────────────────────────────────

    #[test]
    fn compose_with_inverse_is_identity() {
        let t = Transform3D::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quaternion::from_rpy(0.3, -0.2, 1.1),
        );
        let id = t.compose(t.inverse());
        assert!(close(id.translation, Vec3::zero()));
        let p = Vec3::new(0.4, 0.5, 0.6);
        assert!(close(id.apply(p), p));
    }

    #[test]
    fn apply_inverse_undoes_apply() {
        let t = Transform3D::new(
            Vec3::new(0.0, 3.0, 0.0),
            Quaternion::from_rpy(0.0, 0.5, 0.0),
        );
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(close(t.apply_inverse(t.apply(p)), p));
    }

    #[test]
    fn compose_respects_rotation() {
        // base yawed 90°, link 1 m ahead along local +X ⇒ world (0, 1, 0).
        let world_t_base = Transform3D::new(Vec3::zero(), Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2));
        let base_t_link = Transform3D::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let world_t_link = world_t_base.compose(base_t_link);
        assert!(close(world_t_link.translation, Vec3::new(0.0, 1.0, 0.0)));
    }
}
