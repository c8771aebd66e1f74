//! Classifier.
//!
//! Labels points against a posed [`BodySet`].  Two modes share the same
//! per-point code:
//!
//! | Mode         | Labels produced              |
//! |--------------|------------------------------|
//! | containment  | `Inside`, `Outside`          |
//! | intersection | `Inside`, `Outside`, `Shadow`|
//!
//! Batches are labelled independently per point, so large clouds are split
//! across the rayon pool when [`Classifier::parallel`] is set.  Output
//! order always matches input order.

use rayon::prelude::*;
use selfmask_perception::{BoundingSphere, merge_bounding_spheres};
use selfmask_types::{Label, Vec3};

use crate::body_set::BodySet;

/// Callback receiving the occluding surface point of each shadowed point.
///
/// Called from rayon worker threads when classification runs in parallel.
pub type ShadowObserver<'a> = &'a (dyn Fn(Vec3) + Sync);

/// Below this many points a batch is always classified sequentially.
const PARALLEL_THRESHOLD: usize = 2048;

/// Per-batch view of a posed body set.
#[derive(Debug)]
pub struct Classifier<'a> {
    bodies: &'a BodySet,
    merged: BoundingSphere,
    parallel: bool,
}

impl<'a> Classifier<'a> {
    /// Snapshot `bodies` for one batch and merge their bounding spheres.
    pub fn new(bodies: &'a BodySet, parallel: bool) -> Self {
        let spheres: Vec<BoundingSphere> = bodies.links().iter().map(|l| l.bounding).collect();
        Self {
            bodies,
            merged: merge_bounding_spheres(&spheres),
            parallel,
        }
    }

    /// Sphere enclosing every scaled body.
    pub fn merged_sphere(&self) -> BoundingSphere {
        self.merged
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Label each point `Inside` or `Outside`.
    pub fn classify_containment(&self, points: &[Vec3]) -> Vec<Label> {
        self.map_points(points, |p| self.containment_of(p))
    }

    /// Label each point `Inside`, `Outside` or `Shadow` relative to the
    /// sensor origin stored in the body set.
    pub fn classify_intersection(
        &self,
        points: &[Vec3],
        observer: Option<ShadowObserver<'_>>,
    ) -> Vec<Label> {
        self.map_points(points, |p| self.intersection_of(p, observer))
    }

    /// Non-finite points are always `Outside`.
    pub fn containment_of(&self, p: Vec3) -> Label {
        if self.bodies.is_empty() || !p.is_finite() {
            return Label::Outside;
        }
        if self.may_be_inside(p) && self.inside_scaled(p) {
            Label::Inside
        } else {
            Label::Outside
        }
    }

    pub fn intersection_of(&self, p: Vec3, observer: Option<ShadowObserver<'_>>) -> Label {
        if self.bodies.is_empty() || !p.is_finite() {
            return Label::Outside;
        }
        let maybe_inside = self.may_be_inside(p);

        // Points on the true surface are self even when they also occlude.
        if maybe_inside
            && self
                .bodies
                .links()
                .iter()
                .any(|l| l.unscaled.contains_point(p))
        {
            return Label::Inside;
        }

        let sensor = self.bodies.sensor();
        let to_sensor = sensor.position.sub(p);
        if to_sensor.norm() < sensor.min_standoff {
            return Label::Inside;
        }

        // A point at the sensor has no ray; only containment can claim it.
        if let Some(dir) = to_sensor.normalize() {
            for link in self.bodies.links() {
                let Some(&hit) = link.scaled.intersects_ray(p, dir, 1).first() else {
                    continue;
                };
                // Hits beyond the sensor do not occlude.
                if dir.dot(sensor.position.sub(hit)) >= 0.0 {
                    if let Some(observe) = observer {
                        observe(hit);
                    }
                    return Label::Shadow;
                }
            }
        }

        if maybe_inside && self.inside_scaled(p) {
            Label::Inside
        } else {
            Label::Outside
        }
    }

    fn may_be_inside(&self, p: Vec3) -> bool {
        self.merged.contains(p)
    }

    fn inside_scaled(&self, p: Vec3) -> bool {
        self.bodies.links().iter().any(|l| {
            l.bounding.center.distance_squared(p) <= l.radius2 && l.scaled.contains_point(p)
        })
    }

    fn map_points<F>(&self, points: &[Vec3], label: F) -> Vec<Label>
    where
        F: Fn(Vec3) -> Label + Sync + Send,
    {
        if self.parallel && points.len() >= PARALLEL_THRESHOLD {
            points.par_iter().map(|&p| label(p)).collect()
        } else {
            points.iter().map(|&p| label(p)).collect()
        }
    }
}
