//! Static frame tree.
//!
//! Holds the fixed rigid transforms between named reference frames.  Given
//! two frame names, the tree finds the chain of edges between them (walking
//! edges in either direction) and composes the result.
//!
//! The self filter only ever sees the [`TransformProvider`] trait; the
//! [`TfBuffer`] is the in-process implementation that scene files, simulators
//! and tests feed.  Time-varying transforms come from other providers.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use chrono::Utc;
//! use selfmask_perception::transform::{TfBuffer, TransformProvider};
//! use selfmask_types::{Quaternion, Transform3D, Vec3};
//!
//! let tf = TfBuffer::new();
//! tf.set_static_transform("base_link", "torso",
//!     Transform3D::new(Vec3::new(0.0, 0.0, 0.5), Quaternion::identity()));
//! tf.set_static_transform("torso", "head_camera",
//!     Transform3D::new(Vec3::new(0.1, 0.0, 0.4), Quaternion::identity()));
//!
//! // Pose of the camera expressed in base_link.
//! let t = tf.lookup("base_link", "head_camera", Utc::now(), Duration::ZERO).unwrap();
//! assert!((t.translation.z - 0.9).abs() < 1e-9);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use selfmask_types::Transform3D;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Collaborator interface
// ────────────────────────────────────────────────────────────────────────────

/// Errors returned by a [`TransformProvider`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("frame '{0}' does not exist")]
    UnknownFrame(String),

    #[error("frames '{target}' and '{frame}' are not connected")]
    NotConnected { target: String, frame: String },

    #[error("timed out after {waited_ms} ms: {reason}")]
    Timeout { waited_ms: u128, reason: String },
}

/// Source of already-resolved rigid transforms.
pub trait TransformProvider: Send + Sync {
    /// Return T_target_source: the transform mapping points expressed in
    /// `source_frame` into `target_frame`, as of `stamp`.
    ///
    /// Providers that buffer live data may block for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Any [`TransformError`]; after a non-zero wait expires the error is
    /// [`TransformError::Timeout`].
    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<Transform3D, TransformError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TfBuffer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct FrameTree {
    /// `edges[parent][child]` = pose of the child in the parent.
    edges: HashMap<String, HashMap<String, Transform3D>>,
    /// `parents[child]` – reverse adjacency used for upward walks.
    parents: HashMap<String, HashSet<String>>,
}

impl FrameTree {
    fn knows(&self, frame: &str) -> bool {
        self.edges.contains_key(frame) || self.parents.contains_key(frame)
    }

    /// Poses of the frames adjacent to `frame`, expressed in `frame`.
    fn neighbours<'a>(&'a self, frame: &str) -> impl Iterator<Item = (&'a String, Transform3D)> {
        let children = self.edges.get(frame).into_iter().flatten().map(|(c, t)| (c, *t));
        let parents = self
            .parents
            .get(frame)
            .into_iter()
            .flatten()
            .filter_map(move |p| Some((p, self.edges.get(p)?.get(frame)?.inverse())));
        children.chain(parents)
    }

    /// Breadth-first walk from `target`, composing poses until `source`.
    fn resolve(&self, target: &str, source: &str) -> Result<Transform3D, TransformError> {
        if target == source {
            return Ok(Transform3D::identity());
        }
        for frame in [target, source] {
            if !self.knows(frame) {
                return Err(TransformError::UnknownFrame(frame.to_string()));
            }
        }

        // Each queued frame carries its pose in `target`.
        let mut queue = VecDeque::from([(target.to_string(), Transform3D::identity())]);
        let mut visited = HashSet::from([target.to_string()]);
        while let Some((frame, target_t_frame)) = queue.pop_front() {
            for (next, frame_t_next) in self.neighbours(&frame) {
                let target_t_next = target_t_frame.compose(frame_t_next);
                if next == source {
                    return Ok(target_t_next);
                }
                if visited.insert(next.clone()) {
                    queue.push_back((next.clone(), target_t_next));
                }
            }
        }
        Err(TransformError::NotConnected {
            target: target.to_string(),
            frame: source.to_string(),
        })
    }
}

/// Thread-safe store of fixed frame-to-frame transforms.
///
/// Edges are directional (`parent → child`, holding the pose of the child in
/// the parent) but lookups walk them both ways, inverting as needed.  Every
/// edge is valid at every stamp, so lookups never wait.
#[derive(Debug, Default)]
pub struct TfBuffer {
    tree: Mutex<FrameTree>,
}

impl TfBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> MutexGuard<'_, FrameTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the pose of `child_frame` in `parent_frame`, replacing any
    /// earlier one.
    pub fn set_static_transform(&self, parent_frame: &str, child_frame: &str, transform: Transform3D) {
        let mut tree = self.tree();
        tree.edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), transform);
        tree.parents
            .entry(child_frame.to_string())
            .or_default()
            .insert(parent_frame.to_string());
    }

    /// True when `frame` appears in any edge.
    pub fn has_frame(&self, frame: &str) -> bool {
        self.tree().knows(frame)
    }
}

impl TransformProvider for TfBuffer {
    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        _stamp: DateTime<Utc>,
        _timeout: Duration,
    ) -> Result<Transform3D, TransformError> {
        self.tree().resolve(target_frame, source_frame)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
