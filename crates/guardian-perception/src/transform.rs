//! Transform Frame (TF) resolution.
//!
//! Maintains directed graphs of named reference frames and the 3-D rigid-body
//! transforms (translation + quaternion rotation) that relate them.  Given a
//! target frame and a source frame the resolver composes a chain of transforms
//! via BFS and returns the [`Transform3D`] that maps points expressed in the
//! source frame into the target frame.
//!
//! Two resolvers are provided:
//!
//! - [`TfEngine`] – static graph, timestamps are ignored.
//! - [`TfBuffer`] – time-stamped samples per edge; a lookup only succeeds when
//!   every edge on the path has a sample within the configured tolerance of
//!   the requested time.
//!
//! # Example
//!
//! ```rust
//! use guardian_perception::transform::{TfEngine, Transform3D, Vec3, Quaternion};
//!
//! let mut tf = TfEngine::new();
//!
//! // The LiDAR sits 1.5 m above the rear axle, same orientation.
//! tf.set_transform("base_link", "lidar_top",
//!     Transform3D::new(Vec3::new(0.0, 0.0, 1.5), Quaternion::identity()));
//!
//! let t = tf.lookup("base_link", "lidar_top").unwrap();
//! assert!((t.translation.z - 1.5).abs() < 1e-5);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};
use guardian_types::{GuardianError, Point3};

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl From<Point3> for Vec3 {
    fn from(p: Point3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Point3::new(v.x, v.y, v.z)
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `yaw_rad` around the vertical (Z) axis.
    pub fn from_yaw(yaw_rad: f32) -> Self {
        let half = yaw_rad * 0.5;
        Self::new(half.cos(), 0.0, 0.0, half.sin())
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body 3-D transform.
///
/// Represents the pose of frame B relative to frame A: to convert a point
/// expressed in frame B into frame A, rotate it by `rotation` then add
/// `translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two transforms: `self` applied first, then `other`.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        let rotated = self.rotation.mul(other.rotation);
        Self::new(translated, rotated)
    }

    /// Map a point expressed in frame B into frame A.
    pub fn apply(&self, point: Point3) -> Point3 {
        self.translation.add(self.rotation.rotate(point.into())).into()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver trait
// ────────────────────────────────────────────────────────────────────────────

/// Source of sensor-to-vehicle transforms for the collision pipeline.
///
/// Implementations return the transform that maps points in `source_frame`
/// into `target_frame` at `timestamp`, or
/// [`GuardianError::TransformUnavailable`].  Callers never retry.
pub trait TransformResolver: Send + Sync {
    fn resolve(
        &self,
        timestamp: DateTime<Utc>,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<Transform3D, GuardianError>;
}

impl<R: TransformResolver + ?Sized> TransformResolver for std::sync::Arc<R> {
    fn resolve(
        &self,
        timestamp: DateTime<Utc>,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<Transform3D, GuardianError> {
        (**self).resolve(timestamp, target_frame, source_frame)
    }
}

fn unavailable(timestamp: DateTime<Utc>, target_frame: &str, source_frame: &str) -> GuardianError {
    GuardianError::TransformUnavailable {
        source_frame: source_frame.to_string(),
        target_frame: target_frame.to_string(),
        timestamp,
    }
}

/// BFS from `target_frame` to `source_frame`; `edge` yields the transform of
/// a parent→child edge, or `None` if the edge is unusable.
fn search<'a, F>(
    children: impl Fn(&str) -> Option<Vec<&'a str>>,
    edge: F,
    target_frame: &str,
    source_frame: &str,
) -> Option<Transform3D>
where
    F: Fn(&str, &str) -> Option<Transform3D>,
{
    if target_frame == source_frame {
        return Some(Transform3D::identity());
    }

    let mut queue: VecDeque<(String, Transform3D)> = VecDeque::new();
    let mut visited: HashSet<String> = HashSet::new();

    queue.push_back((target_frame.to_string(), Transform3D::identity()));
    visited.insert(target_frame.to_string());

    while let Some((current, accumulated)) = queue.pop_front() {
        let Some(next_frames) = children(&current) else {
            continue;
        };
        for next in next_frames {
            if visited.contains(next) {
                continue;
            }
            let Some(edge_tf) = edge(&current, next) else {
                continue;
            };
            let composed = accumulated.compose(edge_tf);
            if next == source_frame {
                return Some(composed);
            }
            visited.insert(next.to_string());
            queue.push_back((next.to_string(), composed));
        }
    }

    None
}

// ────────────────────────────────────────────────────────────────────────────
// TfEngine
// ────────────────────────────────────────────────────────────────────────────

/// A directed graph of named reference frames and the static
/// [`Transform3D`]s that relate them.
///
/// Edges are directional: adding `"A" → "B"` does not automatically create
/// the inverse.
#[derive(Debug, Default)]
pub struct TfEngine {
    /// `edges[parent][child] = T_parent_child`
    edges: HashMap<String, HashMap<String, Transform3D>>,
}

impl TfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the transform from `parent_frame` to `child_frame`.
    pub fn set_transform(&mut self, parent_frame: &str, child_frame: &str, transform: Transform3D) {
        self.edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), transform);
    }

    /// Compute the composed [`Transform3D`] that maps points in
    /// `source_frame` into `target_frame`.
    ///
    /// Returns `None` if no path exists between the two frames.
    pub fn lookup(&self, target_frame: &str, source_frame: &str) -> Option<Transform3D> {
        search(
            |frame| {
                self.edges
                    .get(frame)
                    .map(|children| children.keys().map(String::as_str).collect())
            },
            |parent, child| self.edges.get(parent)?.get(child).copied(),
            target_frame,
            source_frame,
        )
    }
}

impl TransformResolver for TfEngine {
    fn resolve(
        &self,
        timestamp: DateTime<Utc>,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<Transform3D, GuardianError> {
        self.lookup(target_frame, source_frame)
            .ok_or_else(|| unavailable(timestamp, target_frame, source_frame))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// TfBuffer
// ────────────────────────────────────────────────────────────────────────────

/// Maximum number of dynamic samples retained per edge.
const DEFAULT_HISTORY: usize = 64;

#[derive(Debug)]
enum EdgeSamples {
    Static(Transform3D),
    /// Ordered by timestamp, oldest first.
    Dynamic(VecDeque<(DateTime<Utc>, Transform3D)>),
}

impl EdgeSamples {
    fn at(&self, timestamp: DateTime<Utc>, tolerance: Duration) -> Option<Transform3D> {
        match self {
            EdgeSamples::Static(tf) => Some(*tf),
            EdgeSamples::Dynamic(samples) => samples
                .iter()
                .map(|(stamp, tf)| ((*stamp - timestamp).abs(), *tf))
                .filter(|(delta, _)| *delta <= tolerance)
                .min_by_key(|(delta, _)| *delta)
                .map(|(_, tf)| tf),
        }
    }
}

/// Time-indexed transform store.
///
/// Static edges (mount calibrations) always resolve; dynamic edges resolve to
/// the sample nearest the requested timestamp if it lies within `tolerance`.
#[derive(Debug)]
pub struct TfBuffer {
    edges: HashMap<String, HashMap<String, EdgeSamples>>,
    tolerance: Duration,
    history: usize,
}

impl TfBuffer {
    /// Create an empty buffer accepting samples up to `tolerance` away from
    /// the requested time.
    pub fn new(tolerance: Duration) -> Self {
        Self {
            edges: HashMap::new(),
            tolerance,
            history: DEFAULT_HISTORY,
        }
    }

    /// Register a time-invariant edge, replacing any previous samples.
    pub fn set_static(&mut self, parent_frame: &str, child_frame: &str, transform: Transform3D) {
        self.edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), EdgeSamples::Static(transform));
    }

    /// Record a time-stamped sample for the `parent_frame` → `child_frame`
    /// edge.  A static edge with the same endpoints is replaced.
    pub fn insert(
        &mut self,
        parent_frame: &str,
        child_frame: &str,
        timestamp: DateTime<Utc>,
        transform: Transform3D,
    ) {
        let slot = self
            .edges
            .entry(parent_frame.to_string())
            .or_default()
            .entry(child_frame.to_string())
            .or_insert_with(|| EdgeSamples::Dynamic(VecDeque::new()));
        if matches!(slot, EdgeSamples::Static(_)) {
            *slot = EdgeSamples::Dynamic(VecDeque::new());
        }
        if let EdgeSamples::Dynamic(samples) = slot {
            let pos = samples.partition_point(|(stamp, _)| *stamp <= timestamp);
            samples.insert(pos, (timestamp, transform));
            while samples.len() > self.history {
                samples.pop_front();
            }
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }
}

impl TransformResolver for TfBuffer {
    fn resolve(
        &self,
        timestamp: DateTime<Utc>,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<Transform3D, GuardianError> {
        search(
            |frame| {
                self.edges
                    .get(frame)
                    .map(|children| children.keys().map(String::as_str).collect())
            },
            |parent, child| self.edges.get(parent)?.get(child)?.at(timestamp, self.tolerance),
            target_frame,
            source_frame,
        )
        .ok_or_else(|| unavailable(timestamp, target_frame, source_frame))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    fn translation(x: f32, y: f32, z: f32) -> Transform3D {
        Transform3D::new(Vec3::new(x, y, z), Quaternion::identity())
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn quaternion_identity_rotate_is_noop() {
        let r = Quaternion::identity().rotate(Vec3::new(1.0, 2.0, 3.0));
        assert!((r.x - 1.0).abs() < 1e-5);
        assert!((r.y - 2.0).abs() < 1e-5);
        assert!((r.z - 3.0).abs() < 1e-5);
    }

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert!(r.x.abs() < 1e-5, "x should be ~0, got {}", r.x);
        assert!((r.y - 1.0).abs() < 1e-5, "y should be ~1, got {}", r.y);
        assert!(r.z.abs() < 1e-5);
    }

    #[test]
    fn from_yaw_matches_explicit_quaternion() {
        let q = Quaternion::from_yaw(FRAC_PI_2);
        assert!((q.w - FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((q.z - FRAC_1_SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn quaternion_conjugate_is_inverse() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let prod = q.mul(q.conjugate());
        assert!((prod.w - 1.0).abs() < 1e-5);
        assert!(prod.x.abs() < 1e-5);
        assert!(prod.y.abs() < 1e-5);
        assert!(prod.z.abs() < 1e-5);
    }

    // ── Transform3D ─────────────────────────────────────────────────────────

    #[test]
    fn transform_compose_translations_add() {
        let composed = translation(1.0, 0.0, 0.0).compose(translation(2.0, 0.0, 0.0));
        assert!((composed.translation.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn apply_rotates_then_translates() {
        // Sensor yawed +90° and mounted 1 m forward: its +X axis points
        // along the vehicle's +Y axis.
        let t = Transform3D::new(Vec3::new(0.0, 1.0, 0.0), Quaternion::from_yaw(FRAC_PI_2));
        let p = t.apply(Point3::new(2.0, 0.0, 0.5));
        assert!(p.x.abs() < 1e-5, "x={}", p.x);
        assert!((p.y - 3.0).abs() < 1e-5, "y={}", p.y);
        assert!((p.z - 0.5).abs() < 1e-5);
    }

    // ── TfEngine ────────────────────────────────────────────────────────────

    #[test]
    fn lookup_same_frame_returns_identity() {
        let tf = TfEngine::new();
        assert_eq!(tf.lookup("base_link", "base_link"), Some(Transform3D::identity()));
    }

    #[test]
    fn lookup_composed_chain() {
        let mut tf = TfEngine::new();
        tf.set_transform("base_link", "roof_rack", translation(0.0, 0.5, 1.0));
        tf.set_transform("roof_rack", "lidar_top", translation(0.0, 0.0, 0.5));

        let t = tf.lookup("base_link", "lidar_top").unwrap();
        assert!((t.translation.y - 0.5).abs() < 1e-5);
        assert!((t.translation.z - 1.5).abs() < 1e-5);
    }

    #[test]
    fn lookup_no_path_returns_none() {
        let mut tf = TfEngine::new();
        tf.set_transform("base_link", "lidar_top", translation(0.0, 0.0, 1.5));
        assert!(tf.lookup("lidar_top", "base_link").is_none());
        assert!(tf.lookup("base_link", "ghost_frame").is_none());
    }

    #[test]
    fn set_transform_overrides_previous() {
        let mut tf = TfEngine::new();
        tf.set_transform("base_link", "lidar_top", translation(1.0, 0.0, 0.0));
        tf.set_transform("base_link", "lidar_top", translation(5.0, 0.0, 0.0));
        let t = tf.lookup("base_link", "lidar_top").unwrap();
        assert!((t.translation.x - 5.0).abs() < 1e-5);
    }

    #[test]
    fn engine_resolve_reports_missing_frames() {
        let tf = TfEngine::new();
        let err = tf.resolve(Utc::now(), "base_link", "lidar_top").unwrap_err();
        assert!(matches!(
            err,
            GuardianError::TransformUnavailable { ref source_frame, ref target_frame, .. }
                if source_frame == "lidar_top" && target_frame == "base_link"
        ));
    }

    // ── TfBuffer ────────────────────────────────────────────────────────────

    #[test]
    fn buffer_static_edge_resolves_at_any_time() {
        let mut buf = TfBuffer::new(Duration::milliseconds(50));
        buf.set_static("base_link", "lidar_top", translation(0.0, 0.0, 1.5));
        let t = buf
            .resolve(Utc::now() + Duration::days(3), "base_link", "lidar_top")
            .unwrap();
        assert!((t.translation.z - 1.5).abs() < 1e-5);
    }

    #[test]
    fn buffer_picks_nearest_sample_within_tolerance() {
        let t0 = Utc::now();
        let mut buf = TfBuffer::new(Duration::milliseconds(50));
        buf.insert("base_link", "lidar_top", t0, translation(1.0, 0.0, 0.0));
        buf.insert("base_link", "lidar_top", t0 + Duration::milliseconds(100), translation(2.0, 0.0, 0.0));

        let near_first = buf
            .resolve(t0 + Duration::milliseconds(20), "base_link", "lidar_top")
            .unwrap();
        assert!((near_first.translation.x - 1.0).abs() < 1e-5);

        let near_second = buf
            .resolve(t0 + Duration::milliseconds(90), "base_link", "lidar_top")
            .unwrap();
        assert!((near_second.translation.x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn buffer_fails_outside_tolerance() {
        let t0 = Utc::now();
        let mut buf = TfBuffer::new(Duration::milliseconds(50));
        buf.insert("base_link", "lidar_top", t0, translation(1.0, 0.0, 0.0));
        assert!(
            buf.resolve(t0 + Duration::milliseconds(500), "base_link", "lidar_top")
                .is_err()
        );
    }

    #[test]
    fn buffer_chain_needs_every_edge_in_tolerance() {
        let t0 = Utc::now();
        let mut buf = TfBuffer::new(Duration::milliseconds(10));
        buf.set_static("base_link", "roof_rack", translation(0.0, 0.0, 1.0));
        buf.insert("roof_rack", "lidar_top", t0, translation(0.0, 0.0, 0.5));

        let t = buf.resolve(t0, "base_link", "lidar_top").unwrap();
        assert!((t.translation.z - 1.5).abs() < 1e-5);
        assert!(buf.resolve(t0 + Duration::seconds(1), "base_link", "lidar_top").is_err());
    }

    #[test]
    fn buffer_history_is_bounded() {
        let t0 = Utc::now();
        let mut buf = TfBuffer::new(Duration::milliseconds(1));
        for i in 0..(DEFAULT_HISTORY as i64 + 10) {
            buf.insert("base_link", "lidar_top", t0 + Duration::seconds(i), translation(i as f32, 0.0, 0.0));
        }
        // The oldest samples were evicted.
        assert!(buf.resolve(t0, "base_link", "lidar_top").is_err());
        let last = t0 + Duration::seconds(DEFAULT_HISTORY as i64 + 9);
        assert!(buf.resolve(last, "base_link", "lidar_top").is_ok());
    }
}
