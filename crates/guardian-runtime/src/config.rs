//! [`GuardianConfig`] – the immutable configuration block of one guardian.
//!
//! Deserialised once at startup (see the CLI for the TOML loader), validated
//! with [`GuardianConfig::validate`], then converted into the typed pieces the
//! pipeline needs.  Distances are in metres; backward distances are given as
//! positive numbers and negated internally.

use chrono::Duration;
use guardian_perception::{
    ClassifierConfig, EgoFootprintBox, ProtectiveRoi, Quaternion, TfBuffer, Transform3D, Vec3,
};
use guardian_types::GuardianError;
use serde::{Deserialize, Serialize};

/// A fixed mount transform (`child` expressed in `parent`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransformConfig {
    pub parent: String,
    pub child: String,
    /// `[x, y, z]` in metres.
    #[serde(default)]
    pub translation: [f32; 3],
    /// Unit quaternion `[w, x, y, z]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
}

impl StaticTransformConfig {
    pub fn transform(&self) -> Transform3D {
        let [x, y, z] = self.translation;
        let [w, qx, qy, qz] = self.rotation;
        Transform3D::new(Vec3::new(x, y, z), Quaternion::new(w, qx, qy, qz))
    }
}

fn identity_rotation() -> [f32; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

/// Configuration of the collision guardian and its safety monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Frame every point is transformed into before filtering.
    #[serde(default = "default_vehicle_frame_id")]
    pub vehicle_frame_id: String,

    pub ego_box_forward: f32,
    pub ego_box_backward: f32,
    pub ego_box_side: f32,

    pub roi_forward_distance: f32,
    pub roi_backward_distance: f32,
    pub roi_side_distance: f32,

    pub height_min_threshold: f32,
    pub height_max_threshold: f32,

    pub min_points_in_roi_to_trigger: u32,
    pub min_consecutive_frames_to_trigger: u32,

    /// Safety monitor period.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Silence on the warning stream after which it is reported timed out.
    #[serde(default = "default_warning_timeout_ms")]
    pub warning_timeout_ms: u64,

    #[serde(default = "default_passenger_msg")]
    pub passenger_msg: String,

    /// How far a dynamic transform sample may be from the frame timestamp.
    #[serde(default = "default_transform_tolerance_ms")]
    pub transform_tolerance_ms: u64,

    #[serde(default)]
    pub static_transforms: Vec<StaticTransformConfig>,
}

fn default_vehicle_frame_id() -> String {
    "base_link".to_string()
}
fn default_monitor_interval_ms() -> u64 {
    100
}
fn default_warning_timeout_ms() -> u64 {
    1_000
}
fn default_passenger_msg() -> String {
    guardian_kernel::DEFAULT_PASSENGER_MSG.to_string()
}
fn default_transform_tolerance_ms() -> u64 {
    50
}

impl Default for GuardianConfig {
    fn default() -> Self {
        Self {
            vehicle_frame_id: default_vehicle_frame_id(),
            ego_box_forward: 2.0,
            ego_box_backward: 1.0,
            ego_box_side: 1.0,
            roi_forward_distance: 10.0,
            roi_backward_distance: 2.0,
            roi_side_distance: 3.0,
            height_min_threshold: -1.0,
            height_max_threshold: 2.0,
            min_points_in_roi_to_trigger: 5,
            min_consecutive_frames_to_trigger: 2,
            monitor_interval_ms: default_monitor_interval_ms(),
            warning_timeout_ms: default_warning_timeout_ms(),
            passenger_msg: default_passenger_msg(),
            transform_tolerance_ms: default_transform_tolerance_ms(),
            static_transforms: Vec::new(),
        }
    }
}

fn require(condition: bool, msg: impl Into<String>) -> Result<(), GuardianError> {
    if condition {
        Ok(())
    } else {
        Err(GuardianError::Config(msg.into()))
    }
}

fn positive(name: &str, value: f32) -> Result<(), GuardianError> {
    require(value.is_finite() && value > 0.0, format!("{name} must be a positive finite number, got {value}"))
}

impl GuardianConfig {
    /// Reject configurations that would make the pipeline meaningless or
    /// trigger unconditionally.
    pub fn validate(&self) -> Result<(), GuardianError> {
        require(!self.vehicle_frame_id.trim().is_empty(), "vehicle_frame_id must not be empty")?;

        positive("ego_box_forward", self.ego_box_forward)?;
        positive("ego_box_backward", self.ego_box_backward)?;
        positive("ego_box_side", self.ego_box_side)?;
        positive("roi_forward_distance", self.roi_forward_distance)?;
        positive("roi_backward_distance", self.roi_backward_distance)?;
        positive("roi_side_distance", self.roi_side_distance)?;

        require(
            self.height_min_threshold.is_finite() && self.height_max_threshold.is_finite(),
            "height thresholds must be finite",
        )?;
        require(
            self.height_min_threshold <= self.height_max_threshold,
            format!(
                "height_min_threshold {} exceeds height_max_threshold {}",
                self.height_min_threshold, self.height_max_threshold
            ),
        )?;

        require(
            self.roi_forward_distance >= self.ego_box_forward
                && self.roi_backward_distance >= self.ego_box_backward
                && self.roi_side_distance >= self.ego_box_side,
            "ROI must enclose the ego footprint",
        )?;

        require(self.min_points_in_roi_to_trigger > 0, "min_points_in_roi_to_trigger must be > 0")?;
        require(
            self.min_consecutive_frames_to_trigger > 0,
            "min_consecutive_frames_to_trigger must be > 0",
        )?;
        require(self.monitor_interval_ms > 0, "monitor_interval_ms must be > 0")?;
        require(self.warning_timeout_ms > 0, "warning_timeout_ms must be > 0")?;

        for tf in &self.static_transforms {
            require(
                !tf.parent.is_empty() && !tf.child.is_empty(),
                "static transform frames must be named",
            )?;
            let norm: f32 = tf.rotation.iter().map(|c| c * c).sum::<f32>().sqrt();
            require(
                (norm - 1.0).abs() < 1e-3,
                format!("rotation for {} -> {} is not a unit quaternion", tf.parent, tf.child),
            )?;
        }
        Ok(())
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            ego_box: EgoFootprintBox::from_extents(
                self.ego_box_forward,
                self.ego_box_backward,
                self.ego_box_side,
            ),
            roi: ProtectiveRoi::from_extents(
                self.roi_forward_distance,
                self.roi_backward_distance,
                self.roi_side_distance,
                self.height_min_threshold,
                self.height_max_threshold,
            ),
            min_points_in_roi_to_trigger: self.min_points_in_roi_to_trigger,
        }
    }

    /// A [`TfBuffer`] seeded with every configured static transform.
    pub fn transform_buffer(&self) -> TfBuffer {
        let tolerance = Duration::milliseconds(self.transform_tolerance_ms as i64);
        let mut buffer = TfBuffer::new(tolerance);
        for tf in &self.static_transforms {
            buffer.set_static(&tf.parent, &tf.child, tf.transform());
        }
        buffer
    }

    pub fn monitor_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn warning_timeout(&self) -> Duration {
        Duration::milliseconds(self.warning_timeout_ms as i64)
    }
}
