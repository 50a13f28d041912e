use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A single LiDAR return, expressed in whatever frame the owning
/// [`PointCloudFrame`] names.
///
/// Coordinates may be NaN when the sensor reported no return; consumers must
/// treat such points as invalid.
///
/// JSON has no NaN: `serde_json` writes it as `null`.  Deserialisation maps
/// `null` and the string `"NaN"` back to `f32::NAN` so a missing return only
/// invalidates its own point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    #[serde(deserialize_with = "coordinate")]
    pub x: f32,
    #[serde(deserialize_with = "coordinate")]
    pub y: f32,
    #[serde(deserialize_with = "coordinate")]
    pub z: f32,
}

fn coordinate<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(f32::NAN),
        Some(Raw::Number(value)) => Ok(value),
        Some(Raw::Text(text)) if text.trim().eq_ignore_ascii_case("nan") => Ok(f32::NAN),
        Some(Raw::Text(text)) => Err(serde::de::Error::custom(format!("invalid coordinate {text:?}"))),
    }
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// True when any coordinate is NaN.
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }
}

/// One sweep of the sensor: an ordered list of points, the coordinate frame
/// they are expressed in, and the capture time.
///
/// Owned by the producer; the collision pipeline only ever borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloudFrame {
    /// Sensor frame identifier, e.g. `"lidar_front"`.
    pub frame_id: String,
    pub timestamp: DateTime<Utc>,
    pub points: Vec<Point3>,
}

/// Debounced collision verdict published once per successfully processed
/// frame, including frames that resolve to "no risk".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionWarning {
    pub id: Uuid,
    /// Frame-processing start time.
    pub timestamp: DateTime<Utc>,
    pub is_collision: bool,
}

impl CollisionWarning {
    pub fn new(timestamp: DateTime<Utc>, is_collision: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            is_collision,
        }
    }
}

/// Liveness of a monitored component or stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComponentHealth {
    /// A heartbeat arrived within the deadline.
    Healthy,
    /// No heartbeat within the deadline (or never registered).
    #[default]
    TimedOut,
}

/// Vehicle-wide safety state written by the safety monitor.
///
/// The three safety fields are either all set (a collision warning is active)
/// or all cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyStatus {
    /// Driver-facing message, e.g. `"EMERGENCY BRAKING! Imminent Collision!"`.
    pub passenger_msg: Option<String>,
    /// Monitor tick time at which the active warning was last confirmed.
    pub safety_mode_trigger_time: Option<DateTime<Utc>>,
    pub require_emergency_stop: bool,
    /// Liveness of the collision-warning stream. Informational only.
    #[serde(default)]
    pub warning_stream: ComponentHealth,
}

impl SafetyStatus {
    /// True when all three safety fields are cleared.
    pub fn is_clear(&self) -> bool {
        self.passenger_msg.is_none()
            && self.safety_mode_trigger_time.is_none()
            && !self.require_emergency_stop
    }
}

/// Unified event wrapper for the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "guardian-runtime::collision_guardian"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    PointCloud(PointCloudFrame),
    CollisionWarning(CollisionWarning),
    SystemFault {
        component: String,
        message: String,
    },
}

/// Error type shared by every guardian crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuardianError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Transform Unavailable: {source_frame} -> {target_frame} at {timestamp}")]
    TransformUnavailable {
        source_frame: String,
        target_frame: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("I/O Error: {0}")]
    Io(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_with_any_nan_coordinate_is_nan() {
        assert!(!Point3::new(1.0, 2.0, 3.0).is_nan());
        assert!(Point3::new(f32::NAN, 0.0, 0.0).is_nan());
        assert!(Point3::new(0.0, f32::NAN, 0.0).is_nan());
        assert!(Point3::new(0.0, 0.0, f32::NAN).is_nan());
    }

    #[test]
    fn default_safety_status_is_clear() {
        let status = SafetyStatus::default();
        assert!(status.is_clear());
        assert_eq!(status.warning_stream, ComponentHealth::TimedOut);
    }

    #[test]
    fn safety_status_with_stop_flag_is_not_clear() {
        let status = SafetyStatus {
            require_emergency_stop: true,
            ..SafetyStatus::default()
        };
        assert!(!status.is_clear());
    }

    #[test]
    fn collision_warning_event_roundtrip() {
        let warning = CollisionWarning::new(Utc::now(), true);
        let event = Event::new(
            "guardian-runtime::collision_guardian",
            EventPayload::CollisionWarning(warning.clone()),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        match back.payload {
            EventPayload::CollisionWarning(w) => assert_eq!(w, warning),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn point_cloud_frame_deserializes_from_json() {
        let json = r#"{
            "frame_id": "lidar_front",
            "timestamp": "2024-01-01T00:00:00Z",
            "points": [{"x": 0.0, "y": 5.0, "z": 0.0}]
        }"#;
        let frame: PointCloudFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.frame_id, "lidar_front");
        assert_eq!(frame.points, vec![Point3::new(0.0, 5.0, 0.0)]);
    }

    #[test]
    fn nan_coordinates_survive_json() {
        let frame = PointCloudFrame {
            frame_id: "lidar_front".to_string(),
            timestamp: Utc::now(),
            points: vec![Point3::new(f32::NAN, 0.0, 0.0), Point3::new(0.0, 5.0, 0.0)],
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("null"));

        let back: PointCloudFrame = serde_json::from_str(&json).unwrap();
        assert!(back.points[0].x.is_nan());
        assert!(back.points[0].is_nan());
        assert_eq!(back.points[1], Point3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn nan_string_coordinate_is_accepted() {
        let p: Point3 = serde_json::from_str(r#"{"x": "NaN", "y": 1, "z": 2.5}"#).unwrap();
        assert!(p.x.is_nan());
        assert_eq!(p.y, 1.0);
        assert_eq!(p.z, 2.5);
    }

    #[test]
    fn non_numeric_coordinate_is_rejected() {
        assert!(serde_json::from_str::<Point3>(r#"{"x": "far", "y": 0.0, "z": 0.0}"#).is_err());
    }

    #[test]
    fn guardian_error_display() {
        let err = GuardianError::TransformUnavailable {
            source_frame: "lidar_front".to_string(),
            target_frame: "base_link".to_string(),
            timestamp: Utc::now(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lidar_front"));
        assert!(msg.contains("base_link"));

        let err2 = GuardianError::Config("min_points_in_roi_to_trigger must be > 0".into());
        assert!(err2.to_string().contains("Configuration Error"));
    }
}
