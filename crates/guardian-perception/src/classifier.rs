//! Spatial Risk Classifier.
//!
//! Decides whether a single [`PointCloudFrame`] contains enough obstacle
//! points inside the protective volume around the vehicle to count as a
//! collision risk for that frame.
//!
//! Every point runs through a four-stage filter in the vehicle frame
//! (right-forward-up: `y` longitudinal, `x` lateral, `z` vertical):
//!
//! | Stage | Drops the point when … |
//! |---|---|
//! | Validity | any coordinate is NaN |
//! | Ego footprint | `backward < y < forward` **and** `|x| < side` (it is the vehicle itself) |
//! | Height band | `z < height_min` or `z > height_max` |
//! | ROI | `y > roi_forward`, `y < roi_backward` or `|x| > roi_side` |
//!
//! Surviving points are counted and the scan stops as soon as the count
//! reaches [`ClassifierConfig::min_points_in_roi_to_trigger`].
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use guardian_perception::classifier::{classify_frame, ClassifierConfig};
//! use guardian_perception::transform::Transform3D;
//! use guardian_types::{Point3, PointCloudFrame};
//!
//! let config = ClassifierConfig::default();
//! let frame = PointCloudFrame {
//!     frame_id: "lidar_top".into(),
//!     timestamp: Utc::now(),
//!     points: vec![Point3::new(0.0, 5.0, 0.0); 10],
//! };
//! assert!(classify_frame(&frame, &Transform3D::identity(), &config));
//! ```

use guardian_types::{Point3, PointCloudFrame};
use tracing::trace;

use crate::transform::Transform3D;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// The vehicle's own footprint.  Points strictly inside it are returns from
/// the vehicle body and are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EgoFootprintBox {
    pub forward: f32,
    /// Stored as a negative bound.
    pub backward: f32,
    pub side: f32,
}

impl EgoFootprintBox {
    /// Build from positive extents; `backward` is negated.
    pub fn from_extents(forward: f32, backward: f32, side: f32) -> Self {
        Self {
            forward,
            backward: -backward,
            side,
        }
    }

    /// Strict containment: boundary points are not on the vehicle.
    pub fn contains(&self, p: Point3) -> bool {
        p.y < self.forward && p.y > self.backward && p.x.abs() < self.side
    }
}

/// The protective field: a rectangle in the ground plane plus a height band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectiveRoi {
    pub forward: f32,
    /// Stored as a negative bound.
    pub backward: f32,
    pub side: f32,
    pub height_min: f32,
    pub height_max: f32,
}

impl ProtectiveRoi {
    /// Build from positive distances; `backward` is negated.
    pub fn from_extents(
        forward: f32,
        backward: f32,
        side: f32,
        height_min: f32,
        height_max: f32,
    ) -> Self {
        Self {
            forward,
            backward: -backward,
            side,
            height_min,
            height_max,
        }
    }

    pub fn in_height_band(&self, p: Point3) -> bool {
        p.z >= self.height_min && p.z <= self.height_max
    }

    /// Inclusive rectangle test in the ground plane.
    pub fn contains_footprint(&self, p: Point3) -> bool {
        p.y <= self.forward && p.y >= self.backward && p.x.abs() <= self.side
    }
}

/// Everything [`classify_frame`] needs besides the frame and transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub ego_box: EgoFootprintBox,
    pub roi: ProtectiveRoi,
    /// A value of 0 triggers on the first surviving point; callers are
    /// expected to reject it during configuration.
    pub min_points_in_roi_to_trigger: u32,
}

impl Default for ClassifierConfig {
    /// A compact passenger car with a 10 m forward protective field.
    fn default() -> Self {
        Self {
            ego_box: EgoFootprintBox::from_extents(2.0, 1.0, 1.0),
            roi: ProtectiveRoi::from_extents(10.0, 2.0, 3.0, -1.0, 2.0),
            min_points_in_roi_to_trigger: 5,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

/// Diagnostic result of a single frame scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameVerdict {
    pub risk: bool,
    /// Points that survived all four filter stages.
    pub points_in_roi: u32,
    /// Points examined before the scan stopped.
    pub points_scanned: usize,
}

/// Which stage, if any, rejected a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Invalid,
    EgoVehicle,
    OutsideHeightBand,
    OutsideRoi,
}

fn filter_point(
    point: Point3,
    transform: &Transform3D,
    config: &ClassifierConfig,
) -> Result<Point3, Rejection> {
    if point.is_nan() {
        return Err(Rejection::Invalid);
    }
    let p = transform.apply(point);
    if config.ego_box.contains(p) {
        return Err(Rejection::EgoVehicle);
    }
    if !config.roi.in_height_band(p) {
        return Err(Rejection::OutsideHeightBand);
    }
    if !config.roi.contains_footprint(p) {
        return Err(Rejection::OutsideRoi);
    }
    Ok(p)
}

/// Scan `frame` and report how many points survived filtering.
///
/// Stops at the first point that brings the count to the trigger threshold.
pub fn classify_frame_detailed(
    frame: &PointCloudFrame,
    sensor_to_vehicle: &Transform3D,
    config: &ClassifierConfig,
) -> FrameVerdict {
    let mut points_in_roi: u32 = 0;

    for (index, point) in frame.points.iter().enumerate() {
        match filter_point(*point, sensor_to_vehicle, config) {
            Ok(_) => {
                points_in_roi += 1;
                if points_in_roi >= config.min_points_in_roi_to_trigger {
                    trace!(frame_id = %frame.frame_id, points_in_roi, "ROI threshold reached");
                    return FrameVerdict {
                        risk: true,
                        points_in_roi,
                        points_scanned: index + 1,
                    };
                }
            }
            Err(Rejection::Invalid) => {}
            Err(reason) => trace!(?reason, "point rejected"),
        }
    }

    FrameVerdict {
        risk: false,
        points_in_roi,
        points_scanned: frame.points.len(),
    }
}

/// Return `true` when at least `min_points_in_roi_to_trigger` points of
/// `frame` fall inside the protective volume.  Pure function of its inputs.
pub fn classify_frame(
    frame: &PointCloudFrame,
    sensor_to_vehicle: &Transform3D,
    config: &ClassifierConfig,
) -> bool {
    classify_frame_detailed(frame, sensor_to_vehicle, config).risk
}
