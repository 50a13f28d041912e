//! `guardian-perception` – Spatial reasoning for the collision guardian.
//!
//! Turns raw sensor point clouds into a per-frame "is something inside the
//! protective field?" verdict.
//!
//! # Modules
//!
//! - [`transform`] – [`TfEngine`][transform::TfEngine] and
//!   [`TfBuffer`][transform::TfBuffer]: resolve the rigid transform that maps
//!   sensor-frame points into the vehicle frame, behind the
//!   [`TransformResolver`][transform::TransformResolver] trait.
//! - [`classifier`] – [`classify_frame`][classifier::classify_frame]: the
//!   four-stage geometric filter (validity, ego footprint, height band, ROI)
//!   with early exit once enough points are found.

pub mod classifier;
pub mod transform;

pub use classifier::{
    classify_frame, classify_frame_detailed, ClassifierConfig, EgoFootprintBox, FrameVerdict,
    ProtectiveRoi,
};
pub use transform::{Quaternion, TfBuffer, TfEngine, Transform3D, TransformResolver, Vec3};
