//! `guardian-runtime` – wiring of the collision guardian.
//!
//! Puts the pieces from the lower crates together into the two concurrent
//! activities of a running guardian: the per-frame pipeline and the periodic
//! safety monitor.
//!
//! # Modules
//!
//! - [`collision_guardian`] – [`CollisionGuardian`][collision_guardian::CollisionGuardian]:
//!   resolve → classify → debounce → publish for every incoming
//!   [`PointCloudFrame`][guardian_types::PointCloudFrame], plus the async
//!   [`run_frame_loop`][collision_guardian::run_frame_loop] that drives it from
//!   the event bus.
//! - [`config`] – [`GuardianConfig`][config::GuardianConfig]: the serde
//!   configuration block, its validation rules, and conversion into classifier
//!   bounds and a seeded [`TfBuffer`][guardian_perception::TfBuffer].
//! - [`monitor_task`] – [`MonitorTask`][monitor_task::MonitorTask]: runs a
//!   [`SafetyMonitor`][guardian_kernel::SafetyMonitor] on a Tokio interval.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: console logging
//!   with optional OTLP span export.

pub mod collision_guardian;
pub mod config;
pub mod monitor_task;
pub mod telemetry;

pub use collision_guardian::{run_frame_loop, CollisionGuardian, GuardianStats};
pub use config::{GuardianConfig, StaticTransformConfig};
pub use monitor_task::MonitorTask;
pub use telemetry::{init_tracing, LogFormat, TracerProviderGuard};
