//! `guardian-kernel` – Safety state and decision logic.
//!
//! Turns per-frame verdicts into a debounced alarm and the alarm into the
//! vehicle-wide safety status.
//!
//! # Modules
//!
//! - [`hysteresis`] – [`HysteresisTracker`][hysteresis::HysteresisTracker]:
//!   requires N consecutive risky frames before alarming, drops out after one
//!   clean frame.
//! - [`safety_monitor`] – [`SafetyMonitor`][safety_monitor::SafetyMonitor]:
//!   periodic, level-triggered latch that derives the
//!   [`SafetyStatus`][guardian_types::SafetyStatus] from the newest collision
//!   warning.
//! - [`status`] – [`SafetyStatusHandle`][status::SafetyStatusHandle]: the
//!   shared record the monitor writes and the rest of the vehicle reads.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: deadline tracking used
//!   to report whether the warning stream is still alive.

pub mod hysteresis;
pub mod safety_monitor;
pub mod status;
pub mod watchdog;

pub use hysteresis::HysteresisTracker;
pub use safety_monitor::{MonitorState, SafetyMonitor, DEFAULT_PASSENGER_MSG};
pub use status::SafetyStatusHandle;
pub use watchdog::Watchdog;
