//! [`SafetyMonitor`] – level-triggered emergency-stop latch.
//!
//! Runs on its own clock, independent of frame arrival.  Each tick it looks at
//! the newest [`CollisionWarning`][guardian_types::CollisionWarning] on the bus
//! and re-derives the whole [`SafetyStatus`][guardian_types::SafetyStatus]
//! from it:
//!
//! | Latest warning | Resulting state |
//! |---|---|
//! | present, `is_collision = true` | **Triggered**: message set, trigger time = tick time, emergency stop required |
//! | absent, or `is_collision = false` | **Clear**: all three fields cleared |
//!
//! Warnings published between two ticks are coalesced; only the newest one
//! counts.  While triggered, every tick re-stamps the trigger time with the
//! current tick time.

use chrono::{DateTime, Duration, Utc};
use guardian_middleware::LatestObserved;
use guardian_types::ComponentHealth;
use tracing::{info, warn};

use crate::status::SafetyStatusHandle;
use crate::watchdog::Watchdog;

/// Default driver-facing message while an emergency stop is required.
pub const DEFAULT_PASSENGER_MSG: &str = "EMERGENCY BRAKING! Imminent Collision!";

/// Watchdog key for the collision-warning stream.
const WARNING_STREAM: &str = "collision_warnings";

/// The two states of the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Clear,
    Triggered,
}

/// Periodic observer that owns the write side of a [`SafetyStatusHandle`].
pub struct SafetyMonitor {
    reader: LatestObserved,
    status: SafetyStatusHandle,
    passenger_msg: String,
    watchdog: Watchdog,
    warning_timeout: Duration,
    started: bool,
    state: MonitorState,
    stream_health: ComponentHealth,
}

impl SafetyMonitor {
    /// Build a monitor reading from `reader` and writing into `status`.
    pub fn new(reader: LatestObserved, status: SafetyStatusHandle) -> Self {
        Self {
            reader,
            status,
            passenger_msg: DEFAULT_PASSENGER_MSG.to_string(),
            watchdog: Watchdog::new(),
            warning_timeout: Duration::seconds(1),
            started: false,
            state: MonitorState::Clear,
            stream_health: ComponentHealth::Healthy,
        }
    }

    /// Override the driver-facing message.
    pub fn with_passenger_msg(mut self, msg: impl Into<String>) -> Self {
        self.passenger_msg = msg.into();
        self
    }

    /// Deadline after which the warning stream is reported as timed out.
    pub fn with_warning_timeout(mut self, timeout: Duration) -> Self {
        self.warning_timeout = timeout;
        self
    }

    /// Handle to the status record this monitor writes.
    pub fn status(&self) -> SafetyStatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// One monitor tick at `now`.
    pub fn run_once(&mut self, now: DateTime<Utc>) -> MonitorState {
        if !self.started {
            self.watchdog.register(WARNING_STREAM, self.warning_timeout, now);
            self.started = true;
        }

        if self.reader.observe() {
            self.watchdog.heartbeat(WARNING_STREAM, now);
        }
        let stream_health = self.watchdog.health(WARNING_STREAM, now);

        let collision = self
            .reader
            .latest_observed()
            .is_some_and(|warning| warning.is_collision);

        let next = if collision {
            MonitorState::Triggered
        } else {
            MonitorState::Clear
        };

        self.status.update(|status| {
            status.warning_stream = stream_health;
            match next {
                MonitorState::Triggered => {
                    status.passenger_msg = Some(self.passenger_msg.clone());
                    status.safety_mode_trigger_time = Some(now);
                    status.require_emergency_stop = true;
                }
                MonitorState::Clear => {
                    status.passenger_msg = None;
                    status.safety_mode_trigger_time = None;
                    status.require_emergency_stop = false;
                }
            }
        });

        if next != self.state {
            match next {
                MonitorState::Triggered => {
                    warn!(msg = %self.passenger_msg, "collision warning active; emergency stop required")
                }
                MonitorState::Clear => info!("collision warning cleared"),
            }
        }
        if stream_health != self.stream_health && stream_health == ComponentHealth::TimedOut {
            warn!(
                timeout_ms = self.warning_timeout.num_milliseconds(),
                "collision warning stream is silent"
            );
        }

        self.state = next;
        self.stream_health = stream_health;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardian_middleware::{EventBus, WarningSink};
    use guardian_types::CollisionWarning;

    fn setup() -> (EventBus, SafetyMonitor) {
        let bus = EventBus::default();
        let monitor = SafetyMonitor::new(LatestObserved::subscribe(&bus), SafetyStatusHandle::new());
        (bus, monitor)
    }

    #[test]
    fn no_warning_means_clear() {
        let (_bus, mut monitor) = setup();
        assert_eq!(monitor.run_once(Utc::now()), MonitorState::Clear);
        assert!(monitor.status().snapshot().is_clear());
    }

    #[test]
    fn true_warning_triggers_on_next_tick() {
        let (bus, mut monitor) = setup();
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();

        let tick = Utc::now();
        assert_eq!(monitor.run_once(tick), MonitorState::Triggered);

        let status = monitor.status().snapshot();
        assert!(status.require_emergency_stop);
        assert_eq!(status.passenger_msg.as_deref(), Some(DEFAULT_PASSENGER_MSG));
        assert_eq!(status.safety_mode_trigger_time, Some(tick));
    }

    #[test]
    fn false_warning_clears_all_fields() {
        let (bus, mut monitor) = setup();
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();
        monitor.run_once(Utc::now());

        bus.emit(CollisionWarning::new(Utc::now(), false)).unwrap();
        assert_eq!(monitor.run_once(Utc::now()), MonitorState::Clear);

        let status = monitor.status().snapshot();
        assert!(status.is_clear());
    }

    #[test]
    fn repeated_ticks_restamp_trigger_time() {
        let (bus, mut monitor) = setup();
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();

        let t0 = Utc::now();
        monitor.run_once(t0);
        let t1 = t0 + Duration::milliseconds(100);
        monitor.run_once(t1);

        let status = monitor.status().snapshot();
        assert!(status.require_emergency_stop);
        assert_eq!(status.safety_mode_trigger_time, Some(t1));
    }

    #[test]
    fn only_the_newest_warning_counts() {
        let (bus, mut monitor) = setup();
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();
        bus.emit(CollisionWarning::new(Utc::now(), false)).unwrap();
        assert_eq!(monitor.run_once(Utc::now()), MonitorState::Clear);

        bus.emit(CollisionWarning::new(Utc::now(), false)).unwrap();
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();
        assert_eq!(monitor.run_once(Utc::now()), MonitorState::Triggered);
    }

    #[test]
    fn custom_passenger_message_is_used() {
        let (bus, monitor) = setup();
        let mut monitor = monitor.with_passenger_msg("STOP");
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();
        monitor.run_once(Utc::now());
        assert_eq!(monitor.status().snapshot().passenger_msg.as_deref(), Some("STOP"));
    }

    #[test]
    fn silent_stream_is_reported_without_changing_latch() {
        let (bus, monitor) = setup();
        let mut monitor = monitor.with_warning_timeout(Duration::milliseconds(100));
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();

        let t0 = Utc::now();
        monitor.run_once(t0);
        assert_eq!(monitor.status().snapshot().warning_stream, ComponentHealth::Healthy);

        // No new warnings for a while: the latch still follows the last one.
        let later = t0 + Duration::seconds(1);
        assert_eq!(monitor.run_once(later), MonitorState::Triggered);
        let status = monitor.status().snapshot();
        assert_eq!(status.warning_stream, ComponentHealth::TimedOut);
        assert!(status.require_emergency_stop);
    }
}
