//! [`Watchdog`] – liveness tracking for periodic streams.
//!
//! A producer (or an observer on its behalf) calls [`Watchdog::heartbeat`]
//! whenever fresh data arrives.  The watchdog considers a component
//! *timed out* once its deadline has elapsed without a heartbeat.
//!
//! All methods take the current time explicitly so that the caller's clock
//! (e.g. the safety monitor's tick time) is the single source of truth.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use guardian_types::ComponentHealth;

struct ComponentEntry {
    last_heartbeat: DateTime<Utc>,
    timeout: Duration,
}

/// Tracks heartbeats from registered components.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use guardian_kernel::watchdog::Watchdog;
/// use guardian_types::ComponentHealth;
///
/// let now = Utc::now();
/// let mut wd = Watchdog::new();
/// wd.register("collision_warnings", Duration::seconds(1), now);
///
/// assert_eq!(wd.health("collision_warnings", now), ComponentHealth::Healthy);
/// assert_eq!(
///     wd.health("collision_warnings", now + Duration::seconds(2)),
///     ComponentHealth::TimedOut
/// );
/// ```
#[derive(Default)]
pub struct Watchdog {
    components: HashMap<String, ComponentEntry>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component_id` with a maximum heartbeat `timeout`, starting
    /// healthy at `now`.
    ///
    /// Re-registering an existing component resets its deadline.
    pub fn register(&mut self, component_id: &str, timeout: Duration, now: DateTime<Utc>) {
        self.components.insert(
            component_id.to_string(),
            ComponentEntry {
                last_heartbeat: now,
                timeout,
            },
        );
    }

    /// Record a heartbeat for `component_id`.
    ///
    /// No-ops for components that have not been registered.
    pub fn heartbeat(&mut self, component_id: &str, now: DateTime<Utc>) {
        if let Some(entry) = self.components.get_mut(component_id) {
            entry.last_heartbeat = now;
        }
    }

    /// Returns [`ComponentHealth::TimedOut`] for unknown components.
    pub fn health(&self, component_id: &str, now: DateTime<Utc>) -> ComponentHealth {
        match self.components.get(component_id) {
            Some(entry) if now - entry.last_heartbeat <= entry.timeout => ComponentHealth::Healthy,
            _ => ComponentHealth::TimedOut,
        }
    }
}
