//! Last-value-wins view over the collision-warning topic.
//!
//! A periodic consumer does not care about every warning, only the newest one
//! at the moment it looks.  [`LatestObserved::observe`] drains whatever has
//! queued up since the previous call without waiting and keeps the most
//! recent [`CollisionWarning`]; older ones are discarded unseen.

use guardian_types::{CollisionWarning, EventPayload};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::debug;

use crate::bus::{EventBus, Topic, TopicReceiver};

/// Polling reader that caches the newest warning seen on the bus.
pub struct LatestObserved {
    receiver: TopicReceiver,
    latest: Option<CollisionWarning>,
}

impl LatestObserved {
    /// Subscribe to [`Topic::CollisionWarnings`] on `bus`.
    ///
    /// Only warnings published after this call are visible.
    pub fn subscribe(bus: &EventBus) -> Self {
        Self {
            receiver: bus.subscribe_to(Topic::CollisionWarnings),
            latest: None,
        }
    }

    /// Drain pending events without blocking.
    ///
    /// Returns `true` when at least one new warning arrived.
    pub fn observe(&mut self) -> bool {
        let mut fresh = false;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let EventPayload::CollisionWarning(warning) = event.payload {
                        self.latest = Some(warning);
                        fresh = true;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "warning reader lagged; skipping to newer warnings");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        fresh
    }

    /// Newest warning seen by the last [`observe`][Self::observe] call, or
    /// `None` if nothing has ever been received.
    pub fn latest_observed(&self) -> Option<&CollisionWarning> {
        self.latest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::WarningSink;
    use chrono::Utc;
    use guardian_types::Event;

    #[test]
    fn nothing_observed_before_first_warning() {
        let bus = EventBus::default();
        let mut reader = LatestObserved::subscribe(&bus);
        assert!(!reader.observe());
        assert!(reader.latest_observed().is_none());
    }

    #[test]
    fn keeps_only_the_newest_warning() {
        let bus = EventBus::default();
        let mut reader = LatestObserved::subscribe(&bus);

        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();
        let last = CollisionWarning::new(Utc::now(), false);
        bus.emit(last.clone()).unwrap();

        assert!(reader.observe());
        assert_eq!(reader.latest_observed(), Some(&last));
        assert!(!reader.observe());
    }

    #[test]
    fn latest_survives_empty_polls() {
        let bus = EventBus::default();
        let mut reader = LatestObserved::subscribe(&bus);
        bus.emit(CollisionWarning::new(Utc::now(), true)).unwrap();

        assert!(reader.observe());
        assert!(!reader.observe());
        assert!(reader.latest_observed().is_some_and(|w| w.is_collision));
    }

    #[test]
    fn lagged_reader_still_lands_on_newest() {
        let bus = EventBus::new(4);
        let mut reader = LatestObserved::subscribe(&bus);
        for _ in 0..20 {
            bus.emit(CollisionWarning::new(Utc::now(), false)).unwrap();
        }
        let last = CollisionWarning::new(Utc::now(), true);
        bus.emit(last.clone()).unwrap();

        assert!(reader.observe());
        assert_eq!(reader.latest_observed(), Some(&last));
    }

    #[test]
    fn non_warning_payloads_are_ignored() {
        let bus = EventBus::default();
        let mut reader = LatestObserved::subscribe(&bus);
        let fault = Event::new(
            "test",
            EventPayload::SystemFault {
                component: "lidar_top".into(),
                message: "misrouted".into(),
            },
        );
        bus.publish_to(Topic::CollisionWarnings, fault).unwrap();
        assert!(!reader.observe());
        assert!(reader.latest_observed().is_none());
    }
}
