//! [`HysteresisTracker`] – consecutive-frame debounce.
//!
//! A single noisy frame must not raise an alarm.  The tracker counts how many
//! *observed* frames in a row were classified as risky and reports a sustained
//! alarm once that run reaches `min_consecutive_frames`.
//!
//! The trigger is asymmetric: entering the alarm takes `min_consecutive_frames`
//! positive frames, leaving it takes a single negative one.
//!
//! Frames that could not be classified at all (e.g. no transform) must not be
//! fed to the tracker; the counter therefore means "consecutive observed
//! positive frames", not elapsed time.
//!
//! # Example
//!
//! ```rust
//! use guardian_kernel::hysteresis::HysteresisTracker;
//!
//! let mut tracker = HysteresisTracker::new(3);
//!
//! assert!(!tracker.update_and_decide(true));
//! assert!(!tracker.update_and_decide(true));
//! assert!(tracker.update_and_decide(true)); // third hit → alarm
//! assert!(!tracker.update_and_decide(false)); // one miss clears it
//! ```

/// Consecutive-hit counter with a fixed entry threshold.
#[derive(Debug, Clone)]
pub struct HysteresisTracker {
    min_consecutive_frames: u32,
    consecutive_hit_counter: u32,
}

impl HysteresisTracker {
    pub fn new(min_consecutive_frames: u32) -> Self {
        Self {
            min_consecutive_frames,
            consecutive_hit_counter: 0,
        }
    }

    /// Fold one frame verdict into the counter and return the sustained
    /// alarm state.
    ///
    /// `true` increments the counter (saturating), `false` resets it to 0.
    pub fn update_and_decide(&mut self, frame_verdict: bool) -> bool {
        if frame_verdict {
            self.consecutive_hit_counter = self.consecutive_hit_counter.saturating_add(1);
        } else {
            self.consecutive_hit_counter = 0;
        }
        self.is_alarmed()
    }

    /// Current alarm state without updating the counter.
    pub fn is_alarmed(&self) -> bool {
        self.consecutive_hit_counter >= self.min_consecutive_frames
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hit_counter
    }

    pub fn threshold(&self) -> u32 {
        self.min_consecutive_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tracker: &mut HysteresisTracker, verdicts: &[bool]) -> Vec<bool> {
        verdicts.iter().map(|v| tracker.update_and_decide(*v)).collect()
    }

    #[test]
    fn debounce_sequence_with_threshold_three() {
        let mut tracker = HysteresisTracker::new(3);
        let alarms = run(&mut tracker, &[true, true, true, false, true, true]);
        assert_eq!(alarms, vec![false, false, true, false, false, false]);
        assert_eq!(tracker.consecutive_hits(), 2);
    }

    #[test]
    fn negative_frame_resets_to_zero() {
        let mut tracker = HysteresisTracker::new(2);
        run(&mut tracker, &[true, true, true, true]);
        assert_eq!(tracker.consecutive_hits(), 4);
        tracker.update_and_decide(false);
        assert_eq!(tracker.consecutive_hits(), 0);
        assert!(!tracker.is_alarmed());
    }

    #[test]
    fn alarm_holds_while_hits_continue() {
        let mut tracker = HysteresisTracker::new(2);
        let alarms = run(&mut tracker, &[true, true, true, true, true]);
        assert_eq!(alarms, vec![false, true, true, true, true]);
    }

    #[test]
    fn threshold_one_follows_raw_verdicts() {
        let mut tracker = HysteresisTracker::new(1);
        let alarms = run(&mut tracker, &[true, false, true]);
        assert_eq!(alarms, vec![true, false, true]);
    }

    #[test]
    fn counter_saturates_instead_of_wrapping() {
        let mut tracker = HysteresisTracker::new(3);
        tracker.consecutive_hit_counter = u32::MAX;
        assert!(tracker.update_and_decide(true));
        assert_eq!(tracker.consecutive_hits(), u32::MAX);
    }

    #[test]
    fn fresh_tracker_is_not_alarmed() {
        let tracker = HysteresisTracker::new(2);
        assert!(!tracker.is_alarmed());
        assert_eq!(tracker.threshold(), 2);
    }
}
