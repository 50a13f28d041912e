//! [`CollisionGuardian`] – the per-frame collision pipeline.
//!
//! Each call to [`CollisionGuardian::process_frame`] runs, synchronously and
//! in order:
//!
//! 1. **Resolve** – ask the [`TransformResolver`] for the sensor → vehicle
//!    transform at the frame's capture time.  On failure the frame is dropped:
//!    nothing is published and the hysteresis counter is left untouched.
//! 2. **Classify** – [`classify_frame_detailed`] decides whether the frame
//!    contains a collision risk.
//! 3. **Debounce** – the [`HysteresisTracker`] folds the verdict into the
//!    consecutive-hit counter.
//! 4. **Publish** – a fresh [`CollisionWarning`] carrying the debounced state
//!    goes to the [`WarningSink`], every frame, alarm or not.
//!
//! The guardian owns its counter and configuration exclusively; run one
//! instance per sensor stream.

use chrono::{DateTime, Utc};
use guardian_kernel::HysteresisTracker;
use guardian_middleware::{TopicReceiver, WarningSink};
use guardian_perception::{classify_frame_detailed, ClassifierConfig, TransformResolver};
use guardian_types::{CollisionWarning, EventPayload, GuardianError, PointCloudFrame};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, instrument, warn};

use crate::config::GuardianConfig;

/// Running counters for one guardian instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardianStats {
    /// Frames that were transformed and classified.
    pub frames_processed: u64,
    /// Frames abandoned because no transform was available.
    pub frames_dropped: u64,
    /// Warnings the sink accepted.
    pub warnings_published: u64,
    /// Warnings the sink rejected (e.g. nobody listening).
    pub warnings_undelivered: u64,
    /// Processed frames whose debounced state was "collision".
    pub alarm_frames: u64,
    /// Frames overwritten on the bus before the loop could receive them.
    pub frames_lagged: u64,
}

/// Classifier + hysteresis tracker + alarm publisher for one sensor stream.
pub struct CollisionGuardian<R, S> {
    vehicle_frame_id: String,
    classifier: ClassifierConfig,
    tracker: HysteresisTracker,
    resolver: R,
    sink: S,
    stats: GuardianStats,
}

impl<R, S> CollisionGuardian<R, S>
where
    R: TransformResolver,
    S: WarningSink,
{
    /// Validate `config` and build a guardian around `resolver` and `sink`.
    pub fn new(config: &GuardianConfig, resolver: R, sink: S) -> Result<Self, GuardianError> {
        config.validate()?;
        info!(?config, "collision guardian configured");
        Ok(Self {
            vehicle_frame_id: config.vehicle_frame_id.clone(),
            classifier: config.classifier_config(),
            tracker: HysteresisTracker::new(config.min_consecutive_frames_to_trigger),
            resolver,
            sink,
            stats: GuardianStats::default(),
        })
    }

    /// Process one frame, stamping the warning with the current time.
    ///
    /// Returns the debounced collision state that was published.
    pub fn process_frame(&mut self, frame: &PointCloudFrame) -> Result<bool, GuardianError> {
        self.process_frame_at(frame, Utc::now())
    }

    /// Process one frame whose handling started at `start_time`.
    #[instrument(skip_all, fields(frame_id = %frame.frame_id, points = frame.points.len()))]
    pub fn process_frame_at(
        &mut self,
        frame: &PointCloudFrame,
        start_time: DateTime<Utc>,
    ) -> Result<bool, GuardianError> {
        let sensor_to_vehicle = match self.resolver.resolve(
            frame.timestamp,
            &self.vehicle_frame_id,
            &frame.frame_id,
        ) {
            Ok(transform) => transform,
            Err(e) => {
                self.stats.frames_dropped += 1;
                error!(
                    error = %e,
                    source_frame = %frame.frame_id,
                    target_frame = %self.vehicle_frame_id,
                    "failed to get sensor transform; dropping frame"
                );
                return Err(e);
            }
        };

        let verdict = classify_frame_detailed(frame, &sensor_to_vehicle, &self.classifier);
        let alarm = self.tracker.update_and_decide(verdict.risk);
        self.stats.frames_processed += 1;

        debug!(
            risk = verdict.risk,
            points_in_roi = verdict.points_in_roi,
            consecutive_hits = self.tracker.consecutive_hits(),
            "frame classified"
        );

        if alarm {
            self.stats.alarm_frames += 1;
            warn!(
                consecutive_hits = self.tracker.consecutive_hits(),
                "persistent collision risk detected; publishing TRUE"
            );
        }

        match self.sink.emit(CollisionWarning::new(start_time, alarm)) {
            Ok(()) => self.stats.warnings_published += 1,
            Err(e) => {
                self.stats.warnings_undelivered += 1;
                debug!(error = %e, "collision warning not delivered");
            }
        }

        Ok(alarm)
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.tracker.consecutive_hits()
    }

    pub fn stats(&self) -> GuardianStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Feed every point-cloud event from `frames` through `guardian`, in arrival
/// order, until the bus closes.
///
/// Per-frame failures are logged by the guardian and never stop the loop.
pub async fn run_frame_loop<R, S>(
    mut frames: TopicReceiver,
    guardian: &mut CollisionGuardian<R, S>,
) -> GuardianStats
where
    R: TransformResolver,
    S: WarningSink,
{
    loop {
        match frames.recv().await {
            Ok(event) => {
                if let EventPayload::PointCloud(frame) = event.payload {
                    let _ = guardian.process_frame(&frame);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                guardian.stats.frames_lagged += skipped;
                warn!(skipped, "frame loop lagged; oldest frames were dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    guardian.stats()
}
