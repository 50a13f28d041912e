//! The outbound seam of the collision pipeline.
//!
//! The guardian never talks to a transport directly.  It hands each
//! [`CollisionWarning`] to a [`WarningSink`]; the sink decides where it goes.
//! [`EventBus`][crate::bus::EventBus] is the production sink: it publishes on
//! [`Topic::CollisionWarnings`][crate::bus::Topic::CollisionWarnings].

use guardian_types::{CollisionWarning, GuardianError};

/// Fire-and-forget destination for collision warnings.
///
/// # Contract
///
/// `emit` must not block.  An `Err` means this one warning was not
/// delivered; callers do not retry because the next frame publishes fresh
/// state anyway.
pub trait WarningSink: Send + Sync {
    fn emit(&self, warning: CollisionWarning) -> Result<(), GuardianError>;
}

impl<S: WarningSink + ?Sized> WarningSink for std::sync::Arc<S> {
    fn emit(&self, warning: CollisionWarning) -> Result<(), GuardianError> {
        (**self).emit(warning)
    }
}
