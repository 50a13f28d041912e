//! Shared handle to the vehicle safety status.
//!
//! The safety monitor is the only writer; everything else reads consistent
//! copies through [`SafetyStatusHandle::snapshot`].  Readers must treat the
//! snapshot as eventually consistent: it reflects the monitor's latest tick.

use std::sync::{Arc, RwLock};

use guardian_types::SafetyStatus;

/// Cheaply clonable reference to one [`SafetyStatus`] record.
#[derive(Debug, Clone, Default)]
pub struct SafetyStatusHandle {
    inner: Arc<RwLock<SafetyStatus>>,
}

impl SafetyStatusHandle {
    /// Create a handle holding a cleared status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> SafetyStatus {
        match self.inner.read() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Apply `f` to the record under the write lock.
    pub(crate) fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SafetyStatus),
    {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut *guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_record() {
        let handle = SafetyStatusHandle::new();
        let reader = handle.clone();
        handle.update(|s| s.require_emergency_stop = true);
        assert!(reader.snapshot().require_emergency_stop);
    }

    #[test]
    fn new_handle_is_clear() {
        assert!(SafetyStatusHandle::new().snapshot().is_clear());
    }
}
