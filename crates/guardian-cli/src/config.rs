//! Configuration loading – reads `~/.guardian/config.toml`.

use guardian_runtime::GuardianConfig;
use guardian_types::GuardianError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Return the path to `~/.guardian/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".guardian").join("config.toml")
}

/// Load, override and validate the config at `path`.
///
/// Returns `Ok(None)` when the file does not exist.  Any other failure is a
/// configuration error.
pub fn load_from(path: &Path) -> Result<Option<GuardianConfig>, GuardianError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| GuardianError::Io(format!("failed to read config at {}: {e}", path.display())))?;
    let mut cfg: GuardianConfig = toml::from_str(&raw)
        .map_err(|e| GuardianError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `GUARDIAN_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `GUARDIAN_VEHICLE_FRAME` | `vehicle_frame_id` |
/// | `GUARDIAN_MONITOR_INTERVAL_MS` | `monitor_interval_ms` |
/// | `GUARDIAN_MIN_POINTS` | `min_points_in_roi_to_trigger` |
/// | `GUARDIAN_MIN_FRAMES` | `min_consecutive_frames_to_trigger` |
pub fn apply_env_overrides(cfg: &mut GuardianConfig) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut GuardianConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("GUARDIAN_VEHICLE_FRAME") {
        cfg.vehicle_frame_id = v;
    }
    if let Some(ms) = parsed(&lookup, "GUARDIAN_MONITOR_INTERVAL_MS") {
        cfg.monitor_interval_ms = ms;
    }
    if let Some(n) = parsed(&lookup, "GUARDIAN_MIN_POINTS") {
        cfg.min_points_in_roi_to_trigger = n;
    }
    if let Some(n) = parsed(&lookup, "GUARDIAN_MIN_FRAMES") {
        cfg.min_consecutive_frames_to_trigger = n;
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}
