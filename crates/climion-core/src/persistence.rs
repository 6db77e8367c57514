// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of ClimION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Persistence layer for control state.
//!
//! Restart must not lose the outdoor history, an in-flight override or a
//! shutdown window. Storage is a single JSON file written atomically
//! (temp file + rename).

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::running_mean::OutdoorHistory;
use climion_types::{ActionRecommendation, SupervisorState};

/// Default path for the control state file.
/// Uses relative path for portability (works in both dev and HA addon).
pub const DEFAULT_STATE_PATH: &str = "./data/control_state.json";

/// Everything that must survive a restart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedControlState {
    #[serde(default)]
    pub outdoor_history: OutdoorHistory,

    #[serde(default)]
    pub supervisor: SupervisorState,

    /// Last emitted recommendation, kept for hysteresis across restarts
    #[serde(default)]
    pub last_recommendation: Option<ActionRecommendation>,
}

/// Control state persistence manager.
#[derive(Debug, Clone)]
pub struct ControlStatePersistence {
    state_path: PathBuf,
}

impl ControlStatePersistence {
    /// Create a new persistence manager with the given path.
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// Create a persistence manager using the default production path.
    pub fn default_production() -> Self {
        Self::new(DEFAULT_STATE_PATH)
    }

    /// Get the path being used for persistence.
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    /// Load control state from disk.
    ///
    /// Returns the default state (cold start) if the file doesn't exist.
    /// Expired overrides are dropped on load.
    pub fn load(&self) -> Result<PersistedControlState> {
        if !self.state_path.exists() {
            info!(
                "Control state file not found at {}, cold start",
                self.state_path.display()
            );
            return Ok(PersistedControlState::default());
        }

        let contents = fs::read_to_string(&self.state_path).with_context(|| {
            format!(
                "Failed to read control state from {}",
                self.state_path.display()
            )
        })?;

        let mut state: PersistedControlState =
            serde_json::from_str(&contents).with_context(|| {
                format!(
                    "Failed to parse control state from {}",
                    self.state_path.display()
                )
            })?;

        if state.supervisor.cleanup_expired_override(Utc::now()) {
            info!("Dropped expired manual override on load");
        }

        info!(
            "Loaded control state: {} outdoor samples, override={}, user_powered_off={}",
            state.outdoor_history.len(),
            state.supervisor.manual_override.is_some(),
            state.supervisor.user_powered_off
        );

        Ok(state)
    }

    /// Save control state to disk.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption.
    pub fn save(&self, state: &PersistedControlState) -> Result<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(state).context("Failed to serialize control state")?;

        let temp_path = self.state_path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.state_path).with_context(|| {
            format!(
                "Failed to rename temp file to {}",
                self.state_path.display()
            )
        })?;

        Ok(())
    }

    /// Check if a state file exists.
    pub fn exists(&self) -> bool {
        self.state_path.exists()
    }
}

impl Default for ControlStatePersistence {
    fn default() -> Self {
        Self::default_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use climion_types::OverrideState;
    use tempfile::tempdir;

    #[test]
    fn test_load_nonexistent_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");
        let persistence = ControlStatePersistence::new(path);

        let state = persistence.load().unwrap();
        assert!(state.outdoor_history.is_empty());
        assert!(state.supervisor.manual_override.is_none());
        assert!(!state.supervisor.user_powered_off);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control_state.json");
        let persistence = ControlStatePersistence::new(path);

        let mut state = PersistedControlState::default();
        state.outdoor_history.record(Utc::now(), 21.5);
        state.supervisor.manual_override = Some(OverrideState::new(
            22.0,
            Some(Utc::now() + Duration::hours(1)),
        ));
        state.supervisor.user_powered_off = true;

        persistence.save(&state).unwrap();
        let loaded = persistence.load().unwrap();

        assert_eq!(loaded.outdoor_history.len(), 1);
        assert_eq!(
            loaded.supervisor.manual_override.as_ref().unwrap().target_temp,
            22.0
        );
        assert!(loaded.supervisor.user_powered_off);
    }

    #[test]
    fn test_expired_override_cleaned_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control_state.json");
        let persistence = ControlStatePersistence::new(&path);

        let mut state = PersistedControlState::default();
        state.supervisor.manual_override = Some(OverrideState::new(
            22.0,
            Some(Utc::now() - Duration::hours(1)),
        ));

        // Write directly without cleaning
        let json = serde_json::to_string_pretty(&state).unwrap();
        fs::write(&path, &json).unwrap();

        let loaded = persistence.load().unwrap();
        assert!(loaded.supervisor.manual_override.is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("control_state.json");
        fs::write(&path, "not json").unwrap();

        let persistence = ControlStatePersistence::new(&path);
        assert!(persistence.load().is_err());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/dir/control_state.json");
        let persistence = ControlStatePersistence::new(&path);

        persistence.save(&PersistedControlState::default()).unwrap();
        assert!(persistence.exists());
    }
}
