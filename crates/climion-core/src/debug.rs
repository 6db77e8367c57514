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

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Debug mode configuration resource.
///
/// When debug mode is enabled (default: ON), intended climate commands are
/// logged instead of executed and the wrapped device is never touched. This
/// allows safe testing against a real Home Assistant instance.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct DebugModeConfig {
    pub enabled: bool,
}

impl Default for DebugModeConfig {
    fn default() -> Self {
        // Safe default - debug mode ON
        Self { enabled: true }
    }
}

impl DebugModeConfig {
    /// Create with debug mode enabled
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// Create with debug mode disabled (production mode)
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Check if a command should be executed or just logged
    pub fn should_execute(&self) -> bool {
        !self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Log a command that would be executed in production mode
    pub fn log_would_execute(&self, action: &str, reason: &str) {
        if self.enabled {
            info!("🔍 DEBUG MODE: Would execute '{}' ({})", action, reason);
        }
    }

    /// Warn when debug mode is disabled (production mode)
    pub fn warn_production_mode() {
        warn!("⚠️  DEBUG MODE DISABLED - System will make REAL changes to the climate device!");
        warn!("⚠️  Ensure configuration is correct before proceeding.");
    }
}
