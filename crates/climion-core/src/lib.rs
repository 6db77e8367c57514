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

pub mod comfort;
pub mod debug;
pub mod decision;
pub mod diagnostics;
pub mod persistence;
pub mod resources;
pub mod running_mean;
pub mod services;
pub mod supervisor;
pub mod systems;
pub mod traits;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;

pub use comfort::{ComfortBand, ComfortError, ComfortInputs, compute_comfort};
pub use debug::DebugModeConfig;
pub use decision::{EvaluationContext, decide, fallback_band};
pub use diagnostics::{DiagnosticsBridge, DiagnosticsReport};
pub use persistence::{ControlStatePersistence, PersistedControlState};
pub use resources::{
    AsyncActionWriter, ClimateDataSourceResource, ClimateDevice, CycleTimer, ForceRecalculate,
    LastCommand, LastRecommendation, PersistenceResource, SnapshotReader,
};
pub use running_mean::OutdoorHistory;
pub use services::{
    ParameterKey, ParameterUpdate, ServiceChannel, ServiceError, ServiceRequest, ServiceSender,
};
pub use supervisor::Supervisor;
pub use systems::ControlSystemsPlugin;
pub use traits::{ClimateDataSource, HistoryDataPoint};

/// Core plugin that registers the control loop and its resources
pub struct ClimionCorePlugin;

impl Plugin for ClimionCorePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<debug::DebugModeConfig>()
            .add_systems(Startup, debug_mode_startup_system)
            .add_plugins(ControlSystemsPlugin);
    }
}

/// Startup system to log debug mode status
fn debug_mode_startup_system(debug_config: Res<DebugModeConfig>) {
    if debug_config.is_enabled() {
        tracing::info!("🔍 DEBUG MODE: Enabled (safe mode - no real changes will be made)");
        tracing::info!("🔍 Set debug_mode: false in config to enable production mode");
    } else {
        DebugModeConfig::warn_production_mode();
    }
}
