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

//! ECS systems wiring the evaluation pipeline:
//! snapshot → running mean → comfort → decision → gate → device.
//!
//! One evaluation runs per configured interval (or on force-recalculate).
//! The whole cycle is synchronous and sub-millisecond apart from the sensor
//! reads; device writes are fired onto the tokio runtime.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::comfort::{ComfortError, ComfortInputs, compute_comfort};
use crate::debug::DebugModeConfig;
use crate::decision::{EvaluationContext, decide, fallback_band};
use crate::diagnostics::{DiagnosticsBridge, DiagnosticsReport};
use crate::persistence::PersistedControlState;
use crate::resources::{
    AsyncActionWriter, ClimateDevice, CycleTimer, ForceRecalculate, LastCommand,
    LastRecommendation, PersistenceResource, SnapshotReader,
};
use crate::running_mean::{HISTORY_WINDOW_DAYS, OutdoorHistory};
use crate::services::{ServiceChannel, ServiceRequest};
use crate::supervisor::Supervisor;
use climion_types::{ActionRecommendation, DeviceState, HvacMode, SupervisorMode, SystemConfig};

/// Edge-triggered logging flags so degraded states are logged once per
/// transition, not once per cycle
#[derive(Default)]
pub struct EvalFlags {
    input_unavailable_logged: bool,
    out_of_range_logged: bool,
}

/// System for initializing the climate device entity on startup
pub fn initialize_device_system(
    mut commands: Commands,
    config: Res<SystemConfig>,
    query: Query<&ClimateDevice>,
) {
    if !query.is_empty() {
        return;
    }

    info!(
        "Creating entity for climate device: {} ({})",
        config.device.name, config.device.entity_id
    );

    commands.spawn((
        ClimateDevice {
            name: config.device.name.clone(),
            entity_id: config.device.entity_id.clone(),
        },
        DeviceState::default(),
    ));
}

/// System to seed the outdoor history from the recorder on cold start.
/// Without history the running mean degrades to the first live sample.
pub fn seed_outdoor_history_system(
    reader: Res<SnapshotReader>,
    mut history: ResMut<OutdoorHistory>,
) {
    if !history.is_empty() {
        debug!(
            "Outdoor history restored from disk ({} samples), skipping seed",
            history.len()
        );
        return;
    }

    match reader.read_outdoor_history(HISTORY_WINDOW_DAYS) {
        Ok(points) if points.is_empty() => {
            info!("📊 No outdoor history available, running mean starts cold");
        }
        Ok(points) => {
            for point in &points {
                history.record(point.timestamp, point.value);
            }
            info!(
                "📊 Seeded outdoor history with {} samples, running mean {:.1}°C",
                history.len(),
                history.mean().unwrap_or_default()
            );
        }
        Err(e) => {
            warn!("⚠️ Failed to seed outdoor history, starting cold: {e:#}");
        }
    }
}

/// System that drains queued service requests. Requests were validated at
/// the sender side; here they are applied to the running state.
pub fn service_request_system(
    mut channel: ResMut<ServiceChannel>,
    mut config: ResMut<SystemConfig>,
    mut supervisor: ResMut<Supervisor>,
    mut history: ResMut<OutdoorHistory>,
    mut force: ResMut<ForceRecalculate>,
) {
    while let Ok(request) = channel.receiver.try_recv() {
        debug!("Service request: {request:?}");
        match request {
            ServiceRequest::SetManualOverride {
                temp,
                duration_minutes,
            } => {
                supervisor.set_override(temp, duration_minutes, Utc::now());
                force.0 = true;
            }
            ServiceRequest::ClearManualOverride => {
                supervisor.clear_override();
                force.0 = true;
            }
            ServiceRequest::SetComfortCategory(category) => {
                info!("Comfort category set to {category}");
                config.comfort_config.comfort_category = category;
                force.0 = true;
            }
            ServiceRequest::ForceRecalculate => {
                force.0 = true;
            }
            ServiceRequest::SetParameter(update) => {
                info!("Parameter {} updated", update.name());
                update.apply(&mut config.comfort_config);
                force.0 = true;
            }
            ServiceRequest::ResetParameter(key) => {
                key.reset(&mut config.comfort_config);
                force.0 = true;
            }
            ServiceRequest::ResetOutdoorHistory => {
                info!("Outdoor temperature history reset");
                history.clear();
            }
        }
    }
}

/// The evaluation cycle.
pub fn evaluation_cycle_system(
    timer: Res<CycleTimer>,
    mut force: ResMut<ForceRecalculate>,
    reader: Res<SnapshotReader>,
    writer: Res<AsyncActionWriter>,
    config: Res<SystemConfig>,
    debug_mode: Res<DebugModeConfig>,
    mut history: ResMut<OutdoorHistory>,
    mut supervisor: ResMut<Supervisor>,
    mut last_rec: ResMut<LastRecommendation>,
    mut last_command: ResMut<LastCommand>,
    diagnostics: Res<DiagnosticsBridge>,
    persistence: Res<PersistenceResource>,
    mut devices: Query<(&ClimateDevice, &mut DeviceState)>,
    mut flags: Local<EvalFlags>,
) {
    if !timer.should_run() && !force.0 {
        return;
    }
    timer.mark_run();
    force.0 = false;

    let Ok((device, mut device_state)) = devices.single_mut() else {
        debug!("No climate device entity yet");
        return;
    };

    let now = Utc::now();
    let comfort_config = &config.comfort_config;

    // Observe the device first: a manual power-off must be caught before
    // anything is decided, and capability mapping needs a live state
    match reader.read_device_state() {
        Ok(state) => {
            supervisor.observe_device_power(state.is_powered_on(), last_command.commanded_off());
            *device_state = state;
        }
        Err(e) => {
            warn!(
                "⚠️ [{}] Device unavailable, holding last recommendation: {e:#}",
                device.name
            );
            diagnostics.publish(&DiagnosticsReport {
                timestamp: now,
                comfort: None,
                recommendation: last_rec.0.clone(),
                supervisor_mode: supervisor.mode(now, comfort_config),
                manual_override: supervisor.state().manual_override.clone(),
                outdoor_running_mean: history.mean(),
                inputs_available: false,
            });
            return;
        }
    }

    // Sensor snapshot; a missing required reading holds the previous
    // recommendation rather than emitting a new one
    let snapshot = match reader.read_snapshot() {
        Ok(snapshot) => {
            flags.input_unavailable_logged = false;
            snapshot
        }
        Err(e) => {
            if !flags.input_unavailable_logged {
                warn!(
                    "⚠️ [{}] Required sensor unavailable, holding last recommendation: {e:#}",
                    device.name
                );
                flags.input_unavailable_logged = true;
            }
            diagnostics.publish(&DiagnosticsReport {
                timestamp: now,
                comfort: None,
                recommendation: last_rec.0.clone(),
                supervisor_mode: supervisor.mode(now, comfort_config),
                manual_override: supervisor.state().manual_override.clone(),
                outdoor_running_mean: history.mean(),
                inputs_available: false,
            });
            return;
        }
    };

    let running_mean = history.record(snapshot.timestamp, snapshot.outdoor_temp);

    supervisor.observe_occupancy(snapshot.occupancy, now, comfort_config);
    let mode = supervisor.tick(now, comfort_config);

    // Comfort band, degrading to the absolute clamps outside the ASHRAE range
    let inputs = ComfortInputs::from_snapshot(&snapshot, comfort_config, running_mean);
    let (band, low_confidence) = match compute_comfort(&inputs, comfort_config) {
        Ok(band) => {
            flags.out_of_range_logged = false;
            (band, false)
        }
        Err(e @ ComfortError::OutsideApplicableRange { .. }) => {
            if !flags.out_of_range_logged {
                warn!("⚠️ [{}] {e}, falling back to configured clamps", device.name);
                flags.out_of_range_logged = true;
            }
            (fallback_band(comfort_config), true)
        }
        Err(e) => {
            warn!("⚠️ [{}] Comfort model rejected inputs: {e}", device.name);
            return;
        }
    };

    // Widen the band while the space is vacant
    let band = if mode == SupervisorMode::UnoccupiedSetback {
        band.widened(comfort_config.setback_offset)
    } else {
        band
    };

    let context = EvaluationContext {
        snapshot: &snapshot,
        config: comfort_config,
        capabilities: &device_state.capabilities,
        band: &band,
        low_confidence,
        outdoor_running_mean: running_mean,
        prev: last_rec.0.as_ref(),
    };
    let recommendation = decide(&context);
    let gated = supervisor.gate(&recommendation, mode);

    debug!(
        "[{}] band [{:.2}, {:.2}] comfort {:.2}°C, mode {:?}: {} → {}",
        device.name,
        band.band_min,
        band.band_max,
        band.comfort_temp,
        mode,
        recommendation.reason,
        gated.reason
    );

    if gated.suppressed {
        debug!("[{}] Action suppressed: {}", device.name, gated.reason);
    } else if should_execute(&gated, &device_state, comfort_config.temperature_change_threshold) {
        if !last_command.can_send(now, config.system_config.min_command_interval_secs) {
            debug!(
                "[{}] Skipping device write: too soon since last command",
                device.name
            );
        } else if debug_mode.should_execute() {
            info!(
                "📤 [{}] Applying {} @ {:.1}°C, fan {} ({})",
                device.name, gated.hvac_mode, gated.target_temp, gated.fan_speed, gated.reason
            );
            writer.apply_async(gated.clone());
            last_command.record(gated.clone(), now);

            // Optimistic update until the next device read
            device_state.hvac_mode = gated.hvac_mode.to_ha_value().to_string();
            device_state.fan_mode = Some(gated.fan_speed.to_ha_value().to_string());
            device_state.target_temp = Some(gated.target_temp);
        } else {
            debug_mode.log_would_execute(
                &format!(
                    "{} @ {:.1}°C, fan {}",
                    gated.hvac_mode, gated.target_temp, gated.fan_speed
                ),
                &gated.reason,
            );
            last_command.record(gated.clone(), now);
        }
    } else {
        debug!("[{}] Device already in desired state", device.name);
    }

    last_rec.0 = Some(recommendation);

    diagnostics.publish(&DiagnosticsReport {
        timestamp: now,
        comfort: Some(band),
        recommendation: Some(gated),
        supervisor_mode: mode,
        manual_override: supervisor.state().manual_override.clone(),
        outdoor_running_mean: Some(running_mean),
        inputs_available: true,
    });

    let persisted = PersistedControlState {
        outdoor_history: history.clone(),
        supervisor: supervisor.state().clone(),
        last_recommendation: last_rec.0.clone(),
    };
    if let Err(e) = persistence.0.save(&persisted) {
        // Keep running on in-memory state; persistence loss is not fatal
        warn!("⚠️ Failed to persist control state: {e:#}");
    }
}

/// Whether the gated action differs enough from the device's observed state
/// to be worth a write
fn should_execute(action: &ActionRecommendation, device: &DeviceState, threshold: f32) -> bool {
    let mode_differs = !device
        .hvac_mode
        .eq_ignore_ascii_case(action.hvac_mode.to_ha_value());

    let fan_differs = action.hvac_mode != HvacMode::Off
        && device
            .fan_mode
            .as_deref()
            .is_none_or(|fan| !fan.eq_ignore_ascii_case(action.fan_speed.to_ha_value()));

    let temp_differs = action.hvac_mode.is_active()
        && device
            .target_temp
            .is_none_or(|current| (current - action.target_temp).abs() >= threshold);

    mode_differs || fan_differs || temp_differs
}

/// Plugin registering the control loop systems
pub struct ControlSystemsPlugin;

impl Plugin for ControlSystemsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LastRecommendation>()
            .init_resource::<LastCommand>()
            .init_resource::<ForceRecalculate>()
            .init_resource::<DiagnosticsBridge>()
            .add_systems(
                Startup,
                (initialize_device_system, seed_outdoor_history_system).chain(),
            )
            .add_systems(
                Update,
                (service_request_system, evaluation_cycle_system).chain(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climion_types::{FanSpeed, HvacMode};

    fn action(mode: HvacMode, target: f32, fan: FanSpeed) -> ActionRecommendation {
        ActionRecommendation {
            hvac_mode: mode,
            fan_speed: fan,
            target_temp: target,
            suppressed: false,
            low_confidence: false,
            natural_ventilation: false,
            reason: "test".to_string(),
        }
    }

    fn device(hvac: &str, fan: Option<&str>, target: Option<f32>) -> DeviceState {
        DeviceState {
            hvac_mode: hvac.to_string(),
            fan_mode: fan.map(str::to_string),
            target_temp: target,
            ..Default::default()
        }
    }

    #[test]
    fn test_should_execute_on_mode_change() {
        let act = action(HvacMode::Cool, 24.0, FanSpeed::Low);
        let dev = device("off", Some("low"), Some(24.0));
        assert!(should_execute(&act, &dev, 0.5));
    }

    #[test]
    fn test_should_not_execute_when_state_matches() {
        let act = action(HvacMode::Cool, 24.0, FanSpeed::Low);
        let dev = device("cool", Some("low"), Some(24.2));
        assert!(!should_execute(&act, &dev, 0.5));
    }

    #[test]
    fn test_should_execute_on_temp_delta_over_threshold() {
        let act = action(HvacMode::Cool, 24.0, FanSpeed::Low);
        let dev = device("cool", Some("low"), Some(25.0));
        assert!(should_execute(&act, &dev, 0.5));
    }

    #[test]
    fn test_off_to_off_is_a_noop() {
        let act = action(HvacMode::Off, 24.0, FanSpeed::Low);
        let dev = device("off", None, None);
        assert!(!should_execute(&act, &dev, 0.5));
    }

    #[test]
    fn test_fan_change_triggers_execute() {
        let act = action(HvacMode::Cool, 24.0, FanSpeed::High);
        let dev = device("cool", Some("low"), Some(24.0));
        assert!(should_execute(&act, &dev, 0.5));
    }
}
