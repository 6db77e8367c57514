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

//! Home Assistant adapter implementing `ClimateDataSource`.
//!
//! Maps the engine's abstract mode/fan-speed vocabulary onto whatever the
//! wrapped climate entity actually advertises, then issues the `climate.*`
//! service calls.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::HomeAssistantClient;
use climion_core::{ClimateDataSource, HistoryDataPoint};
use climion_types::{
    ActionRecommendation, DeviceCapabilities, DeviceState, FanSpeed, HvacMode, SensorSnapshot,
    config::{ClimateDeviceConfig, SensorConfig},
};

/// Fallback chains used when the device does not advertise the exact mode
const COOL_FALLBACKS: &[&str] = &["cool", "dry", "fan_only", "auto"];
const HEAT_FALLBACKS: &[&str] = &["heat", "auto"];
const DRY_FALLBACKS: &[&str] = &["dry", "cool", "fan_only"];
const FAN_FALLBACKS: &[&str] = &["fan_only", "fan"];

/// Map a generic HVAC mode onto the device's advertised mode strings.
/// Returns `None` when nothing in the fallback chain is supported.
pub fn map_hvac_mode(mode: HvacMode, supported: &[String]) -> Option<String> {
    let candidates: &[&str] = match mode {
        HvacMode::Cool => COOL_FALLBACKS,
        HvacMode::Heat => HEAT_FALLBACKS,
        HvacMode::Dry => DRY_FALLBACKS,
        HvacMode::FanOnly => FAN_FALLBACKS,
        HvacMode::Off => &["off"],
    };
    candidates.iter().find_map(|candidate| {
        supported
            .iter()
            .find(|s| s.eq_ignore_ascii_case(candidate))
            .cloned()
    })
}

/// Known fan mode spellings, slowest first. Used to pick the nearest
/// supported speed when the exact one is missing.
const FAN_LADDER_ALIASES: &[(&str, usize)] = &[
    ("quiet", 0),
    ("low", 0),
    ("min", 0),
    ("mid", 1),
    ("medium", 1),
    ("middle", 1),
    ("high", 2),
    ("highest", 3),
    ("max", 3),
    ("turbo", 3),
];

fn fan_rank(mode: &str) -> Option<usize> {
    FAN_LADDER_ALIASES
        .iter()
        .find(|(alias, _)| mode.eq_ignore_ascii_case(alias))
        .map(|(_, rank)| *rank)
}

/// Map a generic fan speed onto the device's advertised fan mode strings:
/// exact spelling first, then the supported mode closest on the ladder,
/// then "auto" if nothing ranked is available.
pub fn map_fan_speed(speed: FanSpeed, supported: &[String]) -> Option<String> {
    if supported.is_empty() {
        return None;
    }
    if let Some(exact) = supported
        .iter()
        .find(|s| s.eq_ignore_ascii_case(speed.to_ha_value()))
    {
        return Some(exact.clone());
    }

    let target = speed.index();
    supported
        .iter()
        .filter_map(|s| fan_rank(s).map(|rank| (s, rank)))
        .min_by_key(|(_, rank)| rank.abs_diff(target))
        .map(|(s, _)| s.clone())
        .or_else(|| {
            supported
                .iter()
                .find(|s| s.eq_ignore_ascii_case("auto"))
                .cloned()
        })
}

/// Home Assistant adapter implementing `ClimateDataSource`
pub struct HaClimateAdapter {
    client: Arc<HomeAssistantClient>,
    device: ClimateDeviceConfig,
    sensors: SensorConfig,
}

impl std::fmt::Debug for HaClimateAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaClimateAdapter")
            .field("entity_id", &self.device.entity_id)
            .finish_non_exhaustive()
    }
}

impl HaClimateAdapter {
    pub fn new(
        client: Arc<HomeAssistantClient>,
        device: ClimateDeviceConfig,
        sensors: SensorConfig,
    ) -> Self {
        Self {
            client,
            device,
            sensors,
        }
    }

    pub fn client(&self) -> &Arc<HomeAssistantClient> {
        &self.client
    }

    /// Read a required numeric sensor; unavailable or non-numeric is an error
    async fn read_required_f32(&self, entity_id: &str) -> Result<f32> {
        let state = self
            .client
            .get_state(entity_id)
            .await
            .with_context(|| format!("Failed to read required sensor {entity_id}"))?;
        if !state.is_available() {
            anyhow::bail!("Required sensor {entity_id} is {}", state.state);
        }
        Ok(state.state_as_f32()?)
    }

    /// Read an optional numeric sensor; any failure becomes `None`
    async fn read_optional_f32(&self, entity_id: Option<&String>) -> Option<f32> {
        let entity_id = entity_id?;
        match self.client.get_state(entity_id).await {
            Ok(state) if state.is_available() => state.state_as_f32().ok(),
            Ok(state) => {
                debug!("Optional sensor {} is {}", entity_id, state.state);
                None
            }
            Err(e) => {
                debug!("Optional sensor {} unreadable: {}", entity_id, e);
                None
            }
        }
    }

    /// Read the occupancy sensor ("on" means occupied); absent sensor or
    /// failed read reports as absent, never as a default
    async fn read_occupancy(&self) -> Option<bool> {
        let entity_id = self.sensors.occupancy_entity.as_ref()?;
        match self.client.get_state(entity_id).await {
            Ok(state) if state.is_available() => Some(state.state.eq_ignore_ascii_case("on")),
            _ => None,
        }
    }
}

#[async_trait]
impl ClimateDataSource for HaClimateAdapter {
    async fn read_snapshot(&self) -> Result<SensorSnapshot> {
        let indoor_temp = self
            .read_required_f32(&self.sensors.indoor_temp_entity)
            .await?;
        let outdoor_temp = self
            .read_required_f32(&self.sensors.outdoor_temp_entity)
            .await?;

        let snapshot = SensorSnapshot {
            indoor_temp,
            outdoor_temp,
            indoor_humidity: self
                .read_optional_f32(self.sensors.indoor_humidity_entity.as_ref())
                .await,
            outdoor_humidity: self
                .read_optional_f32(self.sensors.outdoor_humidity_entity.as_ref())
                .await,
            mean_radiant_temp: self
                .read_optional_f32(self.sensors.mean_radiant_temp_entity.as_ref())
                .await,
            air_velocity: self
                .read_optional_f32(self.sensors.air_velocity_entity.as_ref())
                .await,
            occupancy: self.read_occupancy().await,
            timestamp: Utc::now(),
        };

        debug!(
            "📡 [{}] Snapshot: indoor {:.1}°C, outdoor {:.1}°C, occupancy {:?}",
            self.device.name, snapshot.indoor_temp, snapshot.outdoor_temp, snapshot.occupancy
        );
        Ok(snapshot)
    }

    async fn read_device_state(&self) -> Result<DeviceState> {
        let state = self
            .client
            .get_state(&self.device.entity_id)
            .await
            .with_context(|| format!("Failed to read climate entity {}", self.device.entity_id))?;
        if !state.is_available() {
            anyhow::bail!("Climate entity {} is {}", self.device.entity_id, state.state);
        }

        let hvac_modes = state.attribute_str_list("hvac_modes");
        let fan_modes = state.attribute_str_list("fan_modes");
        let capabilities = DeviceCapabilities::from_advertised(&hvac_modes, &fan_modes);

        Ok(DeviceState {
            hvac_mode: state.state.clone(),
            fan_mode: state.attribute_str("fan_mode").map(str::to_string),
            target_temp: state.attribute_f32("temperature"),
            capabilities,
            last_updated: Some(Utc::now()),
        })
    }

    async fn read_outdoor_history(&self, days: i64) -> Result<Vec<HistoryDataPoint>> {
        let start = Utc::now() - Duration::days(days);
        Ok(self
            .client
            .get_history(&self.sensors.outdoor_temp_entity, start, None)
            .await?)
    }

    async fn apply_action(&self, action: &ActionRecommendation) -> Result<()> {
        let device_state = self.read_device_state().await?;
        let capabilities = &device_state.capabilities;

        let Some(mapped_mode) = map_hvac_mode(action.hvac_mode, &capabilities.hvac_modes) else {
            warn!(
                "[{}] Device advertises no usable mode for {:?}, skipping action",
                self.device.name, action.hvac_mode
            );
            return Ok(());
        };

        // Setpoint first so the device does not chase a stale target.
        // Fan-only and off carry no meaningful setpoint.
        if action.hvac_mode.is_active() {
            self.client
                .call_service(
                    "climate.set_temperature",
                    serde_json::json!({
                        "entity_id": self.device.entity_id,
                        "temperature": action.target_temp,
                    }),
                )
                .await
                .with_context(|| format!("Failed to set temperature on {}", self.device.entity_id))?;
        }

        // The fan matters for every running mode, including fan_only
        if action.hvac_mode != HvacMode::Off
            && let Some(mapped_fan) = map_fan_speed(action.fan_speed, &capabilities.fan_modes)
            && device_state.fan_mode.as_deref() != Some(mapped_fan.as_str())
        {
            self.client
                .call_service(
                    "climate.set_fan_mode",
                    serde_json::json!({
                        "entity_id": self.device.entity_id,
                        "fan_mode": mapped_fan,
                    }),
                )
                .await
                .with_context(|| format!("Failed to set fan mode on {}", self.device.entity_id))?;
        }

        if !device_state.hvac_mode.eq_ignore_ascii_case(&mapped_mode) {
            self.client
                .call_service(
                    "climate.set_hvac_mode",
                    serde_json::json!({
                        "entity_id": self.device.entity_id,
                        "hvac_mode": mapped_mode,
                    }),
                )
                .await
                .with_context(|| format!("Failed to set HVAC mode on {}", self.device.entity_id))?;
        }

        info!(
            "✅ [{}] Action applied: {} @ {:.1}°C ({})",
            self.device.name, action.hvac_mode, action.target_temp, action.reason
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.ping().await?)
    }

    fn name(&self) -> &str {
        "home_assistant"
    }
}
