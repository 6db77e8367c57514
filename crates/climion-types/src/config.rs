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

use crate::climate::{ComfortCategory, FanSpeed, HvacMode};

// ============= System Configuration =============

/// Central configuration resource for the ClimION system
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub device: ClimateDeviceConfig,
    #[serde(rename = "sensors")]
    pub sensor_config: SensorConfig,
    #[serde(rename = "comfort")]
    pub comfort_config: ComfortConfig,
    #[serde(rename = "system")]
    pub system_config: SystemSettingsConfig,
}

/// Configuration for the wrapped climate device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateDeviceConfig {
    /// Friendly name used in logs and diagnostics
    pub name: String,

    /// Home Assistant climate entity to control (e.g. "climate.living_room_ac")
    pub entity_id: String,
}

/// Sensor entity configuration.
/// Indoor and outdoor temperature are required; everything else is optional
/// and absent readings are reported as such, never silently defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub indoor_temp_entity: String,
    pub outdoor_temp_entity: String,
    #[serde(default)]
    pub indoor_humidity_entity: Option<String>,
    #[serde(default)]
    pub outdoor_humidity_entity: Option<String>,
    #[serde(default)]
    pub mean_radiant_temp_entity: Option<String>,
    #[serde(default)]
    pub air_velocity_entity: Option<String>,
    #[serde(default)]
    pub occupancy_entity: Option<String>,
}

/// Comfort model and decision engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComfortConfig {
    /// ASHRAE 55 comfort category (I/II/III)
    #[serde(default)]
    pub comfort_category: ComfortCategory,

    /// Absolute floor for the comfort band (°C)
    #[serde(default = "default_min_comfort_temp")]
    pub min_comfort_temp: f32,

    /// Absolute ceiling for the comfort band (°C)
    #[serde(default = "default_max_comfort_temp")]
    pub max_comfort_temp: f32,

    /// Minimum setpoint delta before a new action is emitted (°C).
    /// Prevents short-cycling.
    #[serde(default = "default_temperature_change_threshold")]
    pub temperature_change_threshold: f32,

    // ============= Enabled HVAC Modes =============
    #[serde(default = "default_true")]
    pub enable_cool_mode: bool,
    #[serde(default = "default_true")]
    pub enable_heat_mode: bool,
    #[serde(default = "default_true")]
    pub enable_fan_mode: bool,
    #[serde(default = "default_true")]
    pub enable_dry_mode: bool,
    #[serde(default = "default_true")]
    pub enable_off_mode: bool,

    // ============= Fan Control =============
    /// Slowest fan speed the engine may select
    #[serde(default)]
    pub min_fan_speed: FanSpeed,

    /// Fastest fan speed the engine may select
    #[serde(default = "default_max_fan_speed")]
    pub max_fan_speed: FanSpeed,

    /// Band deviation (°C) that maps to the top of the fan ladder
    #[serde(default = "default_fan_full_scale")]
    pub fan_deviation_full_scale: f32,

    /// Fallback air velocity (m/s) when no air velocity sensor is configured
    #[serde(default = "default_air_velocity")]
    pub air_velocity: f32,

    // ============= Energy Saving =============
    /// Suppress cooling when the space is already below the comfort
    /// temperature in summer-like conditions
    #[serde(default = "default_true")]
    pub energy_save_mode: bool,

    /// Outdoor running mean (°C) at or above which conditions count as
    /// summer-like for energy-save decisions
    #[serde(default = "default_summer_running_mean")]
    pub energy_save_summer_threshold: f32,

    // ============= Natural Ventilation =============
    #[serde(default = "default_true")]
    pub natural_ventilation_enable: bool,

    /// Maximum indoor/outdoor delta (°C) for the ventilation hint
    #[serde(default = "default_natural_ventilation_threshold")]
    pub natural_ventilation_threshold: f32,

    // ============= Occupancy =============
    /// Minutes of vacancy before the comfort band is widened
    #[serde(default = "default_setback_delay_minutes")]
    pub setback_delay_minutes: u32,

    /// Band widening applied while unoccupied (°C)
    #[serde(default = "default_setback_offset")]
    pub setback_offset: f32,

    /// Minutes of vacancy before HVAC is forced off entirely.
    /// 0 disables auto-shutdown.
    #[serde(default = "default_auto_shutdown_minutes")]
    pub auto_shutdown_minutes: u32,

    /// Minutes to wait after occupancy returns before resuming control
    #[serde(default)]
    pub auto_start_delay_minutes: u32,

    // ============= Overrides =============
    /// Default manual override duration (minutes) when the caller does not
    /// supply one. 0 means indefinite.
    #[serde(default = "default_override_duration_minutes")]
    pub override_default_duration_minutes: u32,

    // ============= Comfort Refinements =============
    /// Use operative temperature ((air + radiant) / 2) when a radiant
    /// sensor is available
    #[serde(default)]
    pub use_operative_temperature: bool,

    /// Apply the indoor-humidity comfort correction
    #[serde(default = "default_true")]
    pub humidity_comfort_enable: bool,
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_min_comfort_temp() -> f32 {
    18.0
}
fn default_max_comfort_temp() -> f32 {
    28.0
}
fn default_temperature_change_threshold() -> f32 {
    0.5
}
fn default_max_fan_speed() -> FanSpeed {
    FanSpeed::High
}
fn default_fan_full_scale() -> f32 {
    3.0
}
fn default_air_velocity() -> f32 {
    0.1
}
fn default_summer_running_mean() -> f32 {
    20.0
}
fn default_natural_ventilation_threshold() -> f32 {
    2.0
}
fn default_setback_delay_minutes() -> u32 {
    30
}
fn default_setback_offset() -> f32 {
    2.0
}
fn default_auto_shutdown_minutes() -> u32 {
    120
}
fn default_override_duration_minutes() -> u32 {
    60
}

impl Default for ComfortConfig {
    fn default() -> Self {
        Self {
            comfort_category: ComfortCategory::II,
            min_comfort_temp: 18.0,
            max_comfort_temp: 28.0,
            temperature_change_threshold: 0.5,
            enable_cool_mode: true,
            enable_heat_mode: true,
            enable_fan_mode: true,
            enable_dry_mode: true,
            enable_off_mode: true,
            min_fan_speed: FanSpeed::Low,
            max_fan_speed: FanSpeed::High,
            fan_deviation_full_scale: 3.0,
            air_velocity: 0.1,
            energy_save_mode: true,
            energy_save_summer_threshold: 20.0,
            natural_ventilation_enable: true,
            natural_ventilation_threshold: 2.0,
            setback_delay_minutes: 30,
            setback_offset: 2.0,
            auto_shutdown_minutes: 120,
            auto_start_delay_minutes: 0,
            override_default_duration_minutes: 60,
            use_operative_temperature: false,
            humidity_comfort_enable: true,
        }
    }
}

impl ComfortConfig {
    /// Whether the engine is allowed to select the given mode.
    /// Off is always allowed as the terminal fallback.
    pub fn mode_enabled(&self, mode: HvacMode) -> bool {
        match mode {
            HvacMode::Cool => self.enable_cool_mode,
            HvacMode::Heat => self.enable_heat_mode,
            HvacMode::FanOnly => self.enable_fan_mode,
            HvacMode::Dry => self.enable_dry_mode,
            HvacMode::Off => true,
        }
    }
}

/// System settings configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettingsConfig {
    /// Seconds between evaluation cycles
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Minimum seconds between device writes
    #[serde(default = "default_min_command_interval")]
    pub min_command_interval_secs: u64,

    /// Safe mode: log intended actions without commanding the device
    #[serde(default)]
    pub debug_mode: bool,

    /// Path for persisted control state
    #[serde(default = "default_state_path")]
    pub state_path: String,

    /// Home Assistant base URL (dev setups; the Supervisor API wins when present)
    #[serde(default)]
    pub ha_base_url: Option<String>,

    /// Long-lived access token (set via env var at runtime, not stored in config file)
    #[serde(skip)]
    pub ha_token: Option<String>,
}

fn default_update_interval() -> u64 {
    60
}
fn default_min_command_interval() -> u64 {
    120
}
fn default_state_path() -> String {
    "./data/control_state.json".to_string()
}

impl Default for SystemSettingsConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 60,
            min_command_interval_secs: 120,
            debug_mode: false,
            state_path: default_state_path(),
            ha_base_url: None,
            ha_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comfort_config_defaults() {
        let config = ComfortConfig::default();
        assert_eq!(config.comfort_category, ComfortCategory::II);
        assert_eq!(config.temperature_change_threshold, 0.5);
        assert_eq!(config.min_comfort_temp, 18.0);
        assert_eq!(config.max_comfort_temp, 28.0);
        assert!(config.energy_save_mode);
        assert_eq!(config.max_fan_speed, FanSpeed::High);
    }

    #[test]
    fn test_mode_enabled_respects_flags() {
        let config = ComfortConfig {
            enable_cool_mode: false,
            enable_dry_mode: false,
            ..Default::default()
        };
        assert!(!config.mode_enabled(HvacMode::Cool));
        assert!(!config.mode_enabled(HvacMode::Dry));
        assert!(config.mode_enabled(HvacMode::Heat));
        // Off is the terminal fallback and can never be disabled away
        assert!(config.mode_enabled(HvacMode::Off));
    }

    #[test]
    fn test_comfort_config_serde_defaults() {
        let config: ComfortConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.temperature_change_threshold, 0.5);
        assert_eq!(config.setback_offset, 2.0);
        assert_eq!(config.auto_shutdown_minutes, 120);
        assert!(config.enable_heat_mode);
    }
}
