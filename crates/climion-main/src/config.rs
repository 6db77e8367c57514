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

//! Configuration loading and validation for the ClimION binary.
//!
//! Configuration lives in a TOML file (`./config.toml` by default,
//! overridable via `CLIMION_CONFIG`). The HA access token is never stored
//! in the file; it comes from `HA_TOKEN` or the Supervisor environment.

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::info;

use climion_types::SystemConfig;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Load, override and validate the system configuration
pub fn load_config() -> Result<SystemConfig> {
    let path = std::env::var("CLIMION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config_from(Path::new(&path))?;
    info!("📋 Loaded configuration from {}", path);
    Ok(config)
}

/// Load a configuration file and apply environment overrides
pub fn load_config_from(path: &Path) -> Result<SystemConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    if let Ok(url) = std::env::var("HA_BASE_URL")
        && !url.trim().is_empty()
    {
        config.system_config.ha_base_url = Some(url);
    }
    if let Ok(token) = std::env::var("HA_TOKEN")
        && !token.trim().is_empty()
    {
        config.system_config.ha_token = Some(token);
    }

    validate(&config)?;
    Ok(config)
}

/// Reject configurations that cannot work before anything starts
pub fn validate(config: &SystemConfig) -> Result<()> {
    if config.device.entity_id.trim().is_empty() {
        bail!("device.entity_id must not be empty");
    }
    if config.sensor_config.indoor_temp_entity.trim().is_empty()
        || config.sensor_config.outdoor_temp_entity.trim().is_empty()
    {
        bail!("sensors.indoor_temp_entity and sensors.outdoor_temp_entity are required");
    }

    let comfort = &config.comfort_config;
    if comfort.min_comfort_temp >= comfort.max_comfort_temp {
        bail!(
            "comfort.min_comfort_temp ({:.1}) must be below comfort.max_comfort_temp ({:.1})",
            comfort.min_comfort_temp,
            comfort.max_comfort_temp
        );
    }
    if comfort.min_fan_speed > comfort.max_fan_speed {
        bail!(
            "comfort.min_fan_speed ({}) must not exceed comfort.max_fan_speed ({})",
            comfort.min_fan_speed,
            comfort.max_fan_speed
        );
    }
    if comfort.auto_shutdown_minutes > 0
        && comfort.auto_shutdown_minutes <= comfort.setback_delay_minutes
    {
        bail!(
            "comfort.auto_shutdown_minutes ({}) must exceed comfort.setback_delay_minutes ({})",
            comfort.auto_shutdown_minutes,
            comfort.setback_delay_minutes
        );
    }
    if config.system_config.update_interval_secs == 0 {
        bail!("system.update_interval_secs must be at least 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use climion_types::{ComfortCategory, FanSpeed};

    const MINIMAL: &str = r#"
        [device]
        name = "Living Room"
        entity_id = "climate.living_room_ac"

        [sensors]
        indoor_temp_entity = "sensor.living_room_temperature"
        outdoor_temp_entity = "sensor.outdoor_temperature"

        [comfort]

        [system]
    "#;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config: SystemConfig = toml::from_str(MINIMAL).unwrap();
        validate(&config).unwrap();

        assert_eq!(config.device.entity_id, "climate.living_room_ac");
        assert_eq!(config.comfort_config.comfort_category, ComfortCategory::II);
        assert_eq!(config.comfort_config.temperature_change_threshold, 0.5);
        assert_eq!(config.system_config.update_interval_secs, 60);
    }

    #[test]
    fn test_full_config_parses() {
        let config: SystemConfig = toml::from_str(
            r#"
            [device]
            name = "Bedroom"
            entity_id = "climate.bedroom_ac"

            [sensors]
            indoor_temp_entity = "sensor.bedroom_temperature"
            outdoor_temp_entity = "sensor.outdoor_temperature"
            indoor_humidity_entity = "sensor.bedroom_humidity"
            occupancy_entity = "binary_sensor.bedroom_presence"

            [comfort]
            comfort_category = "III"
            min_comfort_temp = 19.0
            max_comfort_temp = 27.0
            min_fan_speed = "low"
            max_fan_speed = "highest"
            energy_save_mode = false
            auto_shutdown_minutes = 180

            [system]
            update_interval_secs = 30
            debug_mode = true
            "#,
        )
        .unwrap();
        validate(&config).unwrap();

        assert_eq!(config.comfort_config.comfort_category, ComfortCategory::III);
        assert_eq!(config.comfort_config.max_fan_speed, FanSpeed::Highest);
        assert!(!config.comfort_config.energy_save_mode);
        assert!(config.system_config.debug_mode);
    }

    #[test]
    fn test_inverted_comfort_clamps_rejected() {
        let mut config: SystemConfig = toml::from_str(MINIMAL).unwrap();
        config.comfort_config.min_comfort_temp = 28.0;
        config.comfort_config.max_comfort_temp = 18.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_inverted_fan_range_rejected() {
        let mut config: SystemConfig = toml::from_str(MINIMAL).unwrap();
        config.comfort_config.min_fan_speed = FanSpeed::Highest;
        config.comfort_config.max_fan_speed = FanSpeed::Low;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_shutdown_must_exceed_setback_delay() {
        let mut config: SystemConfig = toml::from_str(MINIMAL).unwrap();
        config.comfort_config.setback_delay_minutes = 60;
        config.comfort_config.auto_shutdown_minutes = 30;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_entity_rejected() {
        let mut config: SystemConfig = toml::from_str(MINIMAL).unwrap();
        config.device.entity_id = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.device.name, "Living Room");
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config_from(Path::new("/nonexistent/config.toml")).is_err());
    }
}
