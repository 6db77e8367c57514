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

use anyhow::Result;
use bevy_ecs::prelude::Component;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= HVAC Mode =============

/// Generic HVAC operation modes (vendor-agnostic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    /// Active cooling
    Cool,
    /// Active heating
    Heat,
    /// Air circulation only, no conditioning
    FanOnly,
    /// Dehumidification
    Dry,
    /// Device idle
    #[default]
    Off,
}

impl HvacMode {
    /// Get the Home Assistant climate-domain string for this mode
    pub fn to_ha_value(&self) -> &'static str {
        match self {
            Self::Cool => "cool",
            Self::Heat => "heat",
            Self::FanOnly => "fan_only",
            Self::Dry => "dry",
            Self::Off => "off",
        }
    }

    /// List all supported modes
    pub fn all() -> &'static [HvacMode] {
        &[Self::Cool, Self::Heat, Self::FanOnly, Self::Dry, Self::Off]
    }

    /// Whether this mode actively conditions the space
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Cool | Self::Heat | Self::Dry)
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ha_value())
    }
}

impl FromStr for HvacMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cool" => Ok(Self::Cool),
            "heat" => Ok(Self::Heat),
            "fan_only" | "fan" => Ok(Self::FanOnly),
            "dry" => Ok(Self::Dry),
            "off" => Ok(Self::Off),
            _ => Err(anyhow::anyhow!(
                "Unknown HVAC mode: '{}'. Supported modes: {}",
                s,
                Self::all()
                    .iter()
                    .map(|m| m.to_ha_value())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

// ============= Fan Speed =============

/// Fan speed ladder, ordered from slowest to fastest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum FanSpeed {
    #[default]
    Low,
    Mid,
    High,
    Highest,
}

impl FanSpeed {
    /// Ordered ladder used for scaling and clamping
    pub const LADDER: [FanSpeed; 4] = [Self::Low, Self::Mid, Self::High, Self::Highest];

    /// Position of this speed on the ladder
    pub fn index(&self) -> usize {
        match self {
            Self::Low => 0,
            Self::Mid => 1,
            Self::High => 2,
            Self::Highest => 3,
        }
    }

    /// Speed at a ladder position, clamped to the ladder ends
    pub fn from_index(index: usize) -> Self {
        Self::LADDER[index.min(Self::LADDER.len() - 1)]
    }

    /// Clamp this speed into the configured [min, max] range
    pub fn clamp_to(&self, min: FanSpeed, max: FanSpeed) -> FanSpeed {
        Self::from_index(self.index().clamp(min.index(), max.index()))
    }

    /// Get the Home Assistant fan-mode string for this speed
    pub fn to_ha_value(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
            Self::Highest => "highest",
        }
    }
}

impl fmt::Display for FanSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ha_value())
    }
}

impl FromStr for FanSpeed {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" | "min" => Ok(Self::Low),
            "mid" | "medium" => Ok(Self::Mid),
            "high" => Ok(Self::High),
            "highest" | "max" => Ok(Self::Highest),
            _ => Err(anyhow::anyhow!(
                "Unknown fan speed: '{}'. Supported speeds: low, mid, high, highest",
                s
            )),
        }
    }
}

// ============= Comfort Category =============

/// ASHRAE 55 comfort category: tolerance band width trading occupant
/// satisfaction against energy usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ComfortCategory {
    /// ±2.5°C (90% satisfaction)
    I,
    /// ±3.5°C (80% satisfaction)
    #[default]
    II,
    /// ±4.5°C (relaxed)
    III,
}

impl ComfortCategory {
    /// Acceptable band half-width for this category (°C)
    pub fn half_width(&self) -> f32 {
        match self {
            Self::I => 2.5,
            Self::II => 3.5,
            Self::III => 4.5,
        }
    }

    /// List all categories
    pub fn all() -> &'static [ComfortCategory] {
        &[Self::I, Self::II, Self::III]
    }
}

impl fmt::Display for ComfortCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I => write!(f, "I"),
            Self::II => write!(f, "II"),
            Self::III => write!(f, "III"),
        }
    }
}

impl FromStr for ComfortCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "I" | "1" => Ok(Self::I),
            "II" | "2" => Ok(Self::II),
            "III" | "3" => Ok(Self::III),
            _ => Err(anyhow::anyhow!(
                "Unknown comfort category: '{}'. Supported categories: I, II, III",
                s
            )),
        }
    }
}

// ============= Sensor Snapshot =============

/// Immutable sensor snapshot produced fresh each evaluation cycle.
/// Optional readings stay `None` when the sensor is absent or unavailable;
/// defaults are applied by the consumer, never by the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Indoor air temperature (°C)
    pub indoor_temp: f32,

    /// Outdoor air temperature (°C)
    pub outdoor_temp: f32,

    /// Indoor relative humidity (%)
    pub indoor_humidity: Option<f32>,

    /// Outdoor relative humidity (%)
    pub outdoor_humidity: Option<f32>,

    /// Mean radiant temperature (°C), for operative temperature mode
    pub mean_radiant_temp: Option<f32>,

    /// Indoor air velocity (m/s)
    pub air_velocity: Option<f32>,

    /// Occupancy reading, `None` when no occupancy sensor is configured
    pub occupancy: Option<bool>,

    /// When this snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl SensorSnapshot {
    /// Operative temperature: mean of air and radiant temperature when a
    /// radiant sensor is present and the mode is enabled, indoor air
    /// temperature otherwise
    pub fn operative_temp(&self, use_operative: bool) -> f32 {
        match (use_operative, self.mean_radiant_temp) {
            (true, Some(radiant)) => (self.indoor_temp + radiant) / 2.0,
            _ => self.indoor_temp,
        }
    }
}

// ============= Device Capabilities =============

/// Capability set detected from the climate entity's advertised attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub supports_cool: bool,
    pub supports_heat: bool,
    pub supports_fan: bool,
    pub supports_dry: bool,

    /// Raw HVAC mode strings advertised by the device
    pub hvac_modes: Vec<String>,

    /// Raw fan mode strings advertised by the device
    pub fan_modes: Vec<String>,
}

impl DeviceCapabilities {
    /// Detect capabilities from the entity's advertised mode lists
    pub fn from_advertised(hvac_modes: &[String], fan_modes: &[String]) -> Self {
        let has = |needle: &str| hvac_modes.iter().any(|m| m.eq_ignore_ascii_case(needle));
        Self {
            supports_cool: has("cool"),
            supports_heat: has("heat"),
            supports_fan: has("fan_only"),
            supports_dry: has("dry"),
            hvac_modes: hvac_modes.to_vec(),
            fan_modes: fan_modes.to_vec(),
        }
    }

    /// Whether the device advertises the given generic mode
    pub fn supports(&self, mode: HvacMode) -> bool {
        match mode {
            HvacMode::Cool => self.supports_cool,
            HvacMode::Heat => self.supports_heat,
            HvacMode::FanOnly => self.supports_fan,
            HvacMode::Dry => self.supports_dry,
            HvacMode::Off => true,
        }
    }

    /// Human-readable device type, for startup logging
    pub fn device_type(&self) -> &'static str {
        match (self.supports_cool, self.supports_heat, self.supports_fan) {
            (true, true, _) => "Heat/Cool (AC)",
            (false, true, _) => "Heat Only (TRV/Heater)",
            (true, false, _) => "Cool Only (AC)",
            (false, false, true) => "Fan Only",
            _ => "Unknown",
        }
    }
}

// ============= Device State =============

/// Current state of the wrapped climate entity, as last observed
#[derive(Component, Debug, Clone, Default)]
pub struct DeviceState {
    /// Current HVAC mode string reported by the device
    pub hvac_mode: String,

    /// Current fan mode, if reported
    pub fan_mode: Option<String>,

    /// Current target temperature, if reported
    pub target_temp: Option<f32>,

    /// Detected capability set
    pub capabilities: DeviceCapabilities,

    /// When the device state was last read
    pub last_updated: Option<DateTime<Utc>>,
}

impl DeviceState {
    /// Whether the device is powered on (any mode other than off)
    pub fn is_powered_on(&self) -> bool {
        !self.hvac_mode.eq_ignore_ascii_case("off")
    }
}
