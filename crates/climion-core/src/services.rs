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

//! Service entry points.
//!
//! Every request is validated synchronously against its documented range and
//! rejected with a descriptive error - nothing is clamped silently, nothing
//! is partially applied. Valid requests are queued over a channel and drained
//! by the control loop once per frame.

use bevy_ecs::prelude::Resource;
use thiserror::Error;
use tokio::sync::mpsc;

use climion_types::{ComfortCategory, ComfortConfig, FanSpeed};

/// Valid manual override temperature range (°C)
pub const OVERRIDE_TEMP_MIN: f32 = 10.0;
pub const OVERRIDE_TEMP_MAX: f32 = 40.0;

/// Maximum manual override duration (24 hours)
pub const OVERRIDE_DURATION_MAX_MINUTES: u32 = 24 * 60;

/// Service call rejection reasons
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error(
        "override temperature {temp:.1}°C is outside the valid range \
         ({OVERRIDE_TEMP_MIN}-{OVERRIDE_TEMP_MAX}°C)"
    )]
    OverrideTemperatureOutOfRange { temp: f32 },

    #[error(
        "override duration {minutes} minutes exceeds the maximum of \
         {OVERRIDE_DURATION_MAX_MINUTES} minutes (0 means indefinite)"
    )]
    OverrideDurationOutOfRange { minutes: u32 },

    #[error("parameter {parameter}: value {value} is outside the valid range {range}")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("the service channel is closed, the control loop is not running")]
    ChannelClosed,
}

/// Enum-keyed configuration parameter update. Each variant is validated
/// against its documented range before it is queued.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterUpdate {
    MinComfortTemp(f32),
    MaxComfortTemp(f32),
    TemperatureChangeThreshold(f32),
    SetbackOffset(f32),
    AirVelocity(f32),
    NaturalVentilationThreshold(f32),
    EnergySaveMode(bool),
    EnergySaveSummerThreshold(f32),
    AutoShutdownMinutes(u32),
    SetbackDelayMinutes(u32),
    MinFanSpeed(FanSpeed),
    MaxFanSpeed(FanSpeed),
    UseOperativeTemperature(bool),
}

impl ParameterUpdate {
    /// Parameter name for error messages and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinComfortTemp(_) => "min_comfort_temp",
            Self::MaxComfortTemp(_) => "max_comfort_temp",
            Self::TemperatureChangeThreshold(_) => "temperature_change_threshold",
            Self::SetbackOffset(_) => "setback_offset",
            Self::AirVelocity(_) => "air_velocity",
            Self::NaturalVentilationThreshold(_) => "natural_ventilation_threshold",
            Self::EnergySaveMode(_) => "energy_save_mode",
            Self::EnergySaveSummerThreshold(_) => "energy_save_summer_threshold",
            Self::AutoShutdownMinutes(_) => "auto_shutdown_minutes",
            Self::SetbackDelayMinutes(_) => "setback_delay_minutes",
            Self::MinFanSpeed(_) => "min_fan_speed",
            Self::MaxFanSpeed(_) => "max_fan_speed",
            Self::UseOperativeTemperature(_) => "use_operative_temperature",
        }
    }

    /// Validate the carried value against its documented range
    pub fn validate(&self) -> Result<(), ServiceError> {
        let reject = |value: String, range: &'static str| {
            Err(ServiceError::ParameterOutOfRange {
                parameter: self.name(),
                value,
                range,
            })
        };
        match *self {
            Self::MinComfortTemp(v) | Self::MaxComfortTemp(v) => {
                if !(5.0..=40.0).contains(&v) {
                    return reject(format!("{v:.1}"), "5.0-40.0 °C");
                }
            }
            Self::TemperatureChangeThreshold(v) => {
                if !(0.1..=3.0).contains(&v) {
                    return reject(format!("{v:.1}"), "0.1-3.0 °C");
                }
            }
            Self::SetbackOffset(v) => {
                if !(0.5..=5.0).contains(&v) {
                    return reject(format!("{v:.1}"), "0.5-5.0 °C");
                }
            }
            Self::AirVelocity(v) => {
                if !(0.0..=2.0).contains(&v) {
                    return reject(format!("{v:.2}"), "0.0-2.0 m/s");
                }
            }
            Self::NaturalVentilationThreshold(v) => {
                if !(0.5..=5.0).contains(&v) {
                    return reject(format!("{v:.1}"), "0.5-5.0 °C");
                }
            }
            Self::EnergySaveSummerThreshold(v) => {
                if !(10.0..=33.5).contains(&v) {
                    return reject(format!("{v:.1}"), "10.0-33.5 °C");
                }
            }
            Self::AutoShutdownMinutes(v) => {
                if v > 24 * 60 {
                    return reject(v.to_string(), "0-1440 minutes");
                }
            }
            Self::SetbackDelayMinutes(v) => {
                if !(1..=24 * 60).contains(&v) {
                    return reject(v.to_string(), "1-1440 minutes");
                }
            }
            Self::EnergySaveMode(_)
            | Self::MinFanSpeed(_)
            | Self::MaxFanSpeed(_)
            | Self::UseOperativeTemperature(_) => {}
        }
        Ok(())
    }
}

impl ParameterUpdate {
    /// Apply this (already validated) update to the configuration
    pub fn apply(&self, config: &mut ComfortConfig) {
        match *self {
            Self::MinComfortTemp(v) => config.min_comfort_temp = v,
            Self::MaxComfortTemp(v) => config.max_comfort_temp = v,
            Self::TemperatureChangeThreshold(v) => config.temperature_change_threshold = v,
            Self::SetbackOffset(v) => config.setback_offset = v,
            Self::AirVelocity(v) => config.air_velocity = v,
            Self::NaturalVentilationThreshold(v) => config.natural_ventilation_threshold = v,
            Self::EnergySaveMode(v) => config.energy_save_mode = v,
            Self::EnergySaveSummerThreshold(v) => config.energy_save_summer_threshold = v,
            Self::AutoShutdownMinutes(v) => config.auto_shutdown_minutes = v,
            Self::SetbackDelayMinutes(v) => config.setback_delay_minutes = v,
            Self::MinFanSpeed(v) => config.min_fan_speed = v,
            Self::MaxFanSpeed(v) => config.max_fan_speed = v,
            Self::UseOperativeTemperature(v) => config.use_operative_temperature = v,
        }
    }
}

/// Parameter identifier, for resetting a single value to its default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKey {
    MinComfortTemp,
    MaxComfortTemp,
    TemperatureChangeThreshold,
    SetbackOffset,
    AirVelocity,
    NaturalVentilationThreshold,
    EnergySaveMode,
    EnergySaveSummerThreshold,
    AutoShutdownMinutes,
    SetbackDelayMinutes,
    MinFanSpeed,
    MaxFanSpeed,
    UseOperativeTemperature,
}

impl ParameterKey {
    /// Restore the addressed parameter to its documented default
    pub fn reset(&self, config: &mut ComfortConfig) {
        let defaults = ComfortConfig::default();
        match self {
            Self::MinComfortTemp => config.min_comfort_temp = defaults.min_comfort_temp,
            Self::MaxComfortTemp => config.max_comfort_temp = defaults.max_comfort_temp,
            Self::TemperatureChangeThreshold => {
                config.temperature_change_threshold = defaults.temperature_change_threshold;
            }
            Self::SetbackOffset => config.setback_offset = defaults.setback_offset,
            Self::AirVelocity => config.air_velocity = defaults.air_velocity,
            Self::NaturalVentilationThreshold => {
                config.natural_ventilation_threshold = defaults.natural_ventilation_threshold;
            }
            Self::EnergySaveMode => config.energy_save_mode = defaults.energy_save_mode,
            Self::EnergySaveSummerThreshold => {
                config.energy_save_summer_threshold = defaults.energy_save_summer_threshold;
            }
            Self::AutoShutdownMinutes => {
                config.auto_shutdown_minutes = defaults.auto_shutdown_minutes;
            }
            Self::SetbackDelayMinutes => {
                config.setback_delay_minutes = defaults.setback_delay_minutes;
            }
            Self::MinFanSpeed => config.min_fan_speed = defaults.min_fan_speed,
            Self::MaxFanSpeed => config.max_fan_speed = defaults.max_fan_speed,
            Self::UseOperativeTemperature => {
                config.use_operative_temperature = defaults.use_operative_temperature;
            }
        }
    }
}

/// A validated service request, ready for the control loop
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    /// Pin the target temperature, optionally for a limited time
    SetManualOverride { temp: f32, duration_minutes: u32 },
    /// Drop any manual override
    ClearManualOverride,
    /// Switch the comfort category
    SetComfortCategory(ComfortCategory),
    /// Run an evaluation cycle immediately
    ForceRecalculate,
    /// Update one configuration parameter
    SetParameter(ParameterUpdate),
    /// Reset one configuration parameter to its default
    ResetParameter(ParameterKey),
    /// Discard the outdoor temperature history
    ResetOutdoorHistory,
}

/// Clonable sender handle for service requests. Also registered as a
/// resource so status surfaces can reach the control loop.
#[derive(Resource, Clone)]
pub struct ServiceSender {
    sender: mpsc::UnboundedSender<ServiceRequest>,
}

impl std::fmt::Debug for ServiceSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSender").finish_non_exhaustive()
    }
}

/// Channel resource drained by the control loop
#[derive(Resource)]
pub struct ServiceChannel {
    pub receiver: mpsc::UnboundedReceiver<ServiceRequest>,
}

impl std::fmt::Debug for ServiceChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceChannel").finish_non_exhaustive()
    }
}

impl ServiceSender {
    /// Create a new sender/receiver pair
    pub fn new() -> (Self, ServiceChannel) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, ServiceChannel { receiver })
    }

    /// Set a manual override after validating temperature and duration.
    /// `duration_minutes == 0` means indefinite.
    pub fn set_manual_override(
        &self,
        temp: f32,
        duration_minutes: u32,
    ) -> Result<(), ServiceError> {
        if !(OVERRIDE_TEMP_MIN..=OVERRIDE_TEMP_MAX).contains(&temp) {
            return Err(ServiceError::OverrideTemperatureOutOfRange { temp });
        }
        if duration_minutes > OVERRIDE_DURATION_MAX_MINUTES {
            return Err(ServiceError::OverrideDurationOutOfRange {
                minutes: duration_minutes,
            });
        }
        self.send(ServiceRequest::SetManualOverride {
            temp,
            duration_minutes,
        })
    }

    pub fn clear_manual_override(&self) -> Result<(), ServiceError> {
        self.send(ServiceRequest::ClearManualOverride)
    }

    pub fn set_comfort_category(&self, category: ComfortCategory) -> Result<(), ServiceError> {
        self.send(ServiceRequest::SetComfortCategory(category))
    }

    pub fn force_recalculate(&self) -> Result<(), ServiceError> {
        self.send(ServiceRequest::ForceRecalculate)
    }

    pub fn set_parameter(&self, update: ParameterUpdate) -> Result<(), ServiceError> {
        update.validate()?;
        self.send(ServiceRequest::SetParameter(update))
    }

    pub fn reset_parameter(&self, key: ParameterKey) -> Result<(), ServiceError> {
        self.send(ServiceRequest::ResetParameter(key))
    }

    pub fn reset_outdoor_history(&self) -> Result<(), ServiceError> {
        self.send(ServiceRequest::ResetOutdoorHistory)
    }

    fn send(&self, request: ServiceRequest) -> Result<(), ServiceError> {
        self.sender
            .send(request)
            .map_err(|_| ServiceError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_temperature_validation() {
        let (sender, mut channel) = ServiceSender::new();

        assert!(matches!(
            sender.set_manual_override(45.0, 60),
            Err(ServiceError::OverrideTemperatureOutOfRange { .. })
        ));
        assert!(matches!(
            sender.set_manual_override(9.9, 60),
            Err(ServiceError::OverrideTemperatureOutOfRange { .. })
        ));
        // Nothing reached the channel
        assert!(channel.receiver.try_recv().is_err());

        sender.set_manual_override(22.0, 60).unwrap();
        assert_eq!(
            channel.receiver.try_recv().unwrap(),
            ServiceRequest::SetManualOverride {
                temp: 22.0,
                duration_minutes: 60
            }
        );
    }

    #[test]
    fn test_override_duration_validation() {
        let (sender, _channel) = ServiceSender::new();
        assert!(matches!(
            sender.set_manual_override(22.0, 24 * 60 + 1),
            Err(ServiceError::OverrideDurationOutOfRange { .. })
        ));
        // Zero duration is valid and means indefinite
        sender.set_manual_override(22.0, 0).unwrap();
    }

    #[test]
    fn test_parameter_validation() {
        assert!(ParameterUpdate::TemperatureChangeThreshold(0.5).validate().is_ok());
        assert!(matches!(
            ParameterUpdate::TemperatureChangeThreshold(5.0).validate(),
            Err(ServiceError::ParameterOutOfRange { .. })
        ));
        assert!(matches!(
            ParameterUpdate::AirVelocity(-0.5).validate(),
            Err(ServiceError::ParameterOutOfRange { .. })
        ));
        assert!(matches!(
            ParameterUpdate::SetbackOffset(9.0).validate(),
            Err(ServiceError::ParameterOutOfRange { .. })
        ));
        assert!(ParameterUpdate::EnergySaveMode(false).validate().is_ok());
    }

    #[test]
    fn test_invalid_parameter_never_queued() {
        let (sender, mut channel) = ServiceSender::new();
        assert!(sender
            .set_parameter(ParameterUpdate::MinComfortTemp(60.0))
            .is_err());
        assert!(channel.receiver.try_recv().is_err());
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = ServiceError::OverrideTemperatureOutOfRange { temp: 45.0 };
        let text = err.to_string();
        assert!(text.contains("45.0"));
        assert!(text.contains("10"));
        assert!(text.contains("40"));
    }

    #[test]
    fn test_parameter_apply_and_reset() {
        let mut config = ComfortConfig::default();
        ParameterUpdate::TemperatureChangeThreshold(1.0).apply(&mut config);
        assert_eq!(config.temperature_change_threshold, 1.0);

        ParameterKey::TemperatureChangeThreshold.reset(&mut config);
        assert_eq!(config.temperature_change_threshold, 0.5);
    }

    #[test]
    fn test_category_and_misc_requests() {
        let (sender, mut channel) = ServiceSender::new();
        sender.set_comfort_category(ComfortCategory::III).unwrap();
        sender.force_recalculate().unwrap();
        sender.reset_outdoor_history().unwrap();

        assert_eq!(
            channel.receiver.try_recv().unwrap(),
            ServiceRequest::SetComfortCategory(ComfortCategory::III)
        );
        assert_eq!(
            channel.receiver.try_recv().unwrap(),
            ServiceRequest::ForceRecalculate
        );
        assert_eq!(
            channel.receiver.try_recv().unwrap(),
            ServiceRequest::ResetOutdoorHistory
        );
    }
}
