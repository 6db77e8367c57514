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

//! Control decision engine.
//!
//! Turns the current sensor snapshot plus the computed comfort band into an
//! `ActionRecommendation`: HVAC mode, fan speed and target setpoint. The
//! engine is pure; gating (overrides, occupancy, power-off) happens in the
//! supervisor, device capability mapping in the adapter.

use tracing::debug;

use crate::comfort::ComfortBand;
use climion_types::{
    ActionRecommendation, ComfortConfig, DeviceCapabilities, FanSpeed, HvacMode, SensorSnapshot,
};

/// Context for one decision, borrowed from the evaluation cycle
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    pub snapshot: &'a SensorSnapshot,
    pub config: &'a ComfortConfig,
    pub capabilities: &'a DeviceCapabilities,

    /// Comfort band for this cycle, already widened when in setback
    pub band: &'a ComfortBand,

    /// True when `band` is the degraded fallback (comfort model was outside
    /// its applicable range)
    pub low_confidence: bool,

    /// 7-day outdoor running mean (°C), for energy-save summer detection
    pub outdoor_running_mean: f32,

    /// Previous recommendation, for hysteresis
    pub prev: Option<&'a ActionRecommendation>,
}

/// Degraded comfort band used when the adaptive model is not applicable:
/// the configured absolute clamps with their midpoint as the target.
pub fn fallback_band(config: &ComfortConfig) -> ComfortBand {
    ComfortBand {
        comfort_temp: (config.min_comfort_temp + config.max_comfort_temp) / 2.0,
        band_min: config.min_comfort_temp,
        band_max: config.max_comfort_temp,
        category: config.comfort_category,
        compliant: false,
    }
}

/// Decide the recommended action for this cycle.
pub fn decide(ctx: &EvaluationContext<'_>) -> ActionRecommendation {
    let config = ctx.config;
    let band = ctx.band;
    let evaluated = ctx
        .snapshot
        .operative_temp(config.use_operative_temperature);

    let allowed = |mode: HvacMode| config.mode_enabled(mode) && ctx.capabilities.supports(mode);

    // Mode selection, first match wins
    let (mut hvac_mode, mut reason) = if evaluated > band.band_max {
        if allowed(HvacMode::Cool) {
            (HvacMode::Cool, "above comfort band, cooling")
        } else if allowed(HvacMode::Dry) {
            (HvacMode::Dry, "above comfort band, cooling disabled, drying")
        } else if allowed(HvacMode::FanOnly) {
            (HvacMode::FanOnly, "above comfort band, cooling disabled, fan")
        } else {
            (HvacMode::Off, "above comfort band, no cooling capability")
        }
    } else if evaluated < band.band_min {
        if allowed(HvacMode::Heat) {
            (HvacMode::Heat, "below comfort band, heating")
        } else {
            (HvacMode::Off, "below comfort band, no heating capability")
        }
    } else if config.enable_off_mode {
        (HvacMode::Off, "within comfort band")
    } else if allowed(HvacMode::FanOnly) {
        (HvacMode::FanOnly, "within comfort band, off disabled")
    } else {
        (HvacMode::Off, "within comfort band")
    };

    // Energy save: in summer-like conditions with the indoor air already
    // below the comfort temperature (a hot radiant surface can push the
    // operative temperature over the band), cooling is wasted run time
    let summer_like = ctx.outdoor_running_mean >= config.energy_save_summer_threshold;
    if config.energy_save_mode
        && summer_like
        && ctx.snapshot.indoor_temp < band.comfort_temp
        && (hvac_mode == HvacMode::Cool || hvac_mode == HvacMode::Dry)
    {
        hvac_mode = if config.enable_off_mode {
            HvacMode::Off
        } else if allowed(HvacMode::FanOnly) {
            HvacMode::FanOnly
        } else {
            HvacMode::Off
        };
        reason = "energy save: already below comfort temperature";
    }

    let target_temp = band.comfort_temp;
    let fan_speed = fan_speed_for(hvac_mode, evaluated, band, config);
    let natural_ventilation = natural_ventilation_hint(ctx.snapshot, band, config, hvac_mode);

    let recommendation = ActionRecommendation {
        hvac_mode,
        fan_speed,
        target_temp,
        suppressed: false,
        low_confidence: ctx.low_confidence,
        natural_ventilation,
        reason: reason.to_string(),
    };

    // Hysteresis: a same-mode change smaller than the threshold is not worth
    // a device write; keep the previous action verbatim
    if let Some(prev) = ctx.prev
        && !prev.suppressed
        && prev.hvac_mode == recommendation.hvac_mode
        && (recommendation.target_temp - prev.target_temp).abs()
            < config.temperature_change_threshold
    {
        debug!(
            "Holding previous action: Δtarget {:.2}°C below threshold {:.2}°C",
            (recommendation.target_temp - prev.target_temp).abs(),
            config.temperature_change_threshold
        );
        return prev.clone();
    }

    recommendation
}

/// Fan speed scaled linearly across the configured ladder range by the
/// deviation from the comfort band, clamped to [min, max].
fn fan_speed_for(
    mode: HvacMode,
    evaluated: f32,
    band: &ComfortBand,
    config: &ComfortConfig,
) -> FanSpeed {
    let deviation = match mode {
        HvacMode::Cool | HvacMode::Dry | HvacMode::FanOnly => (evaluated - band.band_max).max(0.0),
        HvacMode::Heat => (band.band_min - evaluated).max(0.0),
        HvacMode::Off => return config.min_fan_speed,
    };

    let span = config.fan_deviation_full_scale.max(f32::EPSILON);
    let fraction = (deviation / span).clamp(0.0, 1.0);

    let min_idx = config.min_fan_speed.index();
    let max_idx = config.max_fan_speed.index().max(min_idx);
    let idx = min_idx + (fraction * (max_idx - min_idx) as f32).round() as usize;

    FanSpeed::from_index(idx).clamp_to(config.min_fan_speed, config.max_fan_speed)
}

/// True when opening a window is likely enough: outdoor air is inside the
/// comfort band and close to the indoor temperature while HVAC would
/// otherwise run.
fn natural_ventilation_hint(
    snapshot: &SensorSnapshot,
    band: &ComfortBand,
    config: &ComfortConfig,
    chosen_mode: HvacMode,
) -> bool {
    if !config.natural_ventilation_enable || !chosen_mode.is_active() {
        return false;
    }

    let indoor = snapshot.indoor_temp;
    let outdoor = snapshot.outdoor_temp;
    let threshold = config.natural_ventilation_threshold;

    let temp_suitable =
        band.contains(outdoor) && !band.contains(indoor) && (outdoor - indoor).abs() <= threshold;

    // Outdoor air should not be noticeably more humid than indoor air
    let humidity_suitable = match (snapshot.outdoor_humidity, snapshot.indoor_humidity) {
        (Some(out_rh), Some(in_rh)) => out_rh <= in_rh + 10.0,
        _ => true,
    };

    temp_suitable && humidity_suitable
}
