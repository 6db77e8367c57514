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

//! ASHRAE 55 adaptive comfort model.
//!
//! Pure functions only: same inputs, same outputs, no hidden state.
//! The comfort temperature follows ASHRAE 55-2020 section 5.4:
//! `t_cmf = 18.9 + 0.255 × t_rm`, valid for a running mean outdoor
//! temperature between 10.0 and 33.5 °C. Outside that range the model
//! refuses to extrapolate and the caller must apply its fallback policy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use climion_types::{ComfortCategory, ComfortConfig, SensorSnapshot};

/// ASHRAE 55 applicability range for the outdoor running mean (°C)
pub const RUNNING_MEAN_MIN: f32 = 10.0;
pub const RUNNING_MEAN_MAX: f32 = 33.5;

/// Comfort equation constants (ASHRAE 55-2020, Section 5.4)
pub const BASE_TEMP: f32 = 18.9;
pub const TEMP_COEFFICIENT: f32 = 0.255;

/// Air velocity above which the elevated-air-speed cooling effect applies (m/s)
const AIR_VELOCITY_THRESHOLD: f32 = 0.2;

/// Cap on the air velocity cooling effect (°C)
const AIR_VELOCITY_MAX_OFFSET: f32 = 2.2;

/// Indoor relative humidity bounds for the comfort correction (%)
const HUMIDITY_HIGH_THRESHOLD: f32 = 60.0;
const HUMIDITY_LOW_THRESHOLD: f32 = 30.0;
const HUMIDITY_CORRECTION_FACTOR_HIGH: f32 = 0.3;
const HUMIDITY_CORRECTION_FACTOR_LOW: f32 = 0.2;

/// Comfort model failure modes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComfortError {
    #[error(
        "running mean outdoor temperature {t_rm:.1}°C is outside the ASHRAE 55 \
         applicable range ({RUNNING_MEAN_MIN}-{RUNNING_MEAN_MAX}°C)"
    )]
    OutsideApplicableRange { t_rm: f32 },

    #[error("air velocity {velocity} m/s cannot be negative")]
    NegativeAirVelocity { velocity: f32 },
}

/// Computed comfort band for one evaluation cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComfortBand {
    /// Adaptive comfort temperature (°C), after corrections and clamping
    pub comfort_temp: f32,

    /// Lower acceptable bound (°C)
    pub band_min: f32,

    /// Upper acceptable bound (°C)
    pub band_max: f32,

    pub category: ComfortCategory,

    /// Whether the evaluated (operative) temperature sits inside the band
    pub compliant: bool,
}

impl ComfortBand {
    /// Whether a temperature falls inside this band
    pub fn contains(&self, temp: f32) -> bool {
        temp >= self.band_min && temp <= self.band_max
    }

    /// Widen the band symmetrically, e.g. for unoccupied setback
    pub fn widened(&self, offset: f32) -> ComfortBand {
        ComfortBand {
            band_min: self.band_min - offset,
            band_max: self.band_max + offset,
            ..self.clone()
        }
    }
}

/// Inputs to one comfort computation, assembled from the sensor snapshot
/// and configuration by the caller
#[derive(Debug, Clone)]
pub struct ComfortInputs {
    /// 7-day running mean of outdoor temperature (°C)
    pub outdoor_running_mean: f32,

    /// Temperature the band is evaluated against: operative temperature when
    /// enabled and available, indoor air temperature otherwise
    pub evaluated_temp: f32,

    /// Indoor air velocity (m/s)
    pub air_velocity: f32,

    /// Indoor relative humidity (%), if known
    pub indoor_humidity: Option<f32>,
}

impl ComfortInputs {
    /// Assemble inputs from a sensor snapshot and configuration
    pub fn from_snapshot(
        snapshot: &SensorSnapshot,
        config: &ComfortConfig,
        outdoor_running_mean: f32,
    ) -> Self {
        Self {
            outdoor_running_mean,
            evaluated_temp: snapshot.operative_temp(config.use_operative_temperature),
            air_velocity: snapshot.air_velocity.unwrap_or(config.air_velocity),
            indoor_humidity: snapshot.indoor_humidity,
        }
    }
}

/// Cooling effect of elevated air speed (°C), applied to the upper band
/// bound only. Zero at or below 0.2 m/s, logarithmic above, capped.
pub fn air_velocity_offset(velocity: f32) -> f32 {
    if velocity <= AIR_VELOCITY_THRESHOLD {
        return 0.0;
    }
    (1.2 * (velocity * 10.0).log10()).min(AIR_VELOCITY_MAX_OFFSET)
}

/// Indoor humidity comfort correction (°C). High humidity lowers the
/// perceived comfort temperature, very dry air raises it slightly.
pub fn humidity_offset(indoor_humidity: Option<f32>, enabled: bool) -> f32 {
    let Some(rh) = indoor_humidity else {
        return 0.0;
    };
    if !enabled {
        return 0.0;
    }
    let rh = rh.clamp(0.0, 100.0);
    if rh > HUMIDITY_HIGH_THRESHOLD {
        -HUMIDITY_CORRECTION_FACTOR_HIGH * (rh - HUMIDITY_HIGH_THRESHOLD) / 10.0
    } else if rh < HUMIDITY_LOW_THRESHOLD {
        HUMIDITY_CORRECTION_FACTOR_LOW * (HUMIDITY_LOW_THRESHOLD - rh) / 10.0
    } else {
        0.0
    }
}

/// Compute the adaptive comfort band.
///
/// Returns `ComfortError::OutsideApplicableRange` when the running mean is
/// outside [10.0, 33.5] °C rather than extrapolating silently; the decision
/// engine degrades to the absolute comfort clamps in that case.
pub fn compute_comfort(
    inputs: &ComfortInputs,
    config: &ComfortConfig,
) -> Result<ComfortBand, ComfortError> {
    let t_rm = inputs.outdoor_running_mean;
    if !(RUNNING_MEAN_MIN..=RUNNING_MEAN_MAX).contains(&t_rm) {
        return Err(ComfortError::OutsideApplicableRange { t_rm });
    }
    if inputs.air_velocity < 0.0 {
        return Err(ComfortError::NegativeAirVelocity {
            velocity: inputs.air_velocity,
        });
    }

    let category = config.comfort_category;
    let half_width = category.half_width();

    let comfort_temp = BASE_TEMP
        + TEMP_COEFFICIENT * t_rm
        + humidity_offset(inputs.indoor_humidity, config.humidity_comfort_enable);

    // Elevated air speed extends the warm edge of the band only
    let band_min = comfort_temp - half_width;
    let band_max = comfort_temp + half_width + air_velocity_offset(inputs.air_velocity);

    // Clamp to the configured absolute limits, keeping the invariant
    // band_min <= comfort_temp <= band_max
    let band_min = band_min.max(config.min_comfort_temp);
    let band_max = band_max.min(config.max_comfort_temp).max(band_min);
    let comfort_temp = comfort_temp.clamp(band_min, band_max);

    let compliant = inputs.evaluated_temp >= band_min && inputs.evaluated_temp <= band_max;

    Ok(ComfortBand {
        comfort_temp,
        band_min,
        band_max,
        category,
        compliant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wide clamps so band arithmetic is exercised without clamping
    fn unclamped_config(category: ComfortCategory) -> ComfortConfig {
        ComfortConfig {
            comfort_category: category,
            min_comfort_temp: 0.0,
            max_comfort_temp: 40.0,
            humidity_comfort_enable: false,
            ..Default::default()
        }
    }

    fn inputs(t_rm: f32, evaluated: f32) -> ComfortInputs {
        ComfortInputs {
            outdoor_running_mean: t_rm,
            evaluated_temp: evaluated,
            air_velocity: 0.1,
            indoor_humidity: None,
        }
    }

    #[test]
    fn test_base_formula_exact() {
        for category in ComfortCategory::all() {
            for t_rm in [10.0_f32, 18.0, 25.0, 33.5] {
                let band =
                    compute_comfort(&inputs(t_rm, 23.0), &unclamped_config(*category)).unwrap();
                let expected = BASE_TEMP + TEMP_COEFFICIENT * t_rm;
                assert_eq!(band.comfort_temp, expected);
                assert_eq!(band.band_min, expected - category.half_width());
                assert_eq!(band.band_max, expected + category.half_width());
            }
        }
    }

    #[test]
    fn test_category_two_at_running_mean_25() {
        let band = compute_comfort(&inputs(25.0, 23.0), &unclamped_config(ComfortCategory::II))
            .unwrap();
        // 18.9 + 0.255 × 25.0 = 25.275
        assert!((band.comfort_temp - 25.275).abs() < 1e-4);
        assert!((band.band_min - 21.775).abs() < 1e-4);
        assert!((band.band_max - 28.775).abs() < 1e-4);
        assert!(band.compliant);
    }

    #[test]
    fn test_outside_applicable_range() {
        let config = unclamped_config(ComfortCategory::II);
        assert!(matches!(
            compute_comfort(&inputs(9.9, 22.0), &config),
            Err(ComfortError::OutsideApplicableRange { .. })
        ));
        assert!(matches!(
            compute_comfort(&inputs(33.6, 22.0), &config),
            Err(ComfortError::OutsideApplicableRange { .. })
        ));
        // Boundaries are inclusive
        assert!(compute_comfort(&inputs(10.0, 22.0), &config).is_ok());
        assert!(compute_comfort(&inputs(33.5, 22.0), &config).is_ok());
    }

    #[test]
    fn test_idempotent() {
        let config = unclamped_config(ComfortCategory::I);
        let a = compute_comfort(&inputs(20.0, 24.0), &config).unwrap();
        let b = compute_comfort(&inputs(20.0, 24.0), &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_air_velocity_extends_upper_bound_only() {
        let config = unclamped_config(ComfortCategory::II);
        let still = compute_comfort(&inputs(25.0, 23.0), &config).unwrap();

        let breezy = ComfortInputs {
            air_velocity: 0.6,
            ..inputs(25.0, 23.0)
        };
        let band = compute_comfort(&breezy, &config).unwrap();

        assert_eq!(band.band_min, still.band_min);
        assert_eq!(band.comfort_temp, still.comfort_temp);
        let expected_offset = 1.2 * (0.6_f32 * 10.0).log10();
        assert!((band.band_max - still.band_max - expected_offset).abs() < 1e-4);
    }

    #[test]
    fn test_air_velocity_offset_capped() {
        assert_eq!(air_velocity_offset(0.1), 0.0);
        assert_eq!(air_velocity_offset(0.2), 0.0);
        assert!(air_velocity_offset(0.3) > 0.0);
        // Monotonic and capped
        assert!(air_velocity_offset(0.5) < air_velocity_offset(1.0));
        assert_eq!(air_velocity_offset(100.0), AIR_VELOCITY_MAX_OFFSET);
    }

    #[test]
    fn test_negative_air_velocity_rejected() {
        let bad = ComfortInputs {
            air_velocity: -0.1,
            ..inputs(20.0, 22.0)
        };
        assert!(matches!(
            compute_comfort(&bad, &unclamped_config(ComfortCategory::II)),
            Err(ComfortError::NegativeAirVelocity { .. })
        ));
    }

    #[test]
    fn test_humidity_correction() {
        assert_eq!(humidity_offset(Some(50.0), true), 0.0);
        // 70% RH: -0.3 × (70-60)/10 = -0.3
        assert!((humidity_offset(Some(70.0), true) + 0.3).abs() < 1e-6);
        // 20% RH: +0.2 × (30-20)/10 = +0.2
        assert!((humidity_offset(Some(20.0), true) - 0.2).abs() < 1e-6);
        assert_eq!(humidity_offset(Some(80.0), false), 0.0);
        assert_eq!(humidity_offset(None, true), 0.0);
    }

    #[test]
    fn test_absolute_clamps_hold_invariant() {
        let config = ComfortConfig {
            comfort_category: ComfortCategory::III,
            min_comfort_temp: 21.0,
            max_comfort_temp: 26.0,
            humidity_comfort_enable: false,
            ..Default::default()
        };
        // t_rm 33.5 ⇒ raw comfort 27.44, above the ceiling
        let band = compute_comfort(&inputs(33.5, 24.0), &config).unwrap();
        assert!(band.band_min >= 21.0);
        assert!(band.band_max <= 26.0);
        assert!(band.band_min <= band.comfort_temp && band.comfort_temp <= band.band_max);
    }

    #[test]
    fn test_widened_band() {
        let band = compute_comfort(&inputs(25.0, 23.0), &unclamped_config(ComfortCategory::I))
            .unwrap();
        let wide = band.widened(2.0);
        assert_eq!(wide.band_min, band.band_min - 2.0);
        assert_eq!(wide.band_max, band.band_max + 2.0);
        assert_eq!(wide.comfort_temp, band.comfort_temp);
    }
}
