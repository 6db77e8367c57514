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

//! Control-side types: action recommendations and the supervisor
//! (override/occupancy) state that gates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::climate::{FanSpeed, HvacMode};

// ============= Action Recommendation =============

/// Output of one evaluation cycle: what the engine wants the device to do.
/// Recomputed every cycle; the previous value is kept only for hysteresis
/// comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecommendation {
    pub hvac_mode: HvacMode,
    pub fan_speed: FanSpeed,

    /// Target setpoint (°C)
    pub target_temp: f32,

    /// True when the recommendation must not be forwarded to the device
    pub suppressed: bool,

    /// True when the comfort model was outside its applicable range and the
    /// engine fell back to the absolute comfort clamps
    pub low_confidence: bool,

    /// Advisory only: opening a window may suffice instead of running HVAC
    pub natural_ventilation: bool,

    /// Human-readable reason for this decision
    pub reason: String,
}

impl ActionRecommendation {
    /// A suppressed no-op recommendation with the given reason
    pub fn suppressed(reason: impl Into<String>) -> Self {
        Self {
            hvac_mode: HvacMode::Off,
            fan_speed: FanSpeed::Low,
            target_temp: 0.0,
            suppressed: true,
            low_confidence: false,
            natural_ventilation: false,
            reason: reason.into(),
        }
    }
}

// ============= Override State =============

/// Manual override window, created by the override service call.
/// `expires_at == None` means indefinite (until explicit clear).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideState {
    /// Fixed target temperature while the override is active (°C)
    pub target_temp: f32,

    /// Wall-clock expiry; always in the future at creation time
    pub expires_at: Option<DateTime<Utc>>,

    /// When this override was created
    pub created_at: DateTime<Utc>,
}

impl OverrideState {
    /// Create a new override starting now
    pub fn new(target_temp: f32, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            target_temp,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Whether the override is still in force at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expiry) => now < expiry,
            None => true,
        }
    }

    /// Whether the override window has passed
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_active(now)
    }
}

// ============= Occupancy State =============

/// Occupancy as last reported by the occupancy sensor.
/// Read-only to the decision engine; updated by the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyState {
    pub occupied: bool,
    pub last_change_at: DateTime<Utc>,
}

impl Default for OccupancyState {
    fn default() -> Self {
        // Assume occupied until a sensor says otherwise
        Self {
            occupied: true,
            last_change_at: Utc::now(),
        }
    }
}

impl OccupancyState {
    /// Record a sensor reading, updating the change timestamp only on edges
    pub fn observe(&mut self, occupied: bool, now: DateTime<Utc>) {
        if occupied != self.occupied {
            self.occupied = occupied;
            self.last_change_at = now;
        }
    }

    /// Minutes since the space became unoccupied; `None` while occupied
    pub fn vacant_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.occupied {
            None
        } else {
            Some((now - self.last_change_at).num_minutes())
        }
    }
}

// ============= Supervisor State =============

/// Operating mode of the override/occupancy gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SupervisorMode {
    /// Normal adaptive control
    #[default]
    Automatic,
    /// Manual override in force: fixed target temperature
    ManualOverride,
    /// Space vacant: comfort band widened by the setback offset
    UnoccupiedSetback,
    /// Space vacant past the shutdown window: HVAC forced off
    AutoShutdown,
}

/// Persisted supervisor state - survives restarts so an in-flight override or
/// shutdown window is not lost.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SupervisorState {
    /// Active manual override, if any
    #[serde(default)]
    pub manual_override: Option<OverrideState>,

    /// Occupancy tracking
    #[serde(default)]
    pub occupancy: OccupancyState,

    /// Latched when the device was powered off by someone other than ClimION.
    /// While set, no automatically generated "on" action may be forwarded,
    /// regardless of every other state.
    #[serde(default)]
    pub user_powered_off: bool,

    /// Earliest time automatic control may resume after occupancy returns
    #[serde(default)]
    pub resume_not_before: Option<DateTime<Utc>>,
}

impl SupervisorState {
    /// Drop an expired override, returning true if one was cleared
    pub fn cleanup_expired_override(&mut self, now: DateTime<Utc>) -> bool {
        if self
            .manual_override
            .as_ref()
            .is_some_and(|active| active.has_expired(now))
        {
            self.manual_override = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_override_expiry() {
        let now = Utc::now();
        let timed = OverrideState::new(22.0, Some(now + Duration::minutes(60)));

        assert!(timed.is_active(now));
        assert!(timed.is_active(now + Duration::minutes(30)));
        assert!(timed.has_expired(now + Duration::minutes(61)));
    }

    #[test]
    fn test_indefinite_override_never_expires() {
        let now = Utc::now();
        let indefinite = OverrideState::new(21.0, None);
        assert!(indefinite.is_active(now + Duration::days(365)));
    }

    #[test]
    fn test_occupancy_edge_tracking() {
        let now = Utc::now();
        let mut occupancy = OccupancyState {
            occupied: true,
            last_change_at: now,
        };

        // Re-reporting the same state must not move the edge timestamp
        occupancy.observe(true, now + Duration::minutes(5));
        assert_eq!(occupancy.last_change_at, now);

        occupancy.observe(false, now + Duration::minutes(10));
        assert!(!occupancy.occupied);
        assert_eq!(
            occupancy.vacant_minutes(now + Duration::minutes(40)),
            Some(30)
        );
    }

    #[test]
    fn test_vacant_minutes_none_while_occupied() {
        let occupancy = OccupancyState::default();
        assert_eq!(occupancy.vacant_minutes(Utc::now()), None);
    }

    #[test]
    fn test_cleanup_expired_override() {
        let now = Utc::now();
        let mut state = SupervisorState {
            manual_override: Some(OverrideState::new(22.0, Some(now - Duration::minutes(1)))),
            ..Default::default()
        };

        assert!(state.cleanup_expired_override(now));
        assert!(state.manual_override.is_none());
        // Second call is a no-op
        assert!(!state.cleanup_expired_override(now));
    }
}
