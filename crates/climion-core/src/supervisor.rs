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

//! Override/occupancy supervisor.
//!
//! Gates the decision engine's recommendation: manual overrides pin the
//! target temperature, prolonged vacancy widens the band and eventually
//! forces the device off, and a user-initiated power-off blocks every
//! automatic "on" action until the user powers the device back on.
//!
//! Timers are wall-clock deadlines checked at the start of each cycle, not
//! scheduled callbacks.

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use climion_types::{
    ActionRecommendation, ComfortConfig, HvacMode, OverrideState, SupervisorMode, SupervisorState,
};

/// Supervisor resource wrapping the persisted state plus edge-triggered
/// logging flags (logged once per transition, not per cycle)
#[derive(Resource, Debug, Default)]
pub struct Supervisor {
    state: SupervisorState,
    override_logged: bool,
    shutdown_logged: bool,
    power_off_logged: bool,
}

impl Supervisor {
    /// Restore a supervisor from persisted state
    pub fn from_state(state: SupervisorState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// Install a manual override. `duration_minutes == 0` means indefinite.
    /// Validation happens at the service boundary; by the time we get here
    /// the temperature is in range and any expiry is in the future.
    pub fn set_override(&mut self, target_temp: f32, duration_minutes: u32, now: DateTime<Utc>) {
        let expires_at =
            (duration_minutes > 0).then(|| now + Duration::minutes(i64::from(duration_minutes)));
        self.state.manual_override = Some(OverrideState {
            target_temp,
            expires_at,
            created_at: now,
        });
        self.override_logged = false;
        info!(
            "🔒 Manual override set: {:.1}°C, {}",
            target_temp,
            match expires_at {
                Some(expiry) => format!("until {}", expiry.format("%Y-%m-%d %H:%M:%S")),
                None => "indefinite".to_string(),
            }
        );
    }

    /// Clear any manual override and resume automatic control
    pub fn clear_override(&mut self) {
        if self.state.manual_override.take().is_some() {
            info!("🔓 Manual override cleared, automatic control resumed");
        }
        self.override_logged = false;
    }

    /// Feed an occupancy reading. `None` (no sensor) counts as occupied.
    pub fn observe_occupancy(
        &mut self,
        reading: Option<bool>,
        now: DateTime<Utc>,
        config: &ComfortConfig,
    ) {
        let occupied = reading.unwrap_or(true);
        let was_shut_down = self.vacancy_mode(now, config) == Some(SupervisorMode::AutoShutdown);

        let previously_occupied = self.state.occupancy.occupied;
        self.state.occupancy.observe(occupied, now);

        // Returning after an auto-shutdown honours the configured start delay
        if occupied
            && !previously_occupied
            && was_shut_down
            && config.auto_start_delay_minutes > 0
        {
            let resume = now + Duration::minutes(i64::from(config.auto_start_delay_minutes));
            self.state.resume_not_before = Some(resume);
            info!(
                "👋 Occupancy returned after shutdown, control resumes at {}",
                resume.format("%H:%M:%S")
            );
        }
    }

    /// Feed the observed device power state. A power-off not commanded by
    /// ClimION latches manual-off; only a user power-on releases it.
    pub fn observe_device_power(&mut self, powered_on: bool, commanded_off_by_us: bool) {
        if !powered_on && !commanded_off_by_us && !self.state.user_powered_off {
            self.state.user_powered_off = true;
            if !self.power_off_logged {
                info!("⛔ Device was powered off manually, automatic control disabled");
                self.power_off_logged = true;
            }
        } else if powered_on && self.state.user_powered_off {
            self.state.user_powered_off = false;
            self.power_off_logged = false;
            info!("▶️ Device was powered on manually, automatic control re-enabled");
        }
    }

    /// Advance timers and return the mode in force at `now`
    pub fn tick(&mut self, now: DateTime<Utc>, config: &ComfortConfig) -> SupervisorMode {
        if self.state.cleanup_expired_override(now) {
            info!("⏰ Manual override expired, automatic control resumed");
            self.override_logged = false;
        }
        if let Some(resume) = self.state.resume_not_before
            && now >= resume
        {
            self.state.resume_not_before = None;
        }

        let mode = self.mode(now, config);
        match mode {
            SupervisorMode::ManualOverride if !self.override_logged => {
                info!("🔒 Manual override in force");
                self.override_logged = true;
            }
            SupervisorMode::AutoShutdown if !self.shutdown_logged => {
                info!(
                    "💤 Unoccupied for over {} minutes, shutting HVAC down",
                    config.auto_shutdown_minutes
                );
                self.shutdown_logged = true;
            }
            SupervisorMode::Automatic | SupervisorMode::UnoccupiedSetback => {
                self.shutdown_logged = false;
            }
            _ => {}
        }
        mode
    }

    /// Mode derived from the current state without mutating anything
    pub fn mode(&self, now: DateTime<Utc>, config: &ComfortConfig) -> SupervisorMode {
        if let Some(active) = &self.state.manual_override
            && active.is_active(now)
        {
            return SupervisorMode::ManualOverride;
        }

        if let Some(resume) = self.state.resume_not_before
            && now < resume
        {
            return SupervisorMode::AutoShutdown;
        }

        self.vacancy_mode(now, config)
            .unwrap_or(SupervisorMode::Automatic)
    }

    /// Vacancy-driven mode, `None` while occupied or below the setback delay
    fn vacancy_mode(&self, now: DateTime<Utc>, config: &ComfortConfig) -> Option<SupervisorMode> {
        let vacant = self.state.occupancy.vacant_minutes(now)?;
        if config.auto_shutdown_minutes > 0 && vacant >= i64::from(config.auto_shutdown_minutes) {
            Some(SupervisorMode::AutoShutdown)
        } else if vacant >= i64::from(config.setback_delay_minutes) {
            Some(SupervisorMode::UnoccupiedSetback)
        } else {
            None
        }
    }

    /// Gate a recommendation: rewrite it for override/shutdown states and
    /// enforce the manual power-off latch. The latch wins over everything.
    pub fn gate(
        &self,
        recommendation: &ActionRecommendation,
        mode: SupervisorMode,
    ) -> ActionRecommendation {
        if self.state.user_powered_off && recommendation.hvac_mode != HvacMode::Off {
            return ActionRecommendation {
                suppressed: true,
                reason: "device powered off by user, holding automatic control".to_string(),
                ..recommendation.clone()
            };
        }

        match mode {
            SupervisorMode::ManualOverride => {
                let target = self
                    .state
                    .manual_override
                    .as_ref()
                    .map(|o| o.target_temp)
                    .unwrap_or(recommendation.target_temp);
                ActionRecommendation {
                    target_temp: target,
                    natural_ventilation: false,
                    reason: "manual override active".to_string(),
                    ..recommendation.clone()
                }
            }
            SupervisorMode::AutoShutdown => ActionRecommendation {
                hvac_mode: HvacMode::Off,
                suppressed: false,
                natural_ventilation: false,
                reason: "auto shutdown: space unoccupied".to_string(),
                ..recommendation.clone()
            },
            SupervisorMode::Automatic | SupervisorMode::UnoccupiedSetback => {
                recommendation.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climion_types::FanSpeed;

    fn config() -> ComfortConfig {
        ComfortConfig {
            setback_delay_minutes: 30,
            auto_shutdown_minutes: 120,
            auto_start_delay_minutes: 0,
            ..Default::default()
        }
    }

    fn cooling_action() -> ActionRecommendation {
        ActionRecommendation {
            hvac_mode: HvacMode::Cool,
            fan_speed: FanSpeed::Mid,
            target_temp: 24.8,
            suppressed: false,
            low_confidence: false,
            natural_ventilation: false,
            reason: "above comfort band, cooling".to_string(),
        }
    }

    #[test]
    fn test_override_lifecycle() {
        let mut supervisor = Supervisor::default();
        let config = config();
        let now = Utc::now();

        supervisor.set_override(22.0, 60, now);

        // At t+30 the override pins the forwarded target
        let at_30 = now + Duration::minutes(30);
        let mode = supervisor.tick(at_30, &config);
        assert_eq!(mode, SupervisorMode::ManualOverride);
        let gated = supervisor.gate(&cooling_action(), mode);
        assert_eq!(gated.target_temp, 22.0);
        assert!(!gated.suppressed);

        // At t+61 the override has expired and automatic control resumes
        let at_61 = now + Duration::minutes(61);
        let mode = supervisor.tick(at_61, &config);
        assert_eq!(mode, SupervisorMode::Automatic);
        assert!(supervisor.state().manual_override.is_none());
        let gated = supervisor.gate(&cooling_action(), mode);
        assert_eq!(gated.target_temp, 24.8);
    }

    #[test]
    fn test_indefinite_override() {
        let mut supervisor = Supervisor::default();
        let config = config();
        let now = Utc::now();

        supervisor.set_override(21.0, 0, now);
        let much_later = now + Duration::days(30);
        assert_eq!(
            supervisor.tick(much_later, &config),
            SupervisorMode::ManualOverride
        );

        supervisor.clear_override();
        assert_eq!(supervisor.tick(much_later, &config), SupervisorMode::Automatic);
    }

    #[test]
    fn test_setback_then_shutdown() {
        let mut supervisor = Supervisor::default();
        let config = config();
        let now = Utc::now();

        supervisor.observe_occupancy(Some(false), now, &config);
        assert_eq!(supervisor.tick(now, &config), SupervisorMode::Automatic);
        assert_eq!(
            supervisor.tick(now + Duration::minutes(31), &config),
            SupervisorMode::UnoccupiedSetback
        );
        assert_eq!(
            supervisor.tick(now + Duration::minutes(121), &config),
            SupervisorMode::AutoShutdown
        );

        // Shutdown forwards an explicit off, not a suppression
        let gated = supervisor.gate(&cooling_action(), SupervisorMode::AutoShutdown);
        assert_eq!(gated.hvac_mode, HvacMode::Off);
        assert!(!gated.suppressed);

        // Occupancy returns: automatic control resumes immediately (no delay)
        let back = now + Duration::minutes(130);
        supervisor.observe_occupancy(Some(true), back, &config);
        assert_eq!(supervisor.tick(back, &config), SupervisorMode::Automatic);
    }

    #[test]
    fn test_auto_start_delay() {
        let mut supervisor = Supervisor::default();
        let config = ComfortConfig {
            auto_start_delay_minutes: 10,
            ..config()
        };
        let now = Utc::now();

        supervisor.observe_occupancy(Some(false), now, &config);
        let shutdown_at = now + Duration::minutes(121);
        assert_eq!(
            supervisor.tick(shutdown_at, &config),
            SupervisorMode::AutoShutdown
        );

        let back = now + Duration::minutes(125);
        supervisor.observe_occupancy(Some(true), back, &config);
        // Still held off during the start delay
        assert_eq!(supervisor.tick(back, &config), SupervisorMode::AutoShutdown);
        assert_eq!(
            supervisor.tick(back + Duration::minutes(11), &config),
            SupervisorMode::Automatic
        );
    }

    #[test]
    fn test_manual_power_off_blocks_everything() {
        let mut supervisor = Supervisor::default();
        let config = config();
        let now = Utc::now();

        // Device observed off without ClimION having commanded it
        supervisor.observe_device_power(false, false);
        assert!(supervisor.state().user_powered_off);

        // Even a comfort violation must not turn the device back on
        let mode = supervisor.tick(now, &config);
        let gated = supervisor.gate(&cooling_action(), mode);
        assert!(gated.suppressed);

        // Occupancy changes do not release the latch either
        supervisor.observe_occupancy(Some(false), now, &config);
        supervisor.observe_occupancy(Some(true), now + Duration::minutes(200), &config);
        let mode = supervisor.tick(now + Duration::minutes(200), &config);
        let gated = supervisor.gate(&cooling_action(), mode);
        assert!(gated.suppressed);

        // User powers the device back on: control resumes
        supervisor.observe_device_power(true, false);
        let gated = supervisor.gate(&cooling_action(), mode);
        assert!(!gated.suppressed);
    }

    #[test]
    fn test_commanded_off_does_not_latch() {
        let mut supervisor = Supervisor::default();
        supervisor.observe_device_power(false, true);
        assert!(!supervisor.state().user_powered_off);
    }

    #[test]
    fn test_power_off_wins_over_override() {
        let mut supervisor = Supervisor::default();
        let config = config();
        let now = Utc::now();

        supervisor.set_override(22.0, 60, now);
        supervisor.observe_device_power(false, false);

        let mode = supervisor.tick(now + Duration::minutes(5), &config);
        assert_eq!(mode, SupervisorMode::ManualOverride);
        let gated = supervisor.gate(&cooling_action(), mode);
        assert!(gated.suppressed);
    }

    #[test]
    fn test_off_recommendation_passes_power_latch() {
        let mut supervisor = Supervisor::default();
        supervisor.observe_device_power(false, false);

        let off = ActionRecommendation {
            hvac_mode: HvacMode::Off,
            ..cooling_action()
        };
        let gated = supervisor.gate(&off, SupervisorMode::Automatic);
        assert!(!gated.suppressed);
    }

    #[test]
    fn test_shutdown_disabled_when_zero() {
        let mut supervisor = Supervisor::default();
        let config = ComfortConfig {
            auto_shutdown_minutes: 0,
            ..config()
        };
        let now = Utc::now();

        supervisor.observe_occupancy(Some(false), now, &config);
        // Long vacancy still only widens the band
        assert_eq!(
            supervisor.tick(now + Duration::days(2), &config),
            SupervisorMode::UnoccupiedSetback
        );
    }
}
