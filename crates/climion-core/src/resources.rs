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
use bevy_ecs::prelude::{Component, Resource};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::persistence::ControlStatePersistence;
use crate::traits::{ClimateDataSource, HistoryDataPoint};
use climion_types::{ActionRecommendation, DeviceState, HvacMode, SensorSnapshot};

/// Wrapper resource for the climate data source
#[derive(Resource, Clone)]
pub struct ClimateDataSourceResource(pub Arc<dyn ClimateDataSource>);

impl std::fmt::Debug for ClimateDataSourceResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ClimateDataSourceResource")
            .field(&self.0.name())
            .finish()
    }
}

/// Wrapper resource for the persistence manager
#[derive(Resource, Debug, Clone)]
pub struct PersistenceResource(pub ControlStatePersistence);

/// Component marking the controlled climate device entity
#[derive(Component, Debug, Clone)]
pub struct ClimateDevice {
    pub name: String,
    pub entity_id: String,
}

/// Synchronous facade over the async data source for use inside ECS systems.
/// Evaluation cycles are short and infrequent, so blocking on the runtime
/// handle here is acceptable.
#[derive(Resource)]
pub struct SnapshotReader {
    source: Arc<dyn ClimateDataSource>,
}

impl std::fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("source", &self.source.name())
            .finish()
    }
}

impl SnapshotReader {
    pub fn new(source: Arc<dyn ClimateDataSource>) -> Self {
        Self { source }
    }

    /// Read a fresh sensor snapshot
    pub fn read_snapshot(&self) -> Result<SensorSnapshot> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        handle.block_on(async move { source.read_snapshot().await })
    }

    /// Read the device's current state and capabilities
    pub fn read_device_state(&self) -> Result<DeviceState> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        handle.block_on(async move { source.read_device_state().await })
    }

    /// Fetch outdoor temperature history for running-mean seeding
    pub fn read_outdoor_history(&self, days: i64) -> Result<Vec<HistoryDataPoint>> {
        let source = self.source.clone();
        let handle = tokio::runtime::Handle::current();
        handle.block_on(async move { source.read_outdoor_history(days).await })
    }
}

/// Fire-and-forget action writer. Device writes happen on the tokio runtime
/// so the ECS loop never blocks on HTTP.
#[derive(Resource)]
pub struct AsyncActionWriter {
    source: Arc<dyn ClimateDataSource>,
}

impl std::fmt::Debug for AsyncActionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncActionWriter")
            .field("source", &self.source.name())
            .finish()
    }
}

impl AsyncActionWriter {
    pub fn new(source: Arc<dyn ClimateDataSource>) -> Self {
        Self { source }
    }

    /// Apply an action asynchronously (fire-and-forget)
    pub fn apply_async(&self, action: ActionRecommendation) {
        let source = self.source.clone();
        tokio::spawn(async move {
            match source.apply_action(&action).await {
                Ok(()) => {
                    tracing::info!(
                        "✅ Applied action: {} @ {:.1}°C, fan {}",
                        action.hvac_mode,
                        action.target_temp,
                        action.fan_speed
                    );
                }
                Err(e) => {
                    tracing::error!("❌ Failed to apply action: {e:#}");
                }
            }
        });
    }
}

/// Timer resource controlling evaluation cycle frequency
#[derive(Resource)]
pub struct CycleTimer {
    last_run: parking_lot::Mutex<std::time::Instant>,
    interval: Duration,
}

impl std::fmt::Debug for CycleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleTimer")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl CycleTimer {
    /// Create a new cycle timer. The first check fires immediately.
    pub fn new(interval_secs: u64) -> Self {
        let interval = Duration::from_secs(interval_secs);
        Self {
            last_run: parking_lot::Mutex::new(std::time::Instant::now() - interval),
            interval,
        }
    }

    /// Check if it's time for an evaluation cycle
    pub fn should_run(&self) -> bool {
        self.last_run.lock().elapsed() >= self.interval
    }

    /// Mark that a cycle has run
    pub fn mark_run(&self) {
        *self.last_run.lock() = std::time::Instant::now();
    }
}

/// Previous (ungated) recommendation, kept for hysteresis comparison
#[derive(Resource, Debug, Clone, Default)]
pub struct LastRecommendation(pub Option<ActionRecommendation>);

/// The last command actually forwarded to the device
#[derive(Resource, Debug, Clone, Default)]
pub struct LastCommand {
    pub action: Option<ActionRecommendation>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl LastCommand {
    pub fn record(&mut self, action: ActionRecommendation, now: DateTime<Utc>) {
        self.action = Some(action);
        self.sent_at = Some(now);
    }

    /// Whether the most recent command ClimION sent turned the device off.
    /// Used to tell our own power-off apart from a manual one.
    pub fn commanded_off(&self) -> bool {
        self.action
            .as_ref()
            .is_some_and(|a| a.hvac_mode == HvacMode::Off)
    }

    /// Whether enough time has passed since the last device write
    pub fn can_send(&self, now: DateTime<Utc>, min_interval_secs: u64) -> bool {
        match self.sent_at {
            Some(sent) => (now - sent).num_seconds() >= min_interval_secs as i64,
            None => true,
        }
    }
}

/// Flag set by the force-recalculate service, consumed by the control loop
#[derive(Resource, Debug, Clone, Default)]
pub struct ForceRecalculate(pub bool);
