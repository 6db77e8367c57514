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
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use climion_types::{ActionRecommendation, DeviceState, SensorSnapshot};

/// A single historical sensor data point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryDataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f32,
}

/// Generic data source for the climate pipeline.
/// Business logic uses this trait, never knows about HA/HTTP details.
#[async_trait]
pub trait ClimateDataSource: Send + Sync {
    /// Read a fresh sensor snapshot. Required sensors (indoor/outdoor
    /// temperature) missing is an error; optional sensors come back as `None`.
    async fn read_snapshot(&self) -> Result<SensorSnapshot>;

    /// Read the wrapped climate entity's current state and capabilities
    async fn read_device_state(&self) -> Result<DeviceState>;

    /// Fetch outdoor temperature history for seeding the running mean
    async fn read_outdoor_history(&self, days: i64) -> Result<Vec<HistoryDataPoint>>;

    /// Map the recommendation onto the device's capability set and execute it
    async fn apply_action(&self, action: &ActionRecommendation) -> Result<()>;

    /// Check if the data source is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}
