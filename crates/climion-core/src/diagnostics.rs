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

//! Diagnostics bridge.
//!
//! Each cycle the control loop publishes its computed state; subscribers
//! (status surfaces, tests) receive it over channels. Subscribers render,
//! the core never mutates anything on their behalf.

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::comfort::ComfortBand;
use climion_types::{ActionRecommendation, OverrideState, SupervisorMode};

/// Snapshot of the control loop's computed state for one cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub timestamp: DateTime<Utc>,

    /// Comfort band for this cycle, `None` while inputs are unavailable
    pub comfort: Option<ComfortBand>,

    /// The gated recommendation forwarded (or suppressed) this cycle
    pub recommendation: Option<ActionRecommendation>,

    pub supervisor_mode: SupervisorMode,

    /// Active manual override, if any
    pub manual_override: Option<OverrideState>,

    /// Current 7-day outdoor running mean (°C)
    pub outdoor_running_mean: Option<f32>,

    /// False when a required sensor reading was missing this cycle
    pub inputs_available: bool,
}

/// Resource fanning diagnostics reports out to registered subscribers
#[derive(Resource, Default)]
pub struct DiagnosticsBridge {
    subscribers: RwLock<Vec<crossbeam_channel::Sender<DiagnosticsReport>>>,
}

impl std::fmt::Debug for DiagnosticsBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsBridge")
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

impl DiagnosticsBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its receiving end
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<DiagnosticsReport> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.write().push(tx);
        rx
    }

    /// Publish a report to all live subscribers, dropping disconnected ones
    pub fn publish(&self, report: &DiagnosticsReport) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(report.clone()).is_ok());
        debug!(
            "📊 Diagnostics published to {} subscriber(s)",
            subscribers.len()
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DiagnosticsReport {
        DiagnosticsReport {
            timestamp: Utc::now(),
            comfort: None,
            recommendation: None,
            supervisor_mode: SupervisorMode::Automatic,
            manual_override: None,
            outdoor_running_mean: Some(21.0),
            inputs_available: true,
        }
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bridge = DiagnosticsBridge::new();
        let rx1 = bridge.subscribe();
        let rx2 = bridge.subscribe();

        bridge.publish(&report());

        assert_eq!(rx1.try_recv().unwrap().outdoor_running_mean, Some(21.0));
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_disconnected_subscribers_are_dropped() {
        let bridge = DiagnosticsBridge::new();
        let rx = bridge.subscribe();
        drop(rx);
        let live = bridge.subscribe();

        bridge.publish(&report());

        assert_eq!(bridge.subscriber_count(), 1);
        assert!(live.try_recv().is_ok());
    }
}
