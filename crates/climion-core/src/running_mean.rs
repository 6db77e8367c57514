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

//! Outdoor temperature history and its 7-day running mean.
//!
//! The mean is an equal-weight arithmetic mean over the retained window.
//! Sampling intervals may be irregular; re-applying a sample with a
//! timestamp already present replaces it, so replays are idempotent.

use bevy_ecs::prelude::Resource;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Days of outdoor history retained for the running mean
pub const HISTORY_WINDOW_DAYS: i64 = 7;

/// A single outdoor temperature sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutdoorSample {
    pub timestamp: DateTime<Utc>,
    pub temp: f32,
}

/// Resource storing the bounded outdoor temperature history (oldest first)
#[derive(Resource, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutdoorHistory {
    samples: VecDeque<OutdoorSample>,
}

impl OutdoorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incorporate a sample and return the running mean over the retained
    /// window. Samples older than 7 days before the newest timestamp are
    /// pruned; a duplicate timestamp replaces the stored value.
    pub fn record(&mut self, timestamp: DateTime<Utc>, temp: f32) -> f32 {
        if let Some(existing) = self
            .samples
            .iter_mut()
            .find(|s| s.timestamp == timestamp)
        {
            existing.temp = temp;
        } else {
            // Keep the deque ordered by timestamp even for late arrivals
            let position = self
                .samples
                .iter()
                .position(|s| s.timestamp > timestamp)
                .unwrap_or(self.samples.len());
            self.samples
                .insert(position, OutdoorSample { timestamp, temp });
        }

        self.prune();
        // Non-empty by construction
        self.mean().unwrap_or(temp)
    }

    /// Equal-weight arithmetic mean over the retained window, `None` when
    /// no history is available (cold start)
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f32 = self.samples.iter().map(|s| s.temp).sum();
        Some(sum / self.samples.len() as f32)
    }

    /// Drop samples older than the window, measured from the newest sample
    fn prune(&mut self) {
        let Some(newest) = self.samples.back().map(|s| s.timestamp) else {
            return;
        };
        let cutoff = newest - Duration::days(HISTORY_WINDOW_DAYS);
        while let Some(front) = self.samples.front() {
            if front.timestamp < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the newest retained sample
    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.samples.back().map(|s| s.timestamp)
    }

    /// Clear all history (reset service)
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Samples in the retained window, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &OutdoorSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_mean_of_identical_samples() {
        let mut history = OutdoorHistory::new();
        let start = t0();
        for hour in 0..48 {
            let mean = history.record(start + Duration::hours(hour), 21.5);
            assert_eq!(mean, 21.5);
        }
    }

    #[test]
    fn test_cold_start_falls_back_to_first_sample() {
        let mut history = OutdoorHistory::new();
        assert_eq!(history.mean(), None);
        assert_eq!(history.record(t0(), 17.25), 17.25);
    }

    #[test]
    fn test_prunes_samples_older_than_window() {
        let mut history = OutdoorHistory::new();
        let start = t0();

        history.record(start, 10.0);
        history.record(start + Duration::days(3), 20.0);
        // Pushing the window forward 8 days drops both earlier samples
        history.record(start + Duration::days(8), 30.0);

        assert_eq!(history.len(), 2); // day-3 sample is 5 days old, retained
        let cutoff = start + Duration::days(1);
        assert!(history.samples().all(|s| s.timestamp >= cutoff));
    }

    #[test]
    fn test_never_retains_older_than_seven_days() {
        let mut history = OutdoorHistory::new();
        let start = t0();
        for day in 0..30 {
            history.record(start + Duration::days(day), day as f32);
            let newest = history.newest().unwrap();
            let limit = newest - Duration::days(HISTORY_WINDOW_DAYS);
            assert!(history.samples().all(|s| s.timestamp >= limit));
        }
        // 7-day window over daily samples keeps 8 entries (inclusive cutoff)
        assert_eq!(history.len(), 8);
    }

    #[test]
    fn test_duplicate_timestamp_is_idempotent() {
        let mut history = OutdoorHistory::new();
        let start = t0();
        history.record(start, 15.0);
        history.record(start + Duration::hours(1), 17.0);

        let mean_once = history.record(start + Duration::hours(2), 19.0);
        let mean_again = history.record(start + Duration::hours(2), 19.0);

        assert_eq!(history.len(), 3);
        assert_eq!(mean_once, mean_again);
        assert_eq!(mean_once, (15.0 + 17.0 + 19.0) / 3.0);
    }

    #[test]
    fn test_duplicate_timestamp_replaces_value() {
        let mut history = OutdoorHistory::new();
        let start = t0();
        history.record(start, 15.0);
        let mean = history.record(start, 21.0);
        assert_eq!(history.len(), 1);
        assert_eq!(mean, 21.0);
    }

    #[test]
    fn test_irregular_intervals() {
        let mut history = OutdoorHistory::new();
        let start = t0();
        history.record(start, 10.0);
        history.record(start + Duration::minutes(7), 20.0);
        history.record(start + Duration::hours(13), 30.0);

        assert_eq!(history.mean(), Some(20.0));
    }

    #[test]
    fn test_out_of_order_insertion_keeps_ordering() {
        let mut history = OutdoorHistory::new();
        let start = t0();
        history.record(start + Duration::hours(2), 20.0);
        history.record(start, 10.0);

        let timestamps: Vec<_> = history.samples().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![start, start + Duration::hours(2)]);
    }

    #[test]
    fn test_clear() {
        let mut history = OutdoorHistory::new();
        history.record(t0(), 20.0);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.mean(), None);
    }
}
