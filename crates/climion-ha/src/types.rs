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

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::HaError;

/// An entity state as returned by `/api/states/<entity_id>`
#[derive(Debug, Clone, Deserialize)]
pub struct HaEntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub last_updated: String,
}

impl HaEntityState {
    /// Whether the state carries a usable value
    pub fn is_available(&self) -> bool {
        !matches!(self.state.as_str(), "unavailable" | "unknown" | "")
    }

    /// Parse the state as a float, mapping unparseable states to a typed error
    pub fn state_as_f32(&self) -> Result<f32, HaError> {
        self.state
            .parse::<f32>()
            .map_err(|_| HaError::NonNumericState {
                entity_id: self.entity_id.clone(),
                state: self.state.clone(),
            })
    }

    /// Read a float attribute, if present and numeric
    pub fn attribute_f32(&self, name: &str) -> Option<f32> {
        self.attributes
            .get(name)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
    }

    /// Read a string attribute, if present
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Read a list-of-strings attribute (e.g. `hvac_modes`, `fan_modes`)
    pub fn attribute_str_list(&self, name: &str) -> Vec<String> {
        self.attributes
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A raw history row as returned by `/api/history/period`
#[derive(Debug, Clone, Deserialize)]
pub struct HaHistoryState {
    pub state: String,
    pub last_updated: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(state: &str, attributes: Value) -> HaEntityState {
        serde_json::from_value(json!({
            "entity_id": "climate.test",
            "state": state,
            "attributes": attributes,
            "last_updated": "2025-10-02T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_availability() {
        assert!(entity("cool", json!({})).is_available());
        assert!(!entity("unavailable", json!({})).is_available());
        assert!(!entity("unknown", json!({})).is_available());
    }

    #[test]
    fn test_state_as_f32() {
        assert_eq!(entity("21.5", json!({})).state_as_f32().unwrap(), 21.5);
        assert!(matches!(
            entity("heat", json!({})).state_as_f32(),
            Err(HaError::NonNumericState { .. })
        ));
    }

    #[test]
    fn test_attribute_accessors() {
        let e = entity(
            "cool",
            json!({
                "temperature": 24.0,
                "fan_mode": "low",
                "hvac_modes": ["off", "cool", "heat"],
            }),
        );
        assert_eq!(e.attribute_f32("temperature"), Some(24.0));
        assert_eq!(e.attribute_str("fan_mode"), Some("low"));
        assert_eq!(
            e.attribute_str_list("hvac_modes"),
            vec!["off", "cool", "heat"]
        );
        assert!(e.attribute_str_list("fan_modes").is_empty());
    }
}
