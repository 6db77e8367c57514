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

use thiserror::Error;

/// Errors from the Home Assistant REST API layer
#[derive(Debug, Error)]
pub enum HaError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("authentication failed - check the access token")]
    AuthenticationFailed,

    #[error("HA API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("service call '{service}' failed: {reason}")]
    ServiceCallFailed { service: String, reason: String },

    #[error("entity {entity_id} state '{state}' is not numeric")]
    NonNumericState { entity_id: String, state: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

pub type HaResult<T> = Result<T, HaError>;
