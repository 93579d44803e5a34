// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service configuration loaded from environment variables.
//!
//! Loaded once at startup. Cloud Run injects everything as plain env vars;
//! a `.env` file is honored for local development.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID
    pub gcp_project_id: String,
    /// Cloud Storage bucket holding user uploads (`users/<uid>/...`)
    pub storage_bucket: String,
    /// Public URL of this service; push deliveries use it as the OIDC audience
    pub service_url: String,
    /// Service account the event trigger signs its push requests as
    pub trigger_service_account: String,
    /// Server port
    pub port: u16,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            storage_bucket: "test-project.firebasestorage.app".to_string(),
            service_url: "http://localhost:8080".to_string(),
            trigger_service_account: default_trigger_account("test-project"),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => 8080,
        };

        Ok(Self {
            storage_bucket: env::var("STORAGE_BUCKET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STORAGE_BUCKET"))?,
            service_url: env::var("SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            trigger_service_account: env::var("TRIGGER_SERVICE_ACCOUNT")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| default_trigger_account(&gcp_project_id)),
            gcp_project_id,
            port,
        })
    }
}

fn default_trigger_account(project_id: &str) -> String {
    format!("cleanup-trigger@{}.iam.gserviceaccount.com", project_id)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}
