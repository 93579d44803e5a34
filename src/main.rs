// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CareerCopilot cleanup service
//!
//! Deletes a user's Firestore data and Cloud Storage files when the
//! identity provider reports the account deleted.

use careercopilot_cleanup::{
    config::Config,
    db::FirestoreDb,
    services::{CleanupService, PushVerifier},
    storage, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting CareerCopilot cleanup service");

    // Backend handles live for the whole process and are shared by every request
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");
    let bucket =
        storage::connect_bucket(&config.storage_bucket).expect("Failed to connect to Cloud Storage");

    let cleanup = CleanupService::new(Arc::new(db), bucket);
    let push_verifier = PushVerifier::new(&config).expect("Failed to initialize push verifier");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        cleanup,
        push_verifier,
    });

    // Build router
    let app = careercopilot_cleanup::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "careercopilot_cleanup=debug,info".into()),
        )
        .with(format)
        .init();
}
