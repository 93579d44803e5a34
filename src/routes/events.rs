// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event receiver routes.
//!
//! Called by the identity provider's deletion trigger (via Eventarc or a
//! Pub/Sub push subscription), never by users. Any delivery that names a
//! valid uid is acknowledged with 200 once cleanup has run, whatever the
//! per-step outcome, so the trigger never retries a partial cleanup.

use crate::error::Result;
use crate::models::UserDeletedEvent;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Event routes (auth applied by the caller).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/user-deleted", post(user_deleted))
}

/// Cascade-delete a deleted account's data.
async fn user_deleted(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    let event = UserDeletedEvent::from_slice(&body)
        .inspect_err(|e| tracing::warn!(error = %e, "Rejected user deletion event"))?;
    let from_pubsub = event.is_pubsub_push();

    let deletion = match event.into_deletion() {
        Ok(deletion) => deletion,
        // Pub/Sub redelivers anything but 2xx, so a bad message is dropped here.
        Err(e) if from_pubsub => {
            tracing::error!(error = %e, "Discarding undeliverable Pub/Sub deletion message");
            return Ok(StatusCode::OK.into_response());
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected user deletion event");
            return Err(e);
        }
    };

    tracing::info!(
        uid = %deletion.uid,
        event_id = deletion.event_id.as_deref().unwrap_or("<none>"),
        "Received user deletion event"
    );

    let report = state.cleanup.cleanup_user(&deletion.uid).await;
    Ok(Json(report).into_response())
}
