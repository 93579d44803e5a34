// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Push-delivery authentication middleware for `/events/*` routes.

use crate::services::push_auth::PushAuthError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Require a valid push OIDC token from the trigger service account.
pub async fn require_push_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request.headers().get(header::AUTHORIZATION);

    let principal = state
        .push_verifier
        .verify(auth_header)
        .await
        .map_err(|err| match err {
            PushAuthError::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Blocked event delivery: invalid OIDC token");
                StatusCode::FORBIDDEN
            }
            PushAuthError::KeysUnavailable(reason) => {
                tracing::error!(reason = %reason, "Push token verification transient failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    tracing::debug!(
        email = %principal.email,
        subject = %principal.subject,
        "Push OIDC verification succeeded"
    );

    Ok(next.run(request).await)
}
