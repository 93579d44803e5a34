// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-deletion event payloads.
//!
//! The identity provider's deletion hook can reach us in several shapes
//! depending on how the trigger is wired:
//! - the bare user record (`{"uid": ...}`), e.g. a CloudEvent in binary mode
//! - an envelope with the record under `data`: background-function events
//!   (`{"data": ..., "context": {...}}`) and structured CloudEvents
//!   (`{"id": ..., "type": ..., "data": ...}`)
//! - a Pub/Sub push envelope whose base64 `message.data` holds either of
//!   the above

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

/// Longest uid the identity provider issues.
pub const MAX_UID_LEN: usize = 128;

/// The deleted account, as reported by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    /// Base64-encoded JSON event.
    pub data: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Any accepted shape of a user-deletion event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserDeletedEvent {
    PubSubPush {
        message: PubSubMessage,
        #[serde(default)]
        subscription: Option<String>,
    },
    Envelope {
        data: UserRecord,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        context: Option<EventContext>,
    },
    Record(UserRecord),
}

/// A validated deletion request extracted from an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDeletion {
    pub uid: String,
    /// Delivery identifier for log correlation, when the envelope has one.
    pub event_id: Option<String>,
}

impl UserDeletedEvent {
    /// Parse a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("unrecognized deletion event: {}", e)))
    }

    /// Whether this arrived as a Pub/Sub push delivery.
    pub fn is_pubsub_push(&self) -> bool {
        matches!(self, UserDeletedEvent::PubSubPush { .. })
    }

    /// Unwrap the envelope and validate the uid.
    pub fn into_deletion(self) -> Result<UserDeletion, AppError> {
        let deletion = match self {
            UserDeletedEvent::PubSubPush { message, .. } => {
                let decoded = BASE64.decode(message.data.trim()).map_err(|e| {
                    AppError::BadRequest(format!("Pub/Sub message data is not base64: {}", e))
                })?;
                let inner = match Self::from_slice(&decoded)? {
                    UserDeletedEvent::PubSubPush { .. } => {
                        return Err(AppError::BadRequest(
                            "nested Pub/Sub envelope".to_string(),
                        ))
                    }
                    other => other.into_deletion()?,
                };
                UserDeletion {
                    event_id: inner.event_id.or(message.message_id),
                    ..inner
                }
            }
            UserDeletedEvent::Envelope { data, id, context } => UserDeletion {
                uid: data.uid,
                event_id: id.or_else(|| context.and_then(|c| c.event_id)),
            },
            UserDeletedEvent::Record(record) => UserDeletion {
                uid: record.uid,
                event_id: None,
            },
        };

        validate_uid(&deletion.uid)?;
        Ok(deletion)
    }
}

/// Reject identifiers that cannot safely address a single user's data.
///
/// The uid becomes a path segment in both Firestore and Cloud Storage, so
/// anything that could widen or escape `users/<uid>` is refused.
pub fn validate_uid(uid: &str) -> Result<(), AppError> {
    if uid.trim().is_empty() {
        return Err(AppError::BadRequest("uid is empty".to_string()));
    }
    if uid.len() > MAX_UID_LEN {
        return Err(AppError::BadRequest(format!(
            "uid longer than {} bytes",
            MAX_UID_LEN
        )));
    }
    if uid.contains('/') || uid == "." || uid == ".." {
        return Err(AppError::BadRequest(format!("uid {:?} is not a valid path segment", uid)));
    }
    if uid.chars().any(char::is_control) {
        return Err(AppError::BadRequest("uid contains control characters".to_string()));
    }
    Ok(())
}
