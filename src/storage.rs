// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage layer (Cloud Storage via `object_store`).
//!
//! User uploads live under `users/<uid>/`. Prefix matching is by path
//! segment, so `users/abc` never reaches into `users/abcd/`.

use crate::db::collections;
use crate::error::AppError;
use futures_util::{stream, StreamExt, TryStreamExt};
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;

/// Connect to the Cloud Storage bucket holding user files.
///
/// Credentials come from the environment (`GOOGLE_APPLICATION_CREDENTIALS`
/// or the Cloud Run metadata server).
pub fn connect_bucket(bucket: &str) -> Result<Arc<dyn ObjectStore>, AppError> {
    let store = object_store::gcp::GoogleCloudStorageBuilder::from_env()
        .with_bucket_name(bucket)
        .build()
        .map_err(|e| AppError::Storage(format!("Failed to create GCS store: {}", e)))?;

    tracing::info!(bucket, "Connected to Cloud Storage");
    Ok(Arc::new(store))
}

/// Storage prefix owned by a user: `users/<uid>/`.
///
/// The uid is taken verbatim, matching the object names upload clients
/// write. Building the path from parts would percent-encode characters
/// such as `~` or `#` and list a prefix that holds nothing.
pub fn user_prefix(uid: &str) -> Result<ObjectPath, AppError> {
    let invalid = |reason: String| {
        AppError::BadRequest(format!("uid {:?} is not a valid object prefix: {}", uid, reason))
    };

    let prefix = ObjectPath::parse(format!("{}/{}", collections::USERS, uid))
        .map_err(|e| invalid(e.to_string()))?;
    // `users/` parses to `users`; anything but exactly two segments would
    // widen or shift the prefix.
    if prefix.parts().count() != 2 {
        return Err(invalid("expected a single path segment".to_string()));
    }
    Ok(prefix)
}

/// Delete every object beneath `prefix`.
///
/// The prefix is listed in full before anything is deleted. Objects that
/// vanish between listing and deletion count as deleted. If any other
/// delete fails, the remaining deletes are still attempted and the step
/// reports an error afterwards.
///
/// Returns the number of objects removed; an empty prefix returns `Ok(0)`.
pub async fn delete_prefix(store: &dyn ObjectStore, prefix: &ObjectPath) -> Result<usize, AppError> {
    let locations: Vec<ObjectPath> = store
        .list(Some(prefix))
        .map_ok(|meta| meta.location)
        .try_collect()
        .await?;

    if locations.is_empty() {
        return Ok(0);
    }

    let total = locations.len();
    tracing::debug!(prefix = %prefix, total, "Deleting objects under prefix");

    let mut results = store.delete_stream(stream::iter(locations.into_iter().map(Ok)).boxed());

    let mut failed = 0usize;
    let mut first_error: Option<object_store::Error> = None;
    while let Some(result) = results.next().await {
        match result {
            Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => {
                failed += 1;
                tracing::warn!(prefix = %prefix, error = %e, "Object delete failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        None => Ok(total),
        Some(e) => Err(AppError::Storage(format!(
            "{} of {} objects under {} could not be deleted: {}",
            failed, total, prefix, e
        ))),
    }
}
