// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cascade cleanup of a deleted account's data.
//!
//! Two independent steps, run concurrently:
//! - recursive delete of the `users/<uid>` document subtree
//! - delete of every Cloud Storage object under `users/<uid>/`
//!
//! Cleanup is best effort. Each step's failure is logged and recorded in
//! the report, never returned: the deletion event is not redelivered, so
//! there is nobody upstream to hand an error to.

use crate::db::{self, DocumentStore};
use crate::models::{CleanupReport, StepOutcome};
use crate::storage;
use object_store::ObjectStore;
use std::sync::Arc;

/// Runs cleanup against injected backend handles.
#[derive(Clone)]
pub struct CleanupService {
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
}

impl CleanupService {
    pub fn new(documents: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { documents, objects }
    }

    /// Remove all persisted data for `uid`. Always completes.
    pub async fn cleanup_user(&self, uid: &str) -> CleanupReport {
        tracing::info!(uid = %uid, "Starting cleanup for user");

        let (documents, storage) = tokio::join!(self.delete_documents(uid), self.delete_files(uid));

        let report = CleanupReport {
            uid: uid.to_string(),
            documents,
            storage,
        };

        if report.is_clean() {
            tracing::info!(uid = %uid, "Cleanup finished");
        } else {
            tracing::warn!(
                uid = %uid,
                documents = ?report.documents,
                storage = ?report.storage,
                "Cleanup finished with failures; residual data may remain"
            );
        }

        report
    }

    /// Step A: recursive delete of the user's document subtree.
    pub async fn delete_documents(&self, uid: &str) -> StepOutcome {
        let root = db::user_document(uid);

        match db::recursive_delete(self.documents.as_ref(), &root).await {
            Ok(0) => {
                tracing::info!(uid = %uid, "No Firestore data to delete for user");
                StepOutcome::Absent
            }
            Ok(count) => {
                tracing::info!(uid = %uid, count, "Successfully deleted Firestore data for user");
                StepOutcome::Deleted { count }
            }
            Err(e) => {
                tracing::error!(uid = %uid, error = %e, "Error deleting Firestore data for user");
                StepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Step B: delete every stored object under the user's prefix.
    pub async fn delete_files(&self, uid: &str) -> StepOutcome {
        let deleted = match storage::user_prefix(uid) {
            Ok(prefix) => storage::delete_prefix(self.objects.as_ref(), &prefix).await,
            Err(e) => Err(e),
        };

        match deleted {
            Ok(0) => {
                tracing::info!(uid = %uid, "No Cloud Storage files to delete for user");
                StepOutcome::Absent
            }
            Ok(count) => {
                tracing::info!(
                    uid = %uid,
                    count,
                    "Successfully deleted Cloud Storage files for user"
                );
                StepOutcome::Deleted { count }
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(uid = %uid, "No Cloud Storage files to delete for user");
                StepOutcome::Absent
            }
            Err(e) => {
                tracing::error!(
                    uid = %uid,
                    error = %e,
                    "Error deleting Cloud Storage files for user"
                );
                StepOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
