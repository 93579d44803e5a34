// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory [`DocumentStore`] for tests and local runs without Firestore.
//!
//! Documents are stored as a flat set of paths. Sub-collections and
//! missing parent documents are implied by the paths beneath them, which
//! is how Firestore itself behaves.

use crate::db::{CollectionPath, DocumentPath, DocumentStore, ListedDocument};
use crate::error::AppError;
use std::collections::BTreeSet;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    documents: BTreeSet<String>,
    deleted: Vec<DocumentPath>,
    failure: Option<String>,
}

/// Document store backed by a process-local set of paths.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or overwrite) the document at `path`.
    pub fn insert(&self, path: &str) {
        self.lock().documents.insert(path.to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().documents.contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().documents.is_empty()
    }

    /// Number of stored documents at or beneath `root`.
    pub fn count_under(&self, root: &str) -> usize {
        let nested = format!("{}/", root);
        self.lock()
            .documents
            .iter()
            .filter(|p| p.as_str() == root || p.starts_with(&nested))
            .count()
    }

    /// Every path passed to `delete_documents`, in order.
    pub fn deletion_log(&self) -> Vec<DocumentPath> {
        self.lock().deleted.clone()
    }

    /// Make every subsequent call fail with a database error.
    pub fn fail_with(&self, message: &str) {
        self.lock().failure = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        self.lock().failure = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-update; the set is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(inner: &Inner) -> Result<(), AppError> {
        match &inner.failure {
            Some(message) => Err(AppError::Database(message.clone())),
            None => Ok(()),
        }
    }

    /// Distinct first segments of every stored path strictly beneath `parent`.
    ///
    /// Paths for one child need not be adjacent in the set (`a`, `a-b`,
    /// `a/x` sort in that order), hence the set rather than `dedup`.
    fn child_segments(inner: &Inner, parent: &str) -> Vec<String> {
        let prefix = format!("{}/", parent);
        inner
            .documents
            .range(prefix.clone()..)
            .take_while(|p| p.starts_with(&prefix))
            .filter_map(|p| p[prefix.len()..].split('/').next())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn exists(&self, document: &DocumentPath) -> Result<bool, AppError> {
        let inner = self.lock();
        Self::check(&inner)?;
        Ok(inner.documents.contains(document.as_str()))
    }

    async fn list_collection_ids(&self, document: &DocumentPath) -> Result<Vec<String>, AppError> {
        let inner = self.lock();
        Self::check(&inner)?;
        Ok(Self::child_segments(&inner, document.as_str()))
    }

    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<ListedDocument>, AppError> {
        let inner = self.lock();
        Self::check(&inner)?;
        Ok(Self::child_segments(&inner, collection.as_str())
            .into_iter()
            .map(|id| {
                let exists = inner.documents.contains(collection.doc(&id).as_str());
                ListedDocument { id, exists }
            })
            .collect())
    }

    async fn delete_documents(&self, documents: &[DocumentPath]) -> Result<usize, AppError> {
        let mut inner = self.lock();
        Self::check(&inner)?;
        for document in documents {
            inner.documents.remove(document.as_str());
            inner.deleted.push(document.clone());
        }
        Ok(documents.len())
    }
}
