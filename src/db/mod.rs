// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore).
//!
//! Cleanup never reads document contents; it only needs to walk the
//! hierarchy and delete what it finds. [`DocumentStore`] captures exactly
//! that surface so the walk in [`recursive`] can run against Firestore or
//! an in-memory fake.

pub mod firestore;
pub mod memory;
pub mod recursive;

use crate::error::AppError;
use std::fmt;

pub use firestore::FirestoreDb;
pub use memory::MemoryDocumentStore;
pub use recursive::recursive_delete;

/// Collection names as constants.
pub mod collections {
    /// Root collection; one document per uid.
    pub const USERS: &str = "users";
}

/// Path of a document relative to the database root, e.g. `users/abc123`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentPath(String);

/// Path of a collection relative to the database root,
/// e.g. `users/abc123/profileVariations`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl DocumentPath {
    /// Build a path from alternating collection/document segments.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The sub-collection `collection_id` beneath this document.
    pub fn collection(&self, collection_id: &str) -> CollectionPath {
        CollectionPath(format!("{}/{}", self.0, collection_id))
    }

    /// Number of path segments below the root (2 for `users/abc123`).
    pub fn depth(&self) -> usize {
        self.0.split('/').count()
    }
}

impl CollectionPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document `document_id` in this collection.
    pub fn doc(&self, document_id: &str) -> DocumentPath {
        DocumentPath(format!("{}/{}", self.0, document_id))
    }

    /// Split into (parent document, collection id).
    ///
    /// Root collections have no parent document.
    pub fn split(&self) -> (Option<&str>, &str) {
        match self.0.rsplit_once('/') {
            Some((parent, id)) => (Some(parent), id),
            None => (None, &self.0),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Root document owned by a user: `users/<uid>`.
pub fn user_document(uid: &str) -> DocumentPath {
    DocumentPath(format!("{}/{}", collections::USERS, uid))
}

/// A document listed in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedDocument {
    pub id: String,
    /// False for a "missing" document that only anchors sub-collections.
    pub exists: bool,
}

/// The slice of a hierarchical document database that cleanup needs.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether `document` itself exists (ignoring sub-collections).
    async fn exists(&self, document: &DocumentPath) -> Result<bool, AppError>;

    /// IDs of the sub-collections directly beneath `document`.
    ///
    /// Works whether or not `document` itself exists.
    async fn list_collection_ids(&self, document: &DocumentPath) -> Result<Vec<String>, AppError>;

    /// Documents in `collection`, including "missing" documents that do
    /// not exist themselves but still have sub-collections.
    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<ListedDocument>, AppError>;

    /// Delete `documents` in the order given. Absent documents are a no-op.
    ///
    /// Returns the number of delete operations issued.
    async fn delete_documents(&self, documents: &[DocumentPath]) -> Result<usize, AppError>;
}
