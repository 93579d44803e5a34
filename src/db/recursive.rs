// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recursive delete of a document and everything nested beneath it.

use crate::db::{DocumentPath, DocumentStore};
use crate::error::AppError;

/// Delete `root` and every document in its sub-collections, transitively.
///
/// The whole subtree is discovered first, then deleted deepest-first so a
/// failure part way through never leaves a child orphaned under a deleted
/// parent. Missing intermediate documents are traversed like real ones but
/// have nothing of their own to delete.
///
/// Returns the number of existing documents deleted (root included when it
/// exists). Zero means there was nothing to delete.
pub async fn recursive_delete(
    store: &dyn DocumentStore,
    root: &DocumentPath,
) -> Result<usize, AppError> {
    let root_exists = store.exists(root).await?;

    let mut pending = vec![(root.clone(), root_exists)];
    let mut found: Vec<DocumentPath> = Vec::new();
    let mut missing = 0usize;

    while let Some((document, exists)) = pending.pop() {
        for collection_id in store.list_collection_ids(&document).await? {
            let collection = document.collection(&collection_id);
            for listed in store.list_documents(&collection).await? {
                pending.push((collection.doc(&listed.id), listed.exists));
            }
        }
        if exists {
            found.push(document);
        } else {
            missing += 1;
        }
    }

    if found.is_empty() {
        tracing::debug!(root = %root, missing, "Document subtree already empty");
        return Ok(0);
    }

    // Deepest paths first; the sort is stable so siblings keep discovery order.
    found.sort_by_key(|doc| std::cmp::Reverse(doc.depth()));

    let total = found.len();
    tracing::debug!(root = %root, total, missing, root_exists, "Deleting document subtree");
    store.delete_documents(&found).await?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{user_document, MemoryDocumentStore};

    #[tokio::test]
    async fn test_deletes_nested_subtree() {
        let store = MemoryDocumentStore::new();
        store.insert("users/u1");
        store.insert("users/u1/documents/d1");
        store.insert("users/u1/documents/d1/analyses/a1");
        store.insert("users/u1/documents/d1/analyses/a2");
        store.insert("users/u1/profileVariations/p1");

        let count = recursive_delete(&store, &user_document("u1")).await.unwrap();

        assert_eq!(count, 5);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_children_deleted_before_parents() {
        let store = MemoryDocumentStore::new();
        store.insert("users/u1");
        store.insert("users/u1/documents/d1");
        store.insert("users/u1/documents/d1/analyses/a1");

        recursive_delete(&store, &user_document("u1")).await.unwrap();

        let order = store.deletion_log();
        let pos = |p: &str| order.iter().position(|d| d.as_str() == p).unwrap();
        assert!(pos("users/u1/documents/d1/analyses/a1") < pos("users/u1/documents/d1"));
        assert!(pos("users/u1/documents/d1") < pos("users/u1"));
    }

    #[tokio::test]
    async fn test_missing_parent_documents_are_traversed() {
        let store = MemoryDocumentStore::new();
        // Neither users/u1 nor users/u1/documents/d1 exist as documents.
        store.insert("users/u1/documents/d1/analyses/a1");

        let count = recursive_delete(&store, &user_document("u1")).await.unwrap();

        assert_eq!(count, 1);
        assert!(store.is_empty());
        assert_eq!(
            store.deletion_log(),
            vec![DocumentPath::new("users/u1/documents/d1/analyses/a1")]
        );
    }

    #[tokio::test]
    async fn test_sibling_ids_sharing_a_prefix_counted_once() {
        let store = MemoryDocumentStore::new();
        store.insert("users/u1");
        store.insert("users/u1/docs/a");
        store.insert("users/u1/docs/a-b");
        store.insert("users/u1/docs/a/sub/x");

        let count = recursive_delete(&store, &user_document("u1")).await.unwrap();

        assert_eq!(count, 4);
        assert_eq!(store.deletion_log().len(), 4);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_subtree_is_noop() {
        let store = MemoryDocumentStore::new();
        store.insert("users/other");

        let count = recursive_delete(&store, &user_document("u1")).await.unwrap();

        assert_eq!(count, 0);
        assert!(store.deletion_log().is_empty());
        assert!(store.contains("users/other"));
    }

    #[tokio::test]
    async fn test_prefix_sibling_untouched() {
        let store = MemoryDocumentStore::new();
        store.insert("users/u1");
        store.insert("users/u10");
        store.insert("users/u10/profileVariations/p1");

        recursive_delete(&store, &user_document("u1")).await.unwrap();

        assert!(!store.contains("users/u1"));
        assert!(store.contains("users/u10"));
        assert!(store.contains("users/u10/profileVariations/p1"));
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let store = MemoryDocumentStore::new();
        store.insert("users/u1");
        store.fail_with("permission denied");

        let err = recursive_delete(&store, &user_document("u1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Database(_)));
    }
}
