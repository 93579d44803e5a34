// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`DocumentStore`].
//!
//! The fluent `firestore` API has no listing mode that returns missing
//! documents, and a recursive delete must see those to reach the
//! sub-collections hanging off them. The hierarchy walk therefore goes
//! straight to the Firestore v1 gRPC client that `firestore` wraps.

use crate::db::{CollectionPath, DocumentPath, DocumentStore, ListedDocument};
use crate::error::AppError;
use gcloud_sdk::google::firestore::v1::{
    write, BatchWriteRequest, DocumentMask, GetDocumentRequest, ListCollectionIdsRequest,
    ListDocumentsRequest, Write,
};
use gcloud_sdk::tonic::{Code, Status};

// Firestore limits batch writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;
const PAGE_SIZE: i32 = 300;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Full resource name for a path relative to the database root.
    fn resource_name(client: &firestore::FirestoreDb, path: &str) -> String {
        format!("{}/{}", client.get_documents_path(), path)
    }

    // ─── Test Support ─────────────────────────────────────────────

    /// Write an empty document at `path` (relative to the database root).
    ///
    /// Used by emulator tests to seed subtrees; cleanup itself never writes.
    pub async fn create_empty_document(&self, path: &DocumentPath) -> Result<(), AppError> {
        let client = self.get_client()?;
        let write = Write {
            operation: Some(write::Operation::Update(
                gcloud_sdk::google::firestore::v1::Document {
                    name: Self::resource_name(client, path.as_str()),
                    ..Default::default()
                },
            )),
            ..Default::default()
        };
        self.commit_batch(client, vec![write]).await
    }

    async fn commit_batch(
        &self,
        client: &firestore::FirestoreDb,
        writes: Vec<Write>,
    ) -> Result<(), AppError> {
        let request = BatchWriteRequest {
            database: client.get_database_path().clone(),
            writes,
            ..Default::default()
        };

        let response = client
            .client()
            .get()
            .batch_write(request)
            .await
            .map_err(|e| database_error("batch write", e))?
            .into_inner();

        // Each write reports its own status; code 0 is OK.
        let failures: Vec<_> = response.status.iter().filter(|s| s.code != 0).collect();
        if let Some(first) = failures.first() {
            return Err(AppError::Database(format!(
                "{} of {} writes failed in batch: {}",
                failures.len(),
                response.status.len(),
                first.message
            )));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreDb {
    async fn exists(&self, document: &DocumentPath) -> Result<bool, AppError> {
        let client = self.get_client()?;

        let request = GetDocumentRequest {
            name: Self::resource_name(client, document.as_str()),
            // Empty mask: we only care whether the document is there.
            mask: Some(DocumentMask::default()),
            ..Default::default()
        };

        match client.client().get().get_document(request).await {
            Ok(_) => Ok(true),
            Err(status) if status.code() == Code::NotFound => Ok(false),
            Err(status) => Err(database_error("get document", status)),
        }
    }

    async fn list_collection_ids(&self, document: &DocumentPath) -> Result<Vec<String>, AppError> {
        let client = self.get_client()?;
        let parent = Self::resource_name(client, document.as_str());

        let mut ids = Vec::new();
        let mut page_token = String::new();
        loop {
            let request = ListCollectionIdsRequest {
                parent: parent.clone(),
                page_size: PAGE_SIZE,
                page_token,
                ..Default::default()
            };

            let response = client
                .client()
                .get()
                .list_collection_ids(request)
                .await
                .map_err(|e| database_error("list collection ids", e))?
                .into_inner();

            ids.extend(response.collection_ids);
            if response.next_page_token.is_empty() {
                break;
            }
            page_token = response.next_page_token;
        }

        Ok(ids)
    }

    async fn list_documents(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<ListedDocument>, AppError> {
        let client = self.get_client()?;
        let (parent, collection_id) = collection.split();
        let parent = match parent {
            Some(doc) => Self::resource_name(client, doc),
            None => client.get_documents_path().clone(),
        };

        let mut documents = Vec::new();
        let mut page_token = String::new();
        loop {
            let request = ListDocumentsRequest {
                parent: parent.clone(),
                collection_id: collection_id.to_string(),
                page_size: PAGE_SIZE,
                page_token,
                mask: Some(DocumentMask::default()),
                show_missing: true,
                ..Default::default()
            };

            let response = client
                .client()
                .get()
                .list_documents(request)
                .await
                .map_err(|e| database_error("list documents", e))?
                .into_inner();

            // Missing documents come back with no create_time.
            documents.extend(response.documents.into_iter().filter_map(|doc| {
                let exists = doc.create_time.is_some();
                doc.name.rsplit('/').next().map(|id| ListedDocument {
                    id: id.to_string(),
                    exists,
                })
            }));
            if response.next_page_token.is_empty() {
                break;
            }
            page_token = response.next_page_token;
        }

        Ok(documents)
    }

    async fn delete_documents(&self, documents: &[DocumentPath]) -> Result<usize, AppError> {
        let client = self.get_client()?;

        for chunk in documents.chunks(BATCH_SIZE) {
            let writes = chunk
                .iter()
                .map(|doc| Write {
                    operation: Some(write::Operation::Delete(Self::resource_name(
                        client,
                        doc.as_str(),
                    ))),
                    ..Default::default()
                })
                .collect();

            self.commit_batch(client, writes).await?;
            tracing::debug!(count = chunk.len(), "Deleted document batch");
        }

        Ok(documents.len())
    }
}

fn database_error(operation: &str, status: Status) -> AppError {
    AppError::Database(format!(
        "Firestore {} failed ({:?}): {}",
        operation,
        status.code(),
        status.message()
    ))
}
