// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use careercopilot_cleanup::config::Config;
use careercopilot_cleanup::db::{DocumentStore, FirestoreDb, MemoryDocumentStore};
use careercopilot_cleanup::routes::create_router;
use careercopilot_cleanup::services::{CleanupService, PushVerifier};
use careercopilot_cleanup::AppState;
use futures_util::{stream, StreamExt, TryStreamExt};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const TEST_KID: &str = "test-push-key";
const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/push_signer_private.pem");
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/push_signer_public.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Generate a unique uid for test isolation.
#[allow(dead_code)]
pub fn unique_uid(label: &str) -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{label}-{nanos}")
}

// ─── Test App ────────────────────────────────────────────────────

/// Router plus handles on the in-memory backends behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub documents: Arc<MemoryDocumentStore>,
    pub objects: Arc<InMemory>,
}

/// Create a test app over empty in-memory backends.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let documents = Arc::new(MemoryDocumentStore::new());
    let objects = Arc::new(InMemory::new());
    let (router, state) = create_test_app_with(documents.clone(), objects.clone());

    TestApp {
        router,
        state,
        documents,
        objects,
    }
}

/// Create a test app over arbitrary backends.
#[allow(dead_code)]
pub fn create_test_app_with(
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
) -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let push_verifier = PushVerifier::new_with_static_key(
        &config,
        TEST_KID,
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).expect("test public key"),
    )
    .expect("static verifier");

    let state = Arc::new(AppState {
        config,
        cleanup: CleanupService::new(documents, objects),
        push_verifier,
    });

    (create_router(state.clone()), state)
}

// ─── Push Tokens ─────────────────────────────────────────────────

/// A valid push OIDC token for the configured trigger account.
#[allow(dead_code)]
pub fn create_test_push_jwt(config: &Config) -> String {
    create_push_jwt_with(config, |_| {})
}

/// A push OIDC token whose claims are adjusted by `edit` before signing.
#[allow(dead_code)]
pub fn create_push_jwt_with(config: &Config, edit: impl FnOnce(&mut Value)) -> String {
    let now = chrono::Utc::now().timestamp();
    let mut claims = json!({
        "iss": "https://accounts.google.com",
        "aud": config.service_url,
        "sub": "112233445566778899",
        "email": config.trigger_service_account,
        "email_verified": true,
        "iat": now,
        "exp": now + 3600,
    });
    edit(&mut claims);

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());

    jsonwebtoken::encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("test private key"),
    )
    .expect("sign test token")
}

// ─── Object Store Helpers ────────────────────────────────────────

#[allow(dead_code)]
pub async fn seed_objects(store: &dyn ObjectStore, keys: &[&str]) {
    for key in keys {
        store
            .put(
                &ObjectPath::parse(key).expect("object key"),
                PutPayload::from_static(b"%PDF-1.7"),
            )
            .await
            .expect("seed object");
    }
}

#[allow(dead_code)]
pub async fn count_objects(store: &dyn ObjectStore, prefix: &str) -> usize {
    store
        .list(Some(&ObjectPath::parse(prefix).expect("object prefix")))
        .try_collect::<Vec<_>>()
        .await
        .expect("list objects")
        .len()
}

/// Object store whose every operation fails.
#[derive(Debug)]
pub struct FailingObjectStore {
    not_found: bool,
}

#[allow(dead_code)]
impl FailingObjectStore {
    /// Fails like a backend refusing access.
    pub fn denied() -> Self {
        Self { not_found: false }
    }

    /// Fails like a backend reporting the bucket or prefix absent.
    pub fn not_found() -> Self {
        Self { not_found: true }
    }

    fn error(&self, path: &str) -> object_store::Error {
        if self.not_found {
            object_store::Error::NotFound {
                path: path.to_string(),
                source: "no such bucket".into(),
            }
        } else {
            object_store::Error::Generic {
                store: "FailingObjectStore",
                source: "permission denied".into(),
            }
        }
    }
}

impl std::fmt::Display for FailingObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FailingObjectStore")
    }
}

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn put_opts(
        &self,
        location: &ObjectPath,
        _payload: PutPayload,
        _opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        Err(self.error(location.as_ref()))
    }

    async fn put_multipart_opts(
        &self,
        location: &ObjectPath,
        _opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        Err(self.error(location.as_ref()))
    }

    async fn get_opts(
        &self,
        location: &ObjectPath,
        _options: GetOptions,
    ) -> object_store::Result<GetResult> {
        Err(self.error(location.as_ref()))
    }

    async fn delete(&self, location: &ObjectPath) -> object_store::Result<()> {
        Err(self.error(location.as_ref()))
    }

    fn list(
        &self,
        prefix: Option<&ObjectPath>,
    ) -> futures_util::stream::BoxStream<'_, object_store::Result<ObjectMeta>> {
        let err = self.error(prefix.map(|p| p.as_ref()).unwrap_or(""));
        stream::iter(vec![Err(err)]).boxed()
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&ObjectPath>,
    ) -> object_store::Result<ListResult> {
        Err(self.error(prefix.map(|p| p.as_ref()).unwrap_or("")))
    }

    async fn copy(&self, from: &ObjectPath, _to: &ObjectPath) -> object_store::Result<()> {
        Err(self.error(from.as_ref()))
    }

    async fn copy_if_not_exists(
        &self,
        from: &ObjectPath,
        _to: &ObjectPath,
    ) -> object_store::Result<()> {
        Err(self.error(from.as_ref()))
    }
}

// ─── Log Capture ─────────────────────────────────────────────────

/// Collects JSON log lines emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[allow(dead_code)]
impl LogCapture {
    /// Install a thread-local JSON subscriber writing into a new capture.
    ///
    /// `#[tokio::test]` runs on a single thread, so everything the test
    /// awaits is captured while the guard lives.
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(capture.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn events(&self) -> Vec<Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Messages logged at `level` ("INFO", "ERROR", ...).
    pub fn messages_at(&self, level: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event["level"] == level)
            .filter_map(|event| event["fields"]["message"].as_str().map(str::to_string))
            .collect()
    }
}
