// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Verification of Google-signed OIDC tokens on push deliveries.
//!
//! Eventarc and Pub/Sub push subscriptions attach an ID token minted for
//! the trigger's service account, with the receiving service URL as the
//! audience. Only that account may ask us to delete a user's data.

use crate::config::Config;
use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_KEYS_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity of a verified push sender.
#[derive(Debug, Clone)]
pub struct PushPrincipal {
    pub email: String,
    pub subject: String,
}

/// Why a push request was not accepted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PushAuthError {
    /// The token is missing, malformed, or not from the trigger account.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Google's signing keys could not be fetched; the sender may retry.
    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

enum KeySource {
    Google,
    Static { kid: String, key: Arc<DecodingKey> },
}

struct CachedKeys {
    by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for push-delivery ID tokens.
pub struct PushVerifier {
    http_client: reqwest::Client,
    audience: String,
    sender_email: String,
    source: KeySource,
    keys: RwLock<Option<CachedKeys>>,
    refresh_lock: Mutex<()>,
}

impl PushVerifier {
    /// Verifier that validates against Google's published signing keys.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let verifier = Self::with_source(config, KeySource::Google)?;
        tracing::info!(
            audience = %verifier.audience,
            sender = %verifier.sender_email,
            "Initialized push token verifier"
        );
        Ok(verifier)
    }

    /// Verifier trusting a single fixed RSA key, for tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key id must not be empty");
        }
        Self::with_source(
            config,
            KeySource::Static {
                kid,
                key: Arc::new(key),
            },
        )
    }

    fn with_source(config: &Config, source: KeySource) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            audience: config.service_url.trim_end_matches('/').to_string(),
            sender_email: config.trigger_service_account.clone(),
            source,
            keys: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify the bearer token in an `Authorization` header.
    pub async fn verify(
        &self,
        auth_header: Option<&HeaderValue>,
    ) -> Result<PushPrincipal, PushAuthError> {
        let token = extract_bearer_token(auth_header)?;

        let header = decode_header(token)
            .map_err(|e| PushAuthError::Forbidden(format!("invalid JWT header: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(PushAuthError::Forbidden(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| PushAuthError::Forbidden("missing JWT kid".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[self.audience.as_str()]);
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<IdTokenClaims>(token, key.as_ref(), &validation)
            .map_err(|e| PushAuthError::Forbidden(format!("JWT validation failed: {e}")))?
            .claims;

        check_issued_at(claims.iat)?;

        let email = claims
            .email
            .ok_or_else(|| PushAuthError::Forbidden("missing email claim".to_string()))?;
        if email != self.sender_email {
            return Err(PushAuthError::Forbidden(format!(
                "unexpected sender: {email}"
            )));
        }
        if claims.email_verified != Some(true) {
            return Err(PushAuthError::Forbidden(
                "sender email is not verified".to_string(),
            ));
        }

        Ok(PushPrincipal {
            email,
            subject: claims.sub,
        })
    }

    async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, PushAuthError> {
        if let KeySource::Static { kid: known, key } = &self.source {
            return if kid == known {
                Ok(key.clone())
            } else {
                Err(PushAuthError::Forbidden(format!("unknown JWT kid: {kid}")))
            };
        }

        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        // Google rotates keys; an unknown kid forces one refetch.
        self.refresh_keys().await?;
        self.cached_key(kid)
            .await
            .ok_or_else(|| PushAuthError::Forbidden(format!("JWT kid not in JWKS: {kid}")))
    }

    async fn cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let now = Instant::now();
        self.keys
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.expires_at > now)
            .and_then(|cached| cached.by_kid.get(kid))
            .cloned()
    }

    async fn refresh_keys(&self) -> Result<(), PushAuthError> {
        let _guard = self.refresh_lock.lock().await;

        let response = self
            .http_client
            .get(GOOGLE_JWKS_URL)
            .send()
            .await
            .map_err(|e| PushAuthError::KeysUnavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PushAuthError::KeysUnavailable(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_KEYS_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| PushAuthError::KeysUnavailable(format!("invalid JWKS JSON: {e}")))?;

        let by_kid = usable_keys(jwks);
        if by_kid.is_empty() {
            return Err(PushAuthError::KeysUnavailable(
                "JWKS response had no usable RSA keys".to_string(),
            ));
        }

        tracing::debug!(keys = by_kid.len(), ttl_secs = ttl.as_secs(), "Refreshed Google JWKS");
        *self.keys.write().await = Some(CachedKeys {
            by_kid,
            expires_at: Instant::now() + ttl,
        });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iat: Option<u64>,
    email: Option<String>,
    email_verified: Option<bool>,
}

/// RS256 signing keys from a JWKS document, keyed by kid.
fn usable_keys(jwks: Jwks) -> HashMap<String, Arc<DecodingKey>> {
    jwks.keys
        .into_iter()
        .filter(|jwk| jwk.kty == "RSA" && !jwk.kid.trim().is_empty())
        .filter(|jwk| jwk.alg.as_deref().is_none_or(|alg| alg == "RS256"))
        .filter(|jwk| jwk.use_.as_deref().is_none_or(|u| u == "sig"))
        .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
            Ok(key) => Some((jwk.kid, Arc::new(key))),
            Err(e) => {
                tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                None
            }
        })
        .collect()
}

fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, PushAuthError> {
    let value = auth_header
        .ok_or_else(|| PushAuthError::Forbidden("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| PushAuthError::Forbidden("invalid Authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token),
        Some(_) => Err(PushAuthError::Forbidden("Bearer token is empty".to_string())),
        None => Err(PushAuthError::Forbidden(
            "Authorization header must be Bearer token".to_string(),
        )),
    }
}

fn check_issued_at(iat: Option<u64>) -> Result<(), PushAuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    match iat {
        None => Err(PushAuthError::Forbidden("missing iat claim".to_string())),
        Some(iat) if iat > now + CLOCK_SKEW_SECS => Err(PushAuthError::Forbidden(
            "iat claim is in the future".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse().ok())
}
