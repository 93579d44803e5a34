// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CareerCopilot account cleanup.
//!
//! Receives the identity provider's user-deletion events and cascade-deletes
//! the account's Firestore document subtree and Cloud Storage files.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;

use config::Config;
use services::{CleanupService, PushVerifier};

/// Shared application state.
///
/// Backend handles are created once per process and injected here.
pub struct AppState {
    pub config: Config,
    pub cleanup: CleanupService,
    pub push_verifier: PushVerifier,
}
