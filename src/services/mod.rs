// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod cleanup;
pub mod push_auth;

pub use cleanup::CleanupService;
pub use push_auth::{PushAuthError, PushPrincipal, PushVerifier};
