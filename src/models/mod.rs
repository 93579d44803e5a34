// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod cleanup;
pub mod event;

pub use cleanup::{CleanupReport, StepOutcome};
pub use event::{validate_uid, UserDeletedEvent, UserDeletion, UserRecord};
