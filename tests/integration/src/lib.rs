// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for end-to-end tests against the in-process Pika server.

use std::sync::Arc;

use pika::config::PikaConfig;
use pika::state::AppState;

/// Build an `AppState` wired to an in-memory SQLite pool, ready for router tests.
pub async fn test_state() -> Arc<AppState> {
    let config = PikaConfig::for_test();
    let storage = pika::storage::Storage::connect_in_memory()
        .await
        .expect("in-memory storage must initialize");
    Arc::new(AppState::new(config, storage))
}
