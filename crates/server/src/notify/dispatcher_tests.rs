// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use crate::config::PikaConfig;
use crate::property::{ChannelEntry, ChannelKind, NotificationChannelsConfig};
use crate::storage::Storage;

async fn test_state() -> Arc<AppState> {
    let storage = Storage::connect_in_memory().await.expect("storage");
    Arc::new(AppState::new(PikaConfig::for_test(), storage))
}

#[tokio::test]
async fn test_channel_reports_not_found_for_unconfigured_type() {
    let state = test_state().await;
    let outcomes = test_channel(&state, "dingtalk").await.expect("test_channel");
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].ok);
}

#[tokio::test]
async fn test_channel_dispatches_to_every_matching_entry() {
    let state = test_state().await;
    let config = NotificationChannelsConfig {
        channels: vec![ChannelEntry { enabled: true, config: ChannelKind::Email { to: "ops@example.com".to_owned() } }],
    };
    property::set(&state.storage, property::NOTIFICATION_CHANNELS_ID, "channels", &config).await.expect("set config");

    let outcomes = test_channel(&state, "email").await.expect("test_channel");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].channel_type, "email");
    assert!(!outcomes[0].ok, "email channel is reserved, not implemented");
}

#[tokio::test]
async fn disabled_channels_are_excluded_from_dispatch() {
    let state = test_state().await;
    let config = NotificationChannelsConfig {
        channels: vec![ChannelEntry { enabled: false, config: ChannelKind::Email { to: "ops@example.com".to_owned() } }],
    };
    property::set(&state.storage, property::NOTIFICATION_CHANNELS_ID, "channels", &config).await.expect("set config");

    let loaded = property::notification_channels(&state.storage).await.expect("load");
    let targets: Vec<_> = loaded.channels.iter().filter(|e| e.enabled).collect();
    assert!(targets.is_empty());
}
