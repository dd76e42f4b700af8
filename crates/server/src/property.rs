// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component G — Property Store Facade (§4.G). Typed get/set/delete over
//! the single JSON key-value store in `storage::property`; each consumer
//! decodes into its own strict schema and rejects unknown fields (§9).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::storage::Storage;

/// The only two well-known property ids (§4.G).
pub const NOTIFICATION_CHANNELS_ID: &str = "notification_channels";
pub const SYSTEM_CONFIG_ID: &str = "system_config";

/// `get(id) -> (name, value)` (§4.G). `value` is the raw decoded JSON;
/// callers wanting a typed result should use [`get_into`].
pub async fn get(storage: &Storage, id: &str) -> anyhow::Result<Option<(String, serde_json::Value)>> {
    let Some(row) = storage.property_get(id).await? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&row.value)?;
    Ok(Some((row.name, value)))
}

/// `set(id, name, value)` — upsert (§4.G).
pub async fn set<T: Serialize>(storage: &Storage, id: &str, name: &str, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    storage.property_set(id, name, &json).await
}

pub async fn delete(storage: &Storage, id: &str) -> anyhow::Result<()> {
    storage.property_delete(id).await
}

/// `getInto(id, destType) -> dest` (§4.G): decode into a caller-provided
/// strict schema. `None` if the property has never been set.
pub async fn get_into<T: DeserializeOwned>(storage: &Storage, id: &str) -> anyhow::Result<Option<T>> {
    let Some(row) = storage.property_get(id).await? else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&row.value)?))
}

/// A single configured notification endpoint. The `type` tag is a closed
/// variant (§9 "adding a type is a compile-time change").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ChannelKind {
    Dingtalk {
        webhook_url: String,
        #[serde(default)]
        secret: Option<String>,
    },
    Wecom {
        webhook_url: String,
    },
    Feishu {
        webhook_url: String,
        #[serde(default)]
        secret: Option<String>,
    },
    Webhook {
        url: String,
    },
    Email {
        to: String,
    },
}

impl ChannelKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Dingtalk { .. } => "dingtalk",
            Self::Wecom { .. } => "wecom",
            Self::Feishu { .. } => "feishu",
            Self::Webhook { .. } => "webhook",
            Self::Email { .. } => "email",
        }
    }
}

/// `(type, enabled, config)` per §3 — `config` is a nested (not flattened)
/// field so `ChannelKind`'s `deny_unknown_fields` actually rejects unknown
/// keys: serde silently drops that attribute on a `#[serde(flatten)]`
/// field, which would otherwise let a typo'd key through unnoticed (§9
/// "each consumer decodes into its own strict schema and rejects unknown
/// fields").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelEntry {
    pub enabled: bool,
    pub config: ChannelKind,
}

/// The decoded shape of the `notification_channels` property (§3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationChannelsConfig {
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

/// The decoded shape of the `system_config` property: display name and
/// logo (§4.G).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub logo: Option<String>,
}

/// Convenience accessor used by the Notification Dispatcher (§4.F step 1).
pub async fn notification_channels(storage: &Storage) -> anyhow::Result<NotificationChannelsConfig> {
    Ok(get_into(storage, NOTIFICATION_CHANNELS_ID).await?.unwrap_or_default())
}

#[cfg(test)]
#[path = "property_tests.rs"]
mod tests;
