// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-channel adapters (§4.F): one `send` per channel kind, sharing a
//! single pooled `reqwest::Client` the way [`crate::upstream`] shares one
//! per upstream instance.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;

use crate::property::ChannelKind;
use crate::time::epoch_ms;

type HmacSha256 = Hmac<Sha256>;

/// `base64(HMAC_SHA256(secret, "{timestamp}\n{secret}"))`, the signing
/// scheme both DingTalk and Feishu custom bots document (§4.F, §9). `None`
/// if `secret` is rejected as a MAC key, which `HmacSha256` never does in
/// practice (it accepts any key length) but the API is fallible.
fn sign(secret: &str, timestamp: i64) -> Option<String> {
    let string_to_sign = format!("{timestamp}\n{secret}");
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return None;
    };
    mac.update(string_to_sign.as_bytes());
    Some(BASE64.encode(mac.finalize().into_bytes()))
}

/// Result of one channel dispatch attempt, reported independently per
/// channel (§4.F: "failures across channels do not abort the batch").
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub channel_type: &'static str,
    pub ok: bool,
    pub detail: String,
}

fn ok(channel_type: &'static str) -> DispatchOutcome {
    DispatchOutcome { channel_type, ok: true, detail: "ok".to_owned() }
}

fn failure(channel_type: &'static str, detail: impl Into<String>) -> DispatchOutcome {
    DispatchOutcome { channel_type, ok: false, detail: crate::error::truncate_bytes(&detail.into(), 512) }
}

/// Send `message` to one channel. `client` is reused across dispatches for
/// connection pooling (§4.F expansion).
pub async fn send(client: &Client, channel: &ChannelKind, message: &str) -> DispatchOutcome {
    match channel {
        ChannelKind::Dingtalk { webhook_url, secret } => send_dingtalk(client, webhook_url, secret.as_deref(), message).await,
        ChannelKind::Wecom { webhook_url } => send_wecom(client, webhook_url, message).await,
        ChannelKind::Feishu { webhook_url, secret } => send_feishu(client, webhook_url, secret.as_deref(), message).await,
        ChannelKind::Webhook { url } => send_webhook(client, url, message).await,
        ChannelKind::Email { to } => send_email(to),
    }
}

async fn send_dingtalk(client: &Client, webhook_url: &str, secret: Option<&str>, message: &str) -> DispatchOutcome {
    let mut url = webhook_url.to_owned();
    if let Some(secret) = secret {
        let timestamp = epoch_ms();
        let Some(signed) = sign(secret, timestamp) else {
            return failure("dingtalk", "failed to construct HMAC signature");
        };
        let separator = if url.contains('?') { '&' } else { '?' };
        url = format!("{url}{separator}timestamp={timestamp}&sign={}", urlencode(&signed));
    }

    let body = serde_json::json!({ "msgtype": "text", "text": { "content": message } });
    match client.post(&url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => ok("dingtalk"),
        Ok(resp) => failure("dingtalk", format!("HTTP {}", resp.status())),
        Err(e) => failure("dingtalk", e.to_string()),
    }
}

async fn send_wecom(client: &Client, webhook_url: &str, message: &str) -> DispatchOutcome {
    let body = serde_json::json!({ "msgtype": "text", "text": { "content": message } });
    let resp = match client.post(webhook_url).json(&body).send().await {
        Ok(resp) => resp,
        Err(e) => return failure("wecom", e.to_string()),
    };
    if !resp.status().is_success() {
        return failure("wecom", format!("HTTP {}", resp.status()));
    }
    // WeCom returns 200 even for a rejected message; `errcode` is the real
    // success signal (§4.F).
    match resp.json::<serde_json::Value>().await {
        Ok(value) => match value.get("errcode").and_then(|v| v.as_i64()) {
            Some(0) | None => ok("wecom"),
            Some(code) => failure("wecom", format!("errcode={code}")),
        },
        Err(e) => failure("wecom", e.to_string()),
    }
}

async fn send_feishu(client: &Client, webhook_url: &str, secret: Option<&str>, message: &str) -> DispatchOutcome {
    let mut body = serde_json::json!({ "msg_type": "text", "content": { "text": message } });
    if let Some(secret) = secret {
        // Same construction as DingTalk (§4.F expansion, §9): no contrary
        // evidence in the source material for a different unit or format.
        let timestamp = epoch_ms();
        let Some(signed) = sign(secret, timestamp) else {
            return failure("feishu", "failed to construct HMAC signature");
        };
        body["timestamp"] = serde_json::json!(timestamp.to_string());
        body["sign"] = serde_json::json!(signed);
    }
    match client.post(webhook_url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => ok("feishu"),
        Ok(resp) => failure("feishu", format!("HTTP {}", resp.status())),
        Err(e) => failure("feishu", e.to_string()),
    }
}

async fn send_webhook(client: &Client, url: &str, message: &str) -> DispatchOutcome {
    let body = serde_json::json!({ "msg_type": "text", "content": { "text": message } });
    match client.post(url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => ok("webhook"),
        Ok(resp) => failure("webhook", format!("HTTP {}", resp.status())),
        Err(e) => failure("webhook", e.to_string()),
    }
}

fn send_email(_to: &str) -> DispatchOutcome {
    failure("email", "email channel is not implemented")
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
#[path = "channels_tests.rs"]
mod tests;
