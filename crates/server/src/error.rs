// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the Pika core: transient I/O, protocol/validation,
//! authorization, invariant violations, and fatal startup errors (§7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Machine-readable error code, one per `PikaError` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Unauthorized,
    BadRequest,
    NotFound,
    Upstream,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Upstream => "UPSTREAM_ERROR",
            Self::Internal => "INTERNAL",
        }
    }

    pub fn to_response(&self, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        let message = truncate_bytes(&message.into(), 512);
        (self.http_status(), Json(ErrorResponse { error: ErrorBody {
            code: self.as_str().to_owned(),
            message,
        }}))
    }
}

/// Errors produced by the core pipeline.
///
/// - `Transient` errors are retried in-tick where idempotency allows.
/// - `Protocol` errors drop the offending frame; logged once per
///   `(agent, kind)` per minute by the caller.
/// - `Auth` errors close the originating session but are not fatal.
/// - `Invariant` errors are auto-repaired when safe, surfaced via the
///   health endpoint otherwise.
/// - `Fatal` errors abort startup.
#[derive(Debug, thiserror::Error)]
pub enum PikaError {
    #[error("transient I/O: {0}")]
    Transient(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("fatal: {0}")]
    Fatal(#[from] anyhow::Error),
}

impl PikaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Transient(_) | Self::Fatal(_) | Self::Invariant(_) => ErrorCode::Internal,
            Self::Protocol(_) => ErrorCode::BadRequest,
            Self::Auth(_) => ErrorCode::Unauthorized,
            Self::NotFound(_) => ErrorCode::NotFound,
        }
    }
}

impl IntoResponse for PikaError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, body) = code.to_response(self.to_string());
        (status, body).into_response()
    }
}

/// Top-level error response envelope, matching §7's `{error: string}` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Truncate a string to at most `max_bytes` bytes without splitting a
/// multi-byte UTF-8 sequence. Used for adapter error text in notification
/// test responses (§7: "truncated to 512 bytes").
pub fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_owned();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_owned()
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
