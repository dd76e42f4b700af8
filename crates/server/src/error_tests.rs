// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn truncate_bytes_within_limit() {
    assert_eq!(truncate_bytes("hello", 512), "hello");
}

#[test]
fn truncate_bytes_over_limit_ascii() {
    let s = "a".repeat(600);
    assert_eq!(truncate_bytes(&s, 512).len(), 512);
}

#[test]
fn truncate_bytes_does_not_split_multibyte_char() {
    let s = "é".repeat(300); // 2 bytes each -> 600 bytes total
    let truncated = truncate_bytes(&s, 512);
    assert!(truncated.len() <= 512);
    assert!(std::str::from_utf8(truncated.as_bytes()).is_ok());
}

#[test]
fn error_code_http_status_mapping() {
    assert_eq!(ErrorCode::Unauthorized.http_status(), axum::http::StatusCode::UNAUTHORIZED);
    assert_eq!(ErrorCode::NotFound.http_status(), axum::http::StatusCode::NOT_FOUND);
    assert_eq!(ErrorCode::Upstream.http_status(), axum::http::StatusCode::BAD_GATEWAY);
}

#[test]
fn pika_error_code_classification() {
    assert_eq!(PikaError::Protocol("bad frame".into()).code(), ErrorCode::BadRequest);
    assert_eq!(PikaError::Auth("bad key".into()).code(), ErrorCode::Unauthorized);
    assert_eq!(PikaError::NotFound("monitor".into()).code(), ErrorCode::NotFound);
}
