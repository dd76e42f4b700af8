// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum_test::TestServer;
use pika::transport::build_router;

#[tokio::test]
async fn healthz_reports_ok_with_no_agents() {
    let state = pika_integration_tests::test_state().await;
    let router = build_router(state);
    let server = TestServer::new(router).expect("test server");

    let response = server.get("/healthz").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["online_agents"], 0);
}
