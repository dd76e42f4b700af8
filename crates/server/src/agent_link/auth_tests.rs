use super::*;

#[tokio::test]
async fn unknown_key_with_fresh_id_is_a_new_agent() {
    let storage = Storage::connect_in_memory().await.unwrap();
    let outcome = authorize(&storage, "fresh-key", Some("agent-1")).await.unwrap();
    assert!(matches!(outcome, HandshakeOutcome::NewAgent(id) if id == "agent-1"));
}

#[tokio::test]
async fn unknown_key_with_no_id_is_rejected() {
    let storage = Storage::connect_in_memory().await.unwrap();
    let outcome = authorize(&storage, "fresh-key", None).await.unwrap();
    assert!(matches!(outcome, HandshakeOutcome::Rejected));
}

#[tokio::test]
async fn matching_key_resolves_to_the_stored_agent() {
    let storage = Storage::connect_in_memory().await.unwrap();
    storage
        .agent_upsert_handshake("agent-1", "key-a", "h", "1.2.3.4", "linux", "x86_64", "1.0", "", 1_000)
        .await
        .unwrap();

    let outcome = authorize(&storage, "key-a", None).await.unwrap();
    assert!(matches!(outcome, HandshakeOutcome::Known(row) if row.id == "agent-1"));
}

#[tokio::test]
async fn impersonating_a_known_id_with_the_wrong_key_is_rejected() {
    let storage = Storage::connect_in_memory().await.unwrap();
    storage
        .agent_upsert_handshake("agent-1", "key-a", "h", "1.2.3.4", "linux", "x86_64", "1.0", "", 1_000)
        .await
        .unwrap();

    let outcome = authorize(&storage, "stolen-key", Some("agent-1")).await.unwrap();
    assert!(matches!(outcome, HandshakeOutcome::Rejected));
}

#[tokio::test]
async fn rate_limiter_suppresses_logging_within_the_retry_window() {
    let limiter = AuthRateLimiter::new();
    let ip: std::net::IpAddr = "10.0.0.1".parse().unwrap();

    assert!(limiter.should_log(ip, 0).await);
    assert!(!limiter.should_log(ip, 500).await);
    assert!(limiter.should_log(ip, 1_000).await);
}

#[tokio::test]
async fn rate_limiter_tracks_ips_independently() {
    let limiter = AuthRateLimiter::new();
    let a: std::net::IpAddr = "10.0.0.1".parse().unwrap();
    let b: std::net::IpAddr = "10.0.0.2".parse().unwrap();

    assert!(limiter.should_log(a, 0).await);
    assert!(limiter.should_log(b, 0).await);
}
