mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{heartbeat_body, test_identity, StubTransport};
use vigil_agent::error::AgentError;
use vigil_agent::heartbeat::HeartbeatClient;
use vigil_agent::retry::RetryPolicy;

fn instant_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
}

fn client(transport: &Arc<StubTransport>) -> HeartbeatClient {
    HeartbeatClient::new(transport.clone(), test_identity())
}

#[tokio::test]
async fn success_on_first_attempt() {
    let transport = Arc::new(StubTransport::new());
    transport.push_ok(200, &heartbeat_body(true));

    let outcome = instant_policy(5).run(&client(&transport)).await.unwrap();
    assert!(outcome.authorized);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn transient_failures_retried_until_success() {
    let transport = Arc::new(StubTransport::new());
    transport.push_err(AgentError::Network("connection refused".to_string()));
    transport.push_ok(500, "internal error");
    transport.push_ok(200, &heartbeat_body(true));

    let outcome = instant_policy(5).run(&client(&transport)).await.unwrap();
    assert!(outcome.authorized);
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn protocol_error_retried_like_server_error() {
    let transport = Arc::new(StubTransport::new());
    transport.push_ok(200, "garbage");
    transport.push_ok(200, &heartbeat_body(true));

    let outcome = instant_policy(5).run(&client(&transport)).await.unwrap();
    assert!(outcome.authorized);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn network_error_exhausts_all_attempts() {
    let transport = Arc::new(StubTransport::new());
    for _ in 0..5 {
        transport.push_err(AgentError::Network("unreachable".to_string()));
    }

    let err = instant_policy(5).run(&client(&transport)).await.unwrap_err();
    assert!(matches!(err, AgentError::Network(_)));
    assert_eq!(transport.call_count(), 5);
}

#[tokio::test]
async fn auth_error_short_circuits_on_first_attempt() {
    let transport = Arc::new(StubTransport::new());
    transport.push_ok(401, "unauthorized");
    // More replies available, but none may be consumed
    transport.push_ok(200, &heartbeat_body(true));

    let err = instant_policy(5).run(&client(&transport)).await.unwrap_err();
    assert!(matches!(err, AgentError::Auth { status: 401 }));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn auth_error_halts_mid_retry_sequence() {
    let transport = Arc::new(StubTransport::new());
    transport.push_err(AgentError::Network("unreachable".to_string()));
    transport.push_ok(401, "unauthorized");
    transport.push_ok(200, &heartbeat_body(true));

    let err = instant_policy(5).run(&client(&transport)).await.unwrap_err();
    assert!(matches!(err, AgentError::Auth { status: 401 }));
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn single_attempt_policy_never_retries() {
    let transport = Arc::new(StubTransport::new());
    transport.push_err(AgentError::Network("unreachable".to_string()));
    transport.push_ok(200, &heartbeat_body(true));

    let err = instant_policy(1).run(&client(&transport)).await.unwrap_err();
    assert!(matches!(err, AgentError::Network(_)));
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn backoff_sequence_for_default_settings() {
    // max_attempts=5, base_delay=60, max_jitter=30: the four delays before
    // attempts 2..=5 have base components 60, 120, 240, 480 seconds.
    let policy = RetryPolicy::new(5, Duration::from_secs(60), Duration::from_secs(30));
    let bases: Vec<u64> = (1..5).map(|k| policy.backoff_delay(k).as_secs()).collect();
    assert_eq!(bases, vec![60, 120, 240, 480]);
}
