//! Fetch client behaviour against a live HTTP mock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dex_ingest::{FetchClient, FetchError, RetryPolicy};

fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        base_delay: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
        jitter: Duration::ZERO,
    }
}

#[tokio::test]
async fn recovers_after_two_503s() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/pikachu"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pokemon/pikachu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 25, "name": "pikachu"})))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new(fast_policy(3));
    let body = client
        .fetch_json(&format!("{}/pokemon/pikachu", server.uri()), "pokemon:pikachu")
        .await
        .unwrap();

    assert_eq!(body["id"], 25);
}

#[tokio::test]
async fn not_found_is_terminal_and_labelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/missingno"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new(fast_policy(3));
    let err = client
        .fetch_json(&format!("{}/pokemon/missingno", server.uri()), "pokemon:missingno")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404, .. }));
    assert!(err.to_string().contains("pokemon:missingno"));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn rate_limit_exhaustion_surfaces_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokedex/kanto"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let client = FetchClient::new(fast_policy(3));
    let err = client
        .fetch_json(&format!("{}/pokedex/kanto", server.uri()), "pokedex:kanto")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 429, .. }));
    assert_eq!(err.label(), "pokedex:kanto");
}

#[tokio::test]
async fn malformed_json_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon-species/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = FetchClient::new(fast_policy(3));
    let err = client
        .fetch_json(&format!("{}/pokemon-species/1", server.uri()), "species:1")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn slow_response_times_out_and_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pokemon/slowbro"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 80, "name": "slowbro"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = FetchClient::new(RetryPolicy {
        timeout: Duration::from_millis(50),
        ..fast_policy(2)
    });
    let err = client
        .fetch_json(&format!("{}/pokemon/slowbro", server.uri()), "pokemon:slowbro")
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout { timeout_ms: 50, .. }));
}
