//! Integration tests for the legacy portal client
//!
//! Retry counts and timeouts per fetch profile, checked against a wiremock
//! portal that records every hit.

use std::time::{Duration, Instant};

use intake_server::error::FetchError;
use intake_server::upstream::{FetchProfile, UpstreamClient};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST_PATH: &str = "/customers/latest";
const REFRESH_PATH: &str = "/customers/refreshLatestInspection";

/// Test helper: client pointed at the mock portal
fn client(server: &MockServer) -> UpstreamClient {
    UpstreamClient::new(
        &format!("{}{}", server.uri(), LATEST_PATH),
        &format!("{}{}", server.uri(), REFRESH_PATH),
    )
    .expect("Should build upstream client")
}

#[tokio::test]
async fn test_full_refresh_retries_once_on_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let result = client(&server).fetch_latest(FetchProfile::FULL_REFRESH).await;
    assert!(matches!(result, Err(FetchError::Rejected { status: 503 })));
    server.verify().await;
}

#[tokio::test]
async fn test_background_warm_never_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).fetch_latest(FetchProfile::BACKGROUND_WARM).await;
    assert!(matches!(result, Err(FetchError::Rejected { status: 503 })));
    server.verify().await;
}

#[tokio::test]
async fn test_on_demand_warm_times_out_as_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(6)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let started = Instant::now();
    let result = client(&server).fetch_latest(FetchProfile::ON_DEMAND_WARM).await;
    assert!(matches!(result, Err(FetchError::Unreachable(_))), "got {:?}", result);
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn test_refresh_one_retries_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REFRESH_PATH))
        .and(query_param("legacy_customer_id", "7"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REFRESH_PATH))
        .and(query_param("legacy_customer_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customer_id": 7,
            "phone_number": "5551234567",
            "inspection_number": 120
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client(&server).fetch_one(7).await;
    assert!(payload.is_ok(), "got {:?}", payload);
    server.verify().await;
}

#[tokio::test]
async fn test_malformed_body_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).fetch_latest(FetchProfile::FULL_REFRESH).await;
    assert!(matches!(result, Err(FetchError::Malformed(_))));
    server.verify().await;
}
