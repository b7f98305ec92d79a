//! Integration tests for the risk-score client.

mod helpers;

use helpers::mock_api_server::MockApiServer;
use riskgate_core::{ClientError, RiskSource, RiskTier};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_fetch_risk_page_parses_records() {
    let server = MockApiServer::new().await;
    server
        .mock_risk_page(
            1,
            2,
            json!([
                { "email": "a@x.com", "risk_level": "high", "event_count": 3,
                  "last_event": "2026-10-01T12:00:00Z" },
                { "email": "b@x.com", "risk_level": "low", "event_count": 0 },
                { "email": "c@x.com", "risk_level": "unknown" }
            ]),
        )
        .await;

    let page = server.risk_client().fetch_risk_page(1, 100).await.unwrap();

    assert_eq!(page.current_page, 1);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].identifier, "a@x.com");
    assert_eq!(page.items[0].tier, RiskTier::High);
    assert!(page.items[0].last_event.is_some());
    assert_eq!(page.items[1].tier, RiskTier::Low);
}

#[tokio::test]
async fn test_fetch_risk_page_unauthorized() {
    let server = MockApiServer::new().await;
    server.mock_status("GET", "/risk-scores", 401).await;

    let result = server.risk_client().fetch_risk_page(1, 100).await;

    assert!(matches!(result, Err(ClientError::Auth { status: 401, .. })));
    assert_eq!(server.server().received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fetch_risk_page_rate_limited_exhausts_attempts() {
    let server = MockApiServer::new().await;
    Mock::given(method("GET"))
        .and(path("/risk-scores"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(server.server())
        .await;

    let result = server.risk_client().fetch_risk_page(1, 100).await;

    assert!(matches!(
        result,
        Err(ClientError::RateLimited {
            retry_after_secs: None
        })
    ));
    server.server().verify().await;
}

#[tokio::test]
async fn test_fetch_risk_page_server_error_after_retries() {
    let server = MockApiServer::new().await;
    server.mock_status("GET", "/risk-scores", 502).await;

    let result = server.risk_client().fetch_risk_page(1, 100).await;

    assert!(matches!(result, Err(ClientError::Server { status: 502, .. })));
    assert_eq!(server.server().received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_fetch_risk_page_malformed_body() {
    let server = MockApiServer::new().await;
    Mock::given(method("GET"))
        .and(path("/risk-scores"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(server.server())
        .await;

    let result = server.risk_client().fetch_risk_page(1, 100).await;

    assert!(matches!(result, Err(ClientError::Parse(_))));
}

#[tokio::test]
async fn test_ping_uses_single_item_page() {
    let server = MockApiServer::new().await;
    server.mock_risk_page(1, 1, json!([])).await;

    server.risk_client().ping().await.unwrap();

    let requests = server.server().received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.query().unwrap_or_default().contains("per_page=1"));
}
