//! Mock risk and list APIs using wiremock.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use riskgate_client::{ListApiClient, RetryPolicy, RiskApiClient};

pub const TEST_TOKEN: &str = "test-token-123";

/// A mock server hosting both APIs.
pub struct MockApiServer {
    server: MockServer,
}

impl MockApiServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Retry policy with no delays so tests run fast.
    pub fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    pub fn risk_client(&self) -> RiskApiClient {
        RiskApiClient::with_http_client(
            &self.uri(),
            TEST_TOKEN,
            reqwest::Client::new(),
            Self::fast_retry(),
        )
        .unwrap()
    }

    pub fn list_client(&self) -> ListApiClient {
        ListApiClient::with_http_client(
            &self.uri(),
            TEST_TOKEN,
            reqwest::Client::new(),
            Self::fast_retry(),
        )
        .unwrap()
    }

    /// Standard success envelope.
    pub fn envelope(result: Value, page: u32, per_page: u32, total_pages: u32) -> Value {
        json!({
            "success": true,
            "errors": [],
            "messages": [],
            "result": result,
            "result_info": {
                "page": page,
                "per_page": per_page,
                "total_pages": total_pages,
                "total_count": 0
            }
        })
    }

    /// Mount one page of risk scores.
    pub async fn mock_risk_page(&self, page: u32, total_pages: u32, scores: Value) {
        Mock::given(method("GET"))
            .and(path("/risk-scores"))
            .and(query_param("page", page.to_string()))
            .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Self::envelope(scores, page, 100, total_pages)),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount one page of list items.
    pub async fn mock_list_page(&self, list_id: &str, page: u32, total_pages: u32, values: &[&str]) {
        let items: Vec<Value> = values
            .iter()
            .map(|v| json!({ "value": v, "description": "seeded" }))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/lists/{list_id}/items")))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Self::envelope(Value::Array(items), page, 100, total_pages)),
            )
            .mount(&self.server)
            .await;
    }

    /// Mount a successful PATCH for a list.
    pub async fn mock_patch_success(&self, list_id: &str) {
        Mock::given(method("PATCH"))
            .and(path(format!("/lists/{list_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "id": list_id }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a PATCH that the store rejects inside a 200 envelope.
    pub async fn mock_patch_rejected(&self, list_id: &str, message: &str) {
        Mock::given(method("PATCH"))
            .and(path(format!("/lists/{list_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 7003, "message": message }],
                "result": null
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a successful PUT for a list.
    pub async fn mock_replace_success(&self, list_id: &str) {
        Mock::given(method("PUT"))
            .and(path(format!("/lists/{list_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "errors": [],
                "result": { "id": list_id }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mount a fixed status for every request to `route`.
    pub async fn mock_status(&self, http_method: &str, route: &str, status: u16) {
        Mock::given(method(http_method))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&self.server)
            .await;
    }
}
