// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `HttpFetcher`
//!
//! These tests use wiremock to exercise status mapping, retries and health checks.

use std::time::Duration;

use api_client::{
    ApiError, FetchSettings, HealthStatus, HttpFetcher, RateLimitConfig, RateLimiter, build_url,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

fn test_settings(max_retries: u32) -> FetchSettings {
    FetchSettings {
        timeout_seconds: 5,
        max_retries,
        retry_base_delay_ms: 2,
        rate_limit: RateLimitConfig {
            requests_per_second: 1000,
            retry_after_seconds: 9,
        },
    }
}

fn fetcher(max_retries: u32) -> HttpFetcher {
    HttpFetcher::new("test", &test_settings(max_retries)).unwrap()
}

#[tokio::test]
async fn get_json_success_with_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/key/info"))
        .and(query_param("symbol", "BTC"))
        .and(header("X-CMC_PRO_API_KEY", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("X-CMC_PRO_API_KEY", HeaderValue::from_static("test-api-key"));
    let url = build_url(&mock_server.uri(), &["v1", "key", "info"], &[("symbol", "BTC")]).unwrap();

    let body: Value = fetcher(0).get_json(&url, &headers).await.unwrap();
    assert_eq!(body["data"]["ok"], json!(true));
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = build_url(&mock_server.uri(), &["secure"], &[]).unwrap();
    let result: Result<Value, _> = fetcher(3).get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(result, Err(ApiError::Authentication { .. })));
}

#[tokio::test]
async fn forbidden_maps_to_authentication() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let url = build_url(&mock_server.uri(), &["x"], &[]).unwrap();
    let result: Result<Value, _> = fetcher(0).get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(result, Err(ApiError::Authentication { .. })));
}

#[tokio::test]
async fn rate_limited_reports_retry_after_header() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited-no-header"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = fetcher(0);

    let url = build_url(&mock_server.uri(), &["limited"], &[]).unwrap();
    let result: Result<Value, _> = client.get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(
        result,
        Err(ApiError::RateLimitExceeded {
            retry_after_seconds: 7
        })
    ));

    let url = build_url(&mock_server.uri(), &["limited-no-header"], &[]).unwrap();
    let result: Result<Value, _> = client.get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(
        result,
        Err(ApiError::RateLimitExceeded {
            retry_after_seconds: 9
        })
    ));
}

#[tokio::test]
async fn rate_limited_retry_waits_for_retry_after() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = build_url(&mock_server.uri(), &["limited"], &[]).unwrap();
    let started = std::time::Instant::now();
    let result: Value = fetcher(1).get_json(&url, &HeaderMap::new()).await.unwrap();

    assert_eq!(result, json!({"ok": true}));
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": 42})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = build_url(&mock_server.uri(), &["flaky"], &[]).unwrap();
    let body: Value = fetcher(3).get_json(&url, &HeaderMap::new()).await.unwrap();
    assert_eq!(body["value"], json!(42));
}

#[tokio::test]
async fn retries_are_bounded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let url = build_url(&mock_server.uri(), &["down"], &[]).unwrap();
    let result: Result<Value, _> = fetcher(2).get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(result, Err(ApiError::ServiceUnavailable { .. })));
}

#[tokio::test]
async fn not_found_and_unexpected_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad parameter"))
        .mount(&mock_server)
        .await;

    let client = fetcher(0);

    let url = build_url(&mock_server.uri(), &["missing"], &[]).unwrap();
    let result: Result<Value, _> = client.get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(result, Err(ApiError::NotFound { .. })));

    let url = build_url(&mock_server.uri(), &["bad"], &[]).unwrap();
    let result: Result<Value, _> = client.get_json(&url, &HeaderMap::new()).await;
    match result {
        Err(ApiError::UnexpectedStatus { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad parameter");
        }
        other => panic!("Expected UnexpectedStatus error, got: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let url = build_url(&mock_server.uri(), &["html"], &[]).unwrap();
    let result: Result<Value, _> = fetcher(2).get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(result, Err(ApiError::InvalidResponse { .. })));
}

#[tokio::test]
async fn slow_response_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let settings = FetchSettings {
        timeout_seconds: 1,
        ..test_settings(0)
    };
    let client = HttpFetcher::new("test", &settings).unwrap();
    let url = build_url(&mock_server.uri(), &["slow"], &[]).unwrap();

    let result: Result<Value, _> = client.get_json(&url, &HeaderMap::new()).await;
    assert!(matches!(
        result,
        Err(ApiError::Timeout { .. } | ApiError::Http { .. })
    ));
}

#[tokio::test]
async fn endpoint_limiter_is_honoured() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let client = fetcher(0);
    let endpoint_limiter = RateLimiter::new(10).unwrap();
    let url = build_url(&mock_server.uri(), &["token"], &[]).unwrap();

    let started = std::time::Instant::now();
    for _ in 0..3 {
        let _: Value = client
            .get_json_with(Some(&endpoint_limiter), &url, &HeaderMap::new())
            .await
            .unwrap();
    }
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn health_check_maps_statuses() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/unauthorized"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let client = fetcher(0);
    let check = |p: &'static str| {
        let url = build_url(&mock_server.uri(), &[p], &[]).unwrap();
        let client = client.clone();
        async move { client.check_health(&url, &HeaderMap::new()).await }
    };

    assert_eq!(check("up").await, HealthStatus::Up);
    assert!(check("unauthorized").await.is_down());
    assert_eq!(
        check("limited").await,
        HealthStatus::Degraded {
            reason: "Rate limited".to_string()
        }
    );
    assert_eq!(
        check("broken").await,
        HealthStatus::Degraded {
            reason: "API returned status 502".to_string()
        }
    );
}

#[tokio::test]
async fn health_check_reports_unreachable_host_as_down() {
    let client = fetcher(0);
    let url = build_url("http://127.0.0.1:1", &["health"], &[]).unwrap();
    assert!(client.check_health(&url, &HeaderMap::new()).await.is_down());
}
