// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `CoinMarketCapClient`

use api_client::{ApiClient, ApiError, HealthStatus};
use external_apis::{CmcCategory, CmcEndpoint, CmcPath, CoinMarketCapClient};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param, query_param_is_missing},
};

use fixtures::*;

fn client(server: &MockServer) -> CoinMarketCapClient {
    CoinMarketCapClient::new(coinmarketcap_config(server.uri())).unwrap()
}

#[tokio::test]
async fn id_map_sends_key_and_aliases_symbols() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cryptocurrency/map"))
        .and(query_param("symbol", "BTC,EWT"))
        .and(header("X-CMC_PRO_API_KEY", TEST_API_KEY))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(CoinMarketCapFixture::ok(json!([
            CoinMarketCapFixture::id_map(1, "BTC", "bitcoin"),
            CoinMarketCapFixture::id_map(5268, "EWT", "energy-web-token")
        ]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let maps = client(&mock_server)
        .cmc_id_map(&["BTC".to_string(), "EWTB".to_string()], None)
        .await
        .unwrap();

    assert_eq!(maps.len(), 2);
    assert_eq!(maps[1].id, 5268);
    assert_eq!(maps[1].slug, "energy-web-token");
}

#[tokio::test]
async fn id_map_all_sends_no_symbol_filter() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cryptocurrency/map"))
        .and(query_param_is_missing("symbol"))
        .respond_with(ResponseTemplate::new(200).set_body_json(CoinMarketCapFixture::ok(json!([
            CoinMarketCapFixture::id_map(1027, "ETH", "ethereum")
        ]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let maps = client(&mock_server)
        .cmc_id_map(&["all".to_string()], None)
        .await
        .unwrap();
    assert_eq!(maps[0].symbol, "ETH");
}

#[tokio::test]
async fn id_maps_saved_sorted_and_merged() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cryptocurrency/map"))
        .respond_with(ResponseTemplate::new(200).set_body_json(CoinMarketCapFixture::ok(json!([
            CoinMarketCapFixture::id_map(1027, "ETH", "ethereum"),
            CoinMarketCapFixture::id_map(1, "BTC", "bitcoin")
        ]))))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cmc_id_maps.json");
    std::fs::write(
        &path,
        serde_json::to_string(&json!([
            {"id": 825, "symbol": "USDT", "name": "Tether", "slug": "tether"},
            {"id": 1, "symbol": "BTC", "name": "stale", "slug": "bitcoin"}
        ]))
        .unwrap(),
    )
    .unwrap();

    client(&mock_server)
        .cmc_id_map(&["BTC".to_string(), "ETH".to_string()], Some(dir.path()))
        .await
        .unwrap();

    let saved: Vec<Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let ids: Vec<u64> = saved.iter().map(|e| e["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, [1, 825, 1027]);
    assert_eq!(saved[0]["name"], json!("bitcoin"));
}

#[tokio::test]
async fn save_rejects_bad_filename_and_missing_dir() {
    let mock_server = MockServer::start().await;
    let client = client(&mock_server);
    let dir = tempfile::tempdir().unwrap();

    let result = client
        .save_cmc_id_maps(&[], Some("maps.csv"), Some(dir.path()))
        .await;
    assert!(matches!(result, Err(ApiError::Storage { .. })));

    let missing = dir.path().join("nope");
    let result = client.save_cmc_id_maps(&[], None, Some(&missing)).await;
    assert!(matches!(result, Err(ApiError::Storage { .. })));
}

#[tokio::test]
async fn error_code_is_provider_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cryptocurrency/info"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(CoinMarketCapFixture::error(400, "Invalid value for \"symbol\"")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server)
        .cryptocurrency_info(&["???".to_string()])
        .await;
    assert!(matches!(result, Err(ApiError::Provider { .. })));
}

#[tokio::test]
async fn quotes_latest_with_convert() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cryptocurrency/quotes/latest"))
        .and(query_param("symbol", "ETH"))
        .and(query_param("convert", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(CoinMarketCapFixture::ok(json!({
            "ETH": {"id": 1027, "quote": {"EUR": {"price": 2100.5}}}
        }))))
        .mount(&mock_server)
        .await;

    let quotes = client(&mock_server)
        .quotes_latest(&["ETH".to_string()], Some("EUR"))
        .await
        .unwrap();
    assert_eq!(quotes["ETH"]["quote"]["EUR"]["price"], json!(2100.5));
}

#[tokio::test]
async fn run_query_returns_whole_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/global-metrics/quotes/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(CoinMarketCapFixture::ok(json!({
            "btc_dominance": 51.2
        }))))
        .mount(&mock_server)
        .await;

    let endpoint =
        CmcEndpoint::new(CmcCategory::GlobalMetrics, CmcPath::Latest).with_resource("quotes");
    let body = client(&mock_server).run_query(&endpoint, &[]).await.unwrap();
    assert_eq!(body["status"]["error_code"], json!(0));
    assert_eq!(body["data"]["btc_dominance"], json!(51.2));
}

#[tokio::test]
async fn health_check_uses_key_info() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/key/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(CoinMarketCapFixture::ok(json!({}))))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server);
    assert_eq!(client.health_check().await.unwrap(), HealthStatus::Up);
    assert_eq!(client.name(), "coinmarketcap");
}
