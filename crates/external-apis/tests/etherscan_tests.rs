// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `EtherscanClient`
//!
//! These tests use wiremock to mock the explorer and check envelope handling,
//! retries on rate limit bodies and persistence of token info.

use abi_decoder::AbiCache;
use alloy_primitives::{Address, B256, U256};
use api_client::{ApiClient, ApiError, HealthStatus};
use chrono::NaiveDate;
use external_apis::{Closest, EtherscanClient};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, query_param},
};

use fixtures::*;

const ERC20_TRANSFER_ABI: &str = r#"[{"anonymous":false,"inputs":[{"indexed":true,"name":"from","type":"address"},{"indexed":true,"name":"to","type":"address"},{"indexed":false,"name":"value","type":"uint256"}],"name":"Transfer","type":"event"}]"#;

fn client(server: &MockServer, max_retries: u32) -> EtherscanClient {
    EtherscanClient::new(explorer_config(server.uri(), max_retries)).unwrap()
}

fn address() -> Address {
    TEST_ADDRESS.parse().unwrap()
}

#[tokio::test]
async fn tx_receipt_and_gas_info() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("module", "proxy"))
        .and(query_param("action", "eth_getTransactionReceipt"))
        .and(query_param("txhash", TEST_TX_HASH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ExplorerFixture::rpc(ExplorerFixture::receipt())),
        )
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 0);
    let tx_hash: B256 = TEST_TX_HASH.parse().unwrap();

    let receipt = client.get_tx_receipt(tx_hash).await.unwrap().unwrap();
    assert_eq!(receipt.block_number().unwrap(), 0x00e0_a2b1);
    assert_eq!(receipt.succeeded(), Some(true));

    let gas = client.get_tx_gas_info(tx_hash).await.unwrap();
    assert_eq!(gas.gas_used, U256::from(21_000));
    assert_eq!(gas.gas_price_wei, U256::from(1_000_000_000_u64));
    assert_eq!(gas.tx_gas_cost_wei(), U256::from(21_000_000_000_000_u64));
    assert_eq!(gas.eth_price_usd, None);
}

#[tokio::test]
async fn missing_receipt_is_not_found() {
    let mock_server = MockServer::start().await;
    ExplorerFixture::mount(
        &mock_server,
        "proxy",
        "eth_getTransactionReceipt",
        ExplorerFixture::rpc(Value::Null),
    )
    .await;

    let client = client(&mock_server, 0);
    let tx_hash = B256::repeat_byte(0x11);

    assert!(client.get_tx_receipt(tx_hash).await.unwrap().is_none());
    let result = client.get_tx_gas_info(tx_hash).await;
    assert!(matches!(result, Err(ApiError::NotFound { .. })));
}

#[tokio::test]
async fn normal_transactions_sorted_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("module", "account"))
        .and(query_param("action", "txlist"))
        .and(query_param("address", address().to_string()))
        .and(query_param("startblock", "0"))
        .and(query_param("endblock", "99999999"))
        .and(query_param("sort", "asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!([
            ExplorerFixture::normal_tx(16_000_000, 0xaa),
            ExplorerFixture::normal_tx(16_000_005, 0xbb)
        ]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let txs = client(&mock_server, 0)
        .get_normal_transactions(address())
        .await
        .unwrap();

    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].block_number, 16_000_000);
    assert_eq!(txs[0].value, U256::from(10).pow(U256::from(18)));
    assert_eq!(txs[0].to, Some(address()));
    assert_eq!(txs[0].contract_address, None);
    assert!(!txs[1].is_error());
}

#[tokio::test]
async fn no_transactions_is_empty() {
    let mock_server = MockServer::start().await;
    ExplorerFixture::mount(
        &mock_server,
        "account",
        "txlistinternal",
        ExplorerFixture::no_records(),
    )
    .await;

    let txs = client(&mock_server, 0)
        .get_internal_transactions(address())
        .await
        .unwrap();
    assert!(txs.is_empty());
}

#[tokio::test]
async fn rate_limit_body_is_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "ethprice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::rate_limited()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "ethprice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!({
            "ethbtc": "0.05412",
            "ethbtc_timestamp": "1704067200",
            "ethusd": "2281.72",
            "ethusd_timestamp": "1704067199"
        }))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let price = client(&mock_server, 2).get_eth_price().await.unwrap();
    assert!((price.ethusd - 2281.72).abs() < f64::EPSILON);
    assert_eq!(price.ethusd_timestamp, 1_704_067_199);
}

#[tokio::test]
async fn invalid_key_is_authentication_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::invalid_key()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 3).gas_oracle().await;
    assert!(matches!(result, Err(ApiError::Authentication { .. })));
}

#[tokio::test]
async fn block_by_timestamp() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("module", "block"))
        .and(query_param("action", "getblocknobytime"))
        .and(query_param("timestamp", "1578638524"))
        .and(query_param("closest", "after"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!("9251482"))),
        )
        .mount(&mock_server)
        .await;

    let block = client(&mock_server, 0)
        .get_block_number_by_timestamp(1_578_638_524, Closest::After)
        .await
        .unwrap();
    assert_eq!(block, 9_251_482);
}

#[tokio::test]
async fn daily_gas_price_range() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "dailyavggasprice"))
        .and(query_param("startdate", "2019-02-01"))
        .and(query_param("enddate", "2019-02-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!([
            {"UTCDate": "2019-02-01", "unixTimeStamp": "1548979200", "avgGasPrice_Wei": "17448726727"},
            {"UTCDate": "2019-02-02", "unixTimeStamp": "1549065600", "avgGasPrice_Wei": "16194948018"}
        ]))))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 0);
    let start = NaiveDate::from_ymd_opt(2019, 2, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2019, 2, 2).unwrap();

    let prices = client.get_gas_price_daily_avg(start, end).await.unwrap();
    assert_eq!(prices.len(), 2);
    assert_eq!(prices[1].utc_date, end);
    assert_eq!(prices[0].avg_gas_price_wei, U256::from(17_448_726_727_u64));

    let reversed = client.get_gas_price_daily_avg(end, start).await;
    assert!(matches!(reversed, Err(ApiError::InvalidInput { .. })));
}

#[tokio::test]
async fn token_info_saved_and_merged() {
    let mock_server = MockServer::start().await;
    let known = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";
    let unknown = "0x000000000000000000000000000000000000dead";
    Mock::given(method("GET"))
        .and(query_param("action", "tokeninfo"))
        .and(query_param("contractaddress", known))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!([{
            "contractAddress": known,
            "tokenName": "Uniswap",
            "symbol": "UNI",
            "divisor": "18"
        }]))))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "tokeninfo"))
        .and(query_param("contractaddress", unknown))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!([]))))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token_info.json");
    std::fs::write(&path, r#"{"0xold": {"symbol": "OLD"}}"#).unwrap();

    let tokens = client(&mock_server, 0)
        .get_token_info(&[known.to_string(), unknown.to_string()], Some(dir.path()))
        .await
        .unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[known]["symbol"], json!("UNI"));

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["0xold"]["symbol"], json!("OLD"));
    assert_eq!(saved[known]["tokenName"], json!("Uniswap"));
}

#[tokio::test]
async fn token_info_keys_by_normalised_address() {
    let mock_server = MockServer::start().await;
    let lower = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";
    Mock::given(method("GET"))
        .and(query_param("action", "tokeninfo"))
        .and(query_param("contractaddress", lower))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::ok(json!([{
            "contractAddress": lower,
            "symbol": "UNI"
        }]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let ids = [
        "0x1F9840A85D5AF5BF1D1762F925BDADDC4201F984".to_string(),
        "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984".to_string(),
        lower.to_string(),
    ];
    let tokens = client(&mock_server, 0)
        .get_token_info(&ids, None)
        .await
        .unwrap();

    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[lower]["symbol"], json!("UNI"));

    let invalid = client(&mock_server, 0)
        .get_token_info(&["not-an-address".to_string()], None)
        .await;
    assert!(matches!(invalid, Err(ApiError::InvalidInput { .. })));
}

#[tokio::test]
async fn token_info_requires_ids() {
    let mock_server = MockServer::start().await;
    let result = client(&mock_server, 0).get_token_info(&[], None).await;
    assert!(matches!(result, Err(ApiError::InvalidInput { .. })));
}

#[tokio::test]
async fn contract_decoder_is_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("module", "contract"))
        .and(query_param("action", "getabi"))
        .and(query_param("address", address().to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ExplorerFixture::ok(json!(ERC20_TRANSFER_ABI))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 0);
    let cache = AbiCache::new();

    let first = client.contract_decoder(address(), &cache).await.unwrap();
    let second = client.contract_decoder(address(), &cache).await.unwrap();
    assert_eq!(first.abi().events.len(), 1);
    assert_eq!(second.abi().events.len(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn unverified_contract_is_looked_up_once() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "getabi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Contract source code not verified"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 0);
    let cache = AbiCache::new();

    let first = client.contract_decoder(address(), &cache).await;
    let second = client.contract_decoder(address(), &cache).await;
    assert!(matches!(first, Err(ApiError::Provider { .. })));
    match second {
        Err(ApiError::InvalidResponse { message }) => {
            assert!(message.contains("Contract source code not verified"));
        }
        other => panic!("expected cached failure, got {other:?}"),
    }
    assert!(cache.is_empty());
    assert_eq!(cache.stats().unavailable_count, 1);
}

#[tokio::test]
async fn transient_abi_failure_is_not_remembered() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("action", "getabi"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "getabi"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ExplorerFixture::ok(json!(ERC20_TRANSFER_ABI))),
        )
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 0);
    let cache = AbiCache::new();

    assert!(client.contract_decoder(address(), &cache).await.is_err());
    assert_eq!(cache.stats().unavailable_count, 0);
    assert!(client.contract_decoder(address(), &cache).await.is_ok());
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn health_check_statuses() {
    let mock_server = MockServer::start().await;
    ExplorerFixture::mount(
        &mock_server,
        "proxy",
        "eth_blockNumber",
        ExplorerFixture::rpc(json!("0x12a05f2")),
    )
    .await;

    let client = client(&mock_server, 0);
    assert_eq!(client.health_check().await.unwrap(), HealthStatus::Up);
    assert_eq!(client.name(), "etherscan");

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ExplorerFixture::invalid_key()))
        .mount(&failing)
        .await;
    let status = EtherscanClient::new(explorer_config(failing.uri(), 0))
        .unwrap()
        .health_check()
        .await
        .unwrap();
    assert!(status.is_down());
}
