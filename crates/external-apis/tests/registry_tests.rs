// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `ProviderRegistry` health reporting

use external_apis::{
    CoinMarketCapClient, DefiLlamaClient, EtherscanClient, MessariClient, ProviderRegistry,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use fixtures::*;

#[tokio::test]
async fn overall_health_reports_every_registered_client() {
    let llama = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chains"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&llama)
        .await;

    let explorer = MockServer::start().await;
    ExplorerFixture::mount(
        &explorer,
        "proxy",
        "eth_blockNumber",
        ExplorerFixture::rpc(json!("0x1")),
    )
    .await;

    let cmc = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&cmc)
        .await;

    let messari = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&messari)
        .await;

    let registry = ProviderRegistry::new()
        .with_defillama(DefiLlamaClient::new(defillama_config(llama.uri())).unwrap())
        .with_etherscan(EtherscanClient::new(explorer_config(explorer.uri(), 0)).unwrap())
        .with_coinmarketcap(CoinMarketCapClient::new(coinmarketcap_config(cmc.uri())).unwrap())
        .with_messari(MessariClient::new(messari_config(messari.uri())).unwrap());

    assert_eq!(registry.client_count(), 4);
    assert_eq!(
        registry.client_names(),
        ["etherscan", "coinmarketcap", "messari", "defillama"]
    );

    let health = registry.overall_health().await;
    assert_eq!(health.len(), 4);
    assert!(health["defillama"].status.is_available());
    assert!(health["etherscan"].status.is_available());
    assert!(health["coinmarketcap"].status.is_down());
    assert!(health["messari"].status.is_available());
    assert!(!health["messari"].status.is_down());
    assert!(!health.contains_key("ftmscan"));
}

#[tokio::test]
async fn failed_explorer_check_is_down() {
    let explorer = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&explorer)
        .await;

    let registry = ProviderRegistry::new()
        .with_etherscan(EtherscanClient::new(explorer_config(explorer.uri(), 0)).unwrap());

    let health = registry.overall_health().await;
    let etherscan = &health["etherscan"];
    assert!(etherscan.status.is_down());
    assert!(etherscan.status.description().starts_with("Health check failed"));
}
