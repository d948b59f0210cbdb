//! HTTP rate provider against a mocked upstream.

mod common;

use common::{invoice, TestApp};
use invoicing_service::models::CurrencyCode;
use invoicing_service::services::{
    CachedRateProvider, HttpRateConfig, HttpRateProvider, RateError, RateProvider,
};
use rust_decimal_macros::dec;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer, timeout: Duration) -> HttpRateProvider {
    HttpRateProvider::new(HttpRateConfig {
        api_url: format!("{}/v2.0/rates/latest", server.uri()),
        api_key: Some(Secret::new("test-key".to_string())),
        timeout,
    })
    .expect("Failed to build provider")
}

#[tokio::test]
async fn fetches_usd_based_rates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/rates/latest"))
        .and(query_param("apikey", "test-key"))
        .and(query_param("base", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "date": "2024-06-01 00:00:00+00",
            "base": "USD",
            "rates": {"GBP": "0.79", "EUR": "0.92", "USD": "1.0"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let table = provider(&server, Duration::from_secs(10))
        .latest_rates()
        .await
        .unwrap();

    assert_eq!(table.rate(&CurrencyCode::from("GBP")), Some(dec!(0.79)));
    assert_eq!(table.rate(&CurrencyCode::usd()), Some(dec!(1)));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_secs(10))
        .latest_rates()
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RateError::Status {
            status: 401,
            body: "invalid key".to_string(),
        }
    );
}

#[tokio::test]
async fn missing_rates_key_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"base": "USD"})))
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_secs(10))
        .latest_rates()
        .await
        .unwrap_err();

    assert!(matches!(err, RateError::MalformedResponse(_)));
}

#[tokio::test]
async fn slow_provider_times_out_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"rates": {}}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = provider(&server, Duration::from_millis(200))
        .latest_rates()
        .await
        .unwrap_err();

    assert_eq!(err, RateError::Timeout(Duration::from_millis(200)));
}

#[tokio::test]
async fn cache_fetches_upstream_once_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rates": {"GBP": 0.79},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = CachedRateProvider::new(
        Arc::new(provider(&server, Duration::from_secs(10))),
        Duration::from_secs(300),
    );

    for _ in 0..3 {
        cache.latest_rates().await.unwrap();
    }
}

#[tokio::test]
async fn upstream_outage_surfaces_through_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let user = Uuid::new_v4();
    let address = TestApp::spawn_with_provider(
        vec![invoice(user, "paid", json!({"total": 50, "currency": "GBP"}), 1)],
        Arc::new(provider(&server, Duration::from_secs(10))),
    )
    .await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/dashboard/summary", address))
        .query(&[("user_id", user.to_string())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("503"));
}
