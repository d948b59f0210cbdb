mod common;

use common::TestApp;
use invoicing_service::services::{RateError, StaticRateProvider};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn aggregates_mixed_currency_snapshots() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/invoices/aggregate"))
        .json(&json!({
            "target_currency": "USD",
            "invoices": [
                {"status": "paid", "currency": "USD", "total": 100},
                {"status": "paid", "currency": "GBP", "total": 50},
                {"status": "draft", "currency": "EUR", "total": 70},
            ],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["total_revenue"].as_f64(), Some(163.29));
    assert_eq!(body["total_outstanding"].as_f64(), Some(0.0));
    assert_eq!(body["total_invoices"], 3);
    assert_eq!(body["draft_invoices"], 1);
    assert_eq!(body["currency_metrics"]["EUR"]["draft_invoices"], 1);
}

#[tokio::test]
async fn snapshots_may_carry_raw_payloads() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(app.url("/api/invoices/aggregate"))
        .json(&json!({
            "currency": "NGN",
            "invoices": [{
                "status": "sent",
                "data": {
                    "currency": "NGN",
                    "items": [{"quantity": 3, "unit_cost": "1000"}],
                    "show_shipping": true,
                    "shipping_amount": 500,
                },
            }],
        }))
        .send()
        .await
        .unwrap();

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["target_currency"], "NGN");
    assert_eq!(body["total_outstanding"].as_f64(), Some(3500.0));
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway_not_zero() {
    let provider = Arc::new(StaticRateProvider::failing(RateError::NotConfigured(
        "EXCHANGE_RATES_API_KEY is not set".to_string(),
    )));
    let address = TestApp::spawn_with_provider(Vec::new(), provider).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/invoices/aggregate", address))
        .json(&json!({
            "target_currency": "USD",
            "invoices": [{"status": "paid", "currency": "GBP", "total": 50}],
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("EXCHANGE_RATES_API_KEY is not set"));
}

#[tokio::test]
async fn oversized_batches_are_rejected() {
    let app = TestApp::spawn().await;
    let invoices: Vec<Value> = (0..10_001)
        .map(|_| json!({"status": "paid", "total": 1}))
        .collect();

    let response = app
        .client
        .post(app.url("/api/invoices/aggregate"))
        .json(&json!({"invoices": invoices}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
}
