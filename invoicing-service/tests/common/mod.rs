#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use invoicing_service::models::InvoiceRecord;
use invoicing_service::services::{InMemoryInvoiceSource, RateProvider, StaticRateProvider};
use invoicing_service::startup::{AppState, Application};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub rates: Arc<StaticRateProvider>,
}

impl TestApp {
    /// Spawn with no stored invoices and a fixed GBP/EUR/NGN rate table.
    pub async fn spawn() -> Self {
        Self::spawn_with(Vec::new()).await
    }

    pub async fn spawn_with(invoices: Vec<InvoiceRecord>) -> Self {
        let rates = Arc::new(StaticRateProvider::new([
            ("GBP", dec!(0.79)),
            ("EUR", dec!(0.92)),
            ("NGN", dec!(1550)),
        ]));
        let port = Self::spawn_app(invoices, rates.clone()).await;

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
            rates,
        }
    }

    /// Spawn around an arbitrary rate provider; returns the base address.
    pub async fn spawn_with_provider(
        invoices: Vec<InvoiceRecord>,
        provider: Arc<dyn RateProvider>,
    ) -> String {
        let port = Self::spawn_app(invoices, provider).await;
        format!("http://127.0.0.1:{}", port)
    }

    async fn spawn_app(invoices: Vec<InvoiceRecord>, provider: Arc<dyn RateProvider>) -> u16 {
        let state = AppState::new(Arc::new(InMemoryInvoiceSource::new(invoices)), provider);
        let app = Application::build_with(0, state)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        port
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Stored invoice row for `user_id`, created `minute` minutes into the day.
pub fn invoice(user_id: Uuid, status: &str, data: Value, minute: u32) -> InvoiceRecord {
    InvoiceRecord {
        id: Uuid::new_v4(),
        user_id,
        client_id: None,
        currency: None,
        data,
        issued_date: None,
        due_date: None,
        status: status.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, minute, 0).single(),
    }
}
