//! HTTP exchange rate provider.
//!
//! Talks to a "latest rates" endpoint shaped like CurrencyFreaks:
//! `GET {api_url}?apikey=..&base=USD` returning
//! `{"base": "USD", "rates": {"GBP": "0.79", ...}}`. Rates may be numbers or
//! numeric strings.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde_json::Value;
use std::time::{Duration, Instant};

use super::{ExchangeRateTable, RateError, RateProvider};
use crate::models::{parse_decimal, CurrencyCode};
use crate::services::metrics::{RATE_FETCHES_TOTAL, RATE_FETCH_DURATION};

/// Default CurrencyFreaks endpoint.
pub const DEFAULT_API_URL: &str = "https://api.currencyfreaks.com/v2.0/rates/latest";

/// HTTP provider configuration.
#[derive(Debug, Clone)]
pub struct HttpRateConfig {
    pub api_url: String,
    pub api_key: Option<Secret<String>>,
    pub timeout: Duration,
}

impl Default for HttpRateConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(15),
        }
    }
}

/// Exchange rate provider backed by an external HTTP API.
pub struct HttpRateProvider {
    config: HttpRateConfig,
    client: Client,
}

impl HttpRateProvider {
    pub fn new(config: HttpRateConfig) -> Result<Self, RateError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RateError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Check if an API key is set.
    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }

    async fn fetch(&self) -> Result<ExchangeRateTable, RateError> {
        let api_key = match &self.config.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => key,
            _ => {
                return Err(RateError::NotConfigured(
                    "EXCHANGE_RATES_API_KEY is not set".to_string(),
                ))
            }
        };

        let response = self
            .client
            .get(&self.config.api_url)
            .query(&[("apikey", api_key.expose_secret().as_str()), ("base", "USD")])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Exchange rate provider returned an error");
            return Err(RateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_rates(&body)
    }

    fn classify(&self, err: reqwest::Error) -> RateError {
        if err.is_timeout() {
            RateError::Timeout(self.config.timeout)
        } else {
            RateError::Network(err.without_url().to_string())
        }
    }
}

/// Parse a provider response body into a rate table.
///
/// Entries whose value is not numeric are dropped. A missing or non-object
/// `rates` key, or a negative rate, is malformed.
pub fn parse_rates(body: &str) -> Result<ExchangeRateTable, RateError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| RateError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let rates = json
        .get("rates")
        .and_then(Value::as_object)
        .ok_or_else(|| RateError::MalformedResponse("missing 'rates' object".to_string()))?;

    let mut parsed = Vec::with_capacity(rates.len());
    for (code, value) in rates {
        let rate = match value {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => None,
        };
        match rate {
            Some(rate) if rate.is_sign_negative() && !rate.is_zero() => {
                return Err(RateError::MalformedResponse(format!(
                    "negative rate for {}: {}",
                    code, rate
                )));
            }
            Some(rate) => parsed.push((CurrencyCode::normalize(code), rate)),
            None => tracing::warn!(currency = %code, "Skipping non-numeric exchange rate"),
        }
    }

    Ok(ExchangeRateTable::new(parsed))
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn latest_rates(&self) -> Result<ExchangeRateTable, RateError> {
        let started = Instant::now();
        let result = self.fetch().await;
        RATE_FETCH_DURATION
            .with_label_values(&[self.name()])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(table) => {
                RATE_FETCHES_TOTAL.with_label_values(&["ok"]).inc();
                tracing::info!(currencies = table.currency_count(), "Fetched exchange rates");
            }
            Err(err) => {
                RATE_FETCHES_TOTAL.with_label_values(&[err.kind()]).inc();
                tracing::error!(error = %err, "Exchange rate fetch failed");
            }
        }

        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
