//! Application startup and lifecycle management.

use axum::middleware::from_fn;
use axum::{
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::InvoicingConfig;
use crate::handlers;
use crate::services::metrics::http_metrics_middleware;
use crate::services::{
    AggregationEngine, CachedRateProvider, DashboardService, HttpRateConfig, HttpRateProvider,
    InMemoryInvoiceSource, InvoiceSource, PgInvoiceSource, RateProvider,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn InvoiceSource>,
    pub engine: AggregationEngine,
    pub dashboard: DashboardService,
}

impl AppState {
    pub fn new(source: Arc<dyn InvoiceSource>, rates: Arc<dyn RateProvider>) -> Self {
        let engine = AggregationEngine::new(rates);
        let dashboard = DashboardService::new(source.clone(), engine.clone());
        Self {
            source,
            engine,
            dashboard,
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        let source: Arc<dyn InvoiceSource> = match &config.database.url {
            Some(url) => Arc::new(PgInvoiceSource::connect_lazy(
                url.expose_secret(),
                config.database.max_connections,
            )?),
            None => {
                tracing::warn!("DATABASE_URL not set - serving from an empty in-memory invoice store");
                Arc::new(InMemoryInvoiceSource::default())
            }
        };

        let http = HttpRateProvider::new(HttpRateConfig {
            api_url: config.exchange_rates.api_url.clone(),
            api_key: config.exchange_rates.api_key.clone(),
            timeout: config.exchange_rates.timeout,
        })
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

        if http.is_configured() {
            tracing::info!(api_url = %config.exchange_rates.api_url, "Exchange rate provider configured");
        } else {
            tracing::warn!(
                "EXCHANGE_RATES_API_KEY not set - conversions into or out of non-USD currencies will fail"
            );
        }

        let rates: Arc<dyn RateProvider> = Arc::new(CachedRateProvider::new(
            Arc::new(http),
            config.exchange_rates.cache_ttl,
        ));

        Self::build_with(config.common.port, AppState::new(source, rates)).await
    }

    /// Build around pre-constructed collaborators. Port 0 binds a random port.
    pub async fn build_with(port: u16, state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Invoicing service: HTTP on port {}", port);

        Ok(Self {
            port,
            listener,
            router: router(state),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route(
            "/api/invoices/compute",
            post(handlers::invoices::compute_invoice),
        )
        .route(
            "/api/invoices/aggregate",
            post(handlers::invoices::aggregate_invoices),
        )
        .route(
            "/api/invoices/statistics",
            get(handlers::invoices::invoice_statistics),
        )
        .route(
            "/api/dashboard/summary",
            get(handlers::dashboard::dashboard_summary),
        )
        .route_layer(from_fn(http_metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install shutdown handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
