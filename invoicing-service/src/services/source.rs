//! Read-only invoice sources.
//!
//! The service never writes invoices; it reads the rows owned by the main
//! application database and derives everything else.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::InvoiceRecord;
use crate::services::metrics::DB_QUERY_DURATION;

/// Supplies persisted invoices for a user.
#[async_trait]
pub trait InvoiceSource: Send + Sync {
    /// All invoices owned by `user_id`, oldest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InvoiceRecord>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

/// PostgreSQL-backed source reading the `invoices` table.
#[derive(Clone)]
pub struct PgInvoiceSource {
    pool: PgPool,
}

impl PgInvoiceSource {
    /// Create a lazily-connecting pool; the first query opens a connection.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        info!(max_connections = max_connections, "Configuring PostgreSQL pool");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_lazy(database_url)
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Invalid database URL: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InvoiceSource for PgInvoiceSource {
    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InvoiceRecord>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices_for_user"])
            .start_timer();

        let invoices = sqlx::query_as::<_, InvoiceRecord>(
            r#"
            SELECT id, user_id, client_id, data->>'currency' AS currency, data::jsonb AS data,
                   issued_date, due_date, COALESCE(status, 'draft') AS status,
                   created_at AT TIME ZONE 'UTC' AS created_at
            FROM invoices
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        info!(user_id = %user_id, count = invoices.len(), "Loaded invoices");
        Ok(invoices)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

/// In-process source for tests and database-less runs.
#[derive(Default)]
pub struct InMemoryInvoiceSource {
    invoices: RwLock<Vec<InvoiceRecord>>,
}

impl InMemoryInvoiceSource {
    pub fn new(invoices: Vec<InvoiceRecord>) -> Self {
        Self {
            invoices: RwLock::new(invoices),
        }
    }

    pub fn insert(&self, invoice: InvoiceRecord) {
        if let Ok(mut invoices) = self.invoices.write() {
            invoices.push(invoice);
        }
    }
}

#[async_trait]
impl InvoiceSource for InMemoryInvoiceSource {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<InvoiceRecord>, AppError> {
        let invoices = self
            .invoices
            .read()
            .map_err(|_| AppError::DatabaseError(anyhow::anyhow!("Invoice store poisoned")))?;

        let mut owned: Vec<InvoiceRecord> = invoices
            .iter()
            .filter(|inv| inv.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(owned)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn invoice(user_id: Uuid, hour: u32) -> InvoiceRecord {
        InvoiceRecord {
            id: Uuid::new_v4(),
            user_id,
            client_id: None,
            currency: None,
            data: json!({}),
            issued_date: None,
            due_date: None,
            status: "draft".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).single(),
        }
    }

    #[tokio::test]
    async fn lists_only_the_users_invoices_oldest_first() {
        let user = Uuid::new_v4();
        let source = InMemoryInvoiceSource::new(vec![
            invoice(user, 12),
            invoice(Uuid::new_v4(), 9),
            invoice(user, 8),
        ]);
        source.insert(invoice(user, 10));

        let listed = source.list_for_user(user).await.unwrap();

        let hours: Vec<_> = listed
            .iter()
            .map(|inv| inv.created_at.unwrap().format("%H").to_string())
            .collect();
        assert_eq!(hours, vec!["08", "10", "12"]);
    }
}
