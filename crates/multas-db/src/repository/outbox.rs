//! # Webhook Outbox Repository
//!
//! Queue of events for the workflow-automation webhook.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  create_charge / update_status                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. INSERT/UPDATE charges                                       │   │
//! │  │  2. INSERT INTO webhook_outbox (event_type, entity_id, payload) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← both rows or neither                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Webhook worker                                                        │
//! │  1. GET /webhooks/pending      → get_pending()                         │
//! │  2. POST to automation webhook                                         │
//! │  3. success → mark_delivered()   failure → mark_failed()               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use multas_core::WebhookOutboxEntry;

const OUTBOX_COLUMNS: &str = "id, tenant_id, event_type, entity_id, payload, \
    attempts, last_error, created_at, attempted_at, delivered_at";

/// Builds a fresh, undelivered entry.
pub(crate) fn new_entry(
    tenant_id: &str,
    event_type: &str,
    entity_id: &str,
    payload: String,
) -> WebhookOutboxEntry {
    WebhookOutboxEntry {
        id: Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        event_type: event_type.to_string(),
        entity_id: entity_id.to_string(),
        payload,
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        attempted_at: None,
        delivered_at: None,
    }
}

/// Inserts an entry on an open connection, so callers can write it in the
/// same transaction as the entity it describes.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: &WebhookOutboxEntry,
) -> DbResult<()> {
    debug!(
        event_type = %entry.event_type,
        entity_id = %entry.entity_id,
        "Queuing webhook event"
    );

    sqlx::query(
        r#"
        INSERT INTO webhook_outbox (
            id, tenant_id, event_type, entity_id, payload,
            attempts, last_error, created_at, attempted_at, delivered_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.tenant_id)
    .bind(&entry.event_type)
    .bind(&entry.entity_id)
    .bind(&entry.payload)
    .bind(entry.attempts)
    .bind(&entry.last_error)
    .bind(entry.created_at)
    .bind(entry.attempted_at)
    .bind(entry.delivered_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Repository for webhook outbox operations.
#[derive(Debug, Clone)]
pub struct WebhookOutboxRepository {
    pool: SqlitePool,
}

impl WebhookOutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WebhookOutboxRepository { pool }
    }

    /// Queues an event outside of any entity write. Production writes go
    /// through [`insert_entry`] inside the charge transaction.
    #[cfg(test)]
    async fn enqueue(
        &self,
        tenant_id: &str,
        event_type: &str,
        entity_id: &str,
        payload: &str,
    ) -> DbResult<WebhookOutboxEntry> {
        let entry = new_entry(tenant_id, event_type, entity_id, payload.to_string());

        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut *conn, &entry).await?;

        Ok(entry)
    }

    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<WebhookOutboxEntry>> {
        let sql = format!(
            "SELECT {} FROM webhook_outbox WHERE tenant_id = ?1 AND id = ?2",
            OUTBOX_COLUMNS
        );

        let entry = sqlx::query_as::<_, WebhookOutboxEntry>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    /// Gets entries not yet delivered, oldest first.
    pub async fn get_pending(&self, tenant_id: &str, limit: u32) -> DbResult<Vec<WebhookOutboxEntry>> {
        let sql = format!(
            "SELECT {} FROM webhook_outbox \
             WHERE tenant_id = ?1 AND delivered_at IS NULL \
             ORDER BY created_at ASC, rowid ASC \
             LIMIT ?2",
            OUTBOX_COLUMNS
        );

        let entries = sqlx::query_as::<_, WebhookOutboxEntry>(&sql)
            .bind(tenant_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Marks an entry as delivered. Delivering twice is harmless.
    pub async fn mark_delivered(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE webhook_outbox SET
                delivered_at = COALESCE(delivered_at, ?3),
                attempted_at = ?3
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("WebhookOutboxEntry", id));
        }

        Ok(())
    }

    /// Records a failed delivery attempt.
    pub async fn mark_failed(&self, tenant_id: &str, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE webhook_outbox SET
                attempts = attempts + 1,
                last_error = ?3,
                attempted_at = ?4
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("WebhookOutboxEntry", id));
        }

        Ok(())
    }

    pub async fn count_pending(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM webhook_outbox WHERE tenant_id = ?1 AND delivered_at IS NULL",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Deletes entries delivered more than `days_old` days ago.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_delivered(&self, days_old: u32) -> DbResult<u64> {
        // Timestamps are stored as RFC 3339 text, so the cutoff is computed
        // here rather than with SQLite's datetime().
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM webhook_outbox WHERE delivered_at IS NOT NULL AND delivered_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
