//! # Charge Repository
//!
//! Database operations for charges.
//!
//! ## Charge Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Charge Operations                                │
//! │                                                                         │
//! │  1. create_with_outbox()                                               │
//! │     └── INSERT charges + INSERT webhook_outbox (charge.created)        │
//! │                                                                         │
//! │  2. update_status(next)                                                │
//! │     ├── SELECT status          ← lifecycle check                       │
//! │     ├── UPDATE charges ... WHERE status = <current>                    │
//! │     └── INSERT webhook_outbox (charge.status_changed)                  │
//! │                                                                         │
//! │  3. margin_summary(service_id)                                         │
//! │     └── SUM over the frozen snapshot columns                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::outbox::{insert_entry, new_entry};
use multas_core::{
    Charge, ChargeStatus, ChargeStatusChangedPayload, ChargeWebhookPayload, CoreError, Money,
    WebhookOutboxEntry, CHARGE_CREATED_EVENT, CHARGE_STATUS_CHANGED_EVENT,
};

const CHARGE_COLUMNS: &str = "id, tenant_id, service_id, customer_name, customer_document, \
    description, billing_type, status, amount_cents, acsm_value_cents, icetran_value_cents, \
    taxa_cobranca_cents, margin_cents, below_minimum, due_date, external_reference, \
    created_at, updated_at";

/// Filter for [`ChargeRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct ChargeFilter {
    pub service_id: Option<String>,
    pub status: Option<ChargeStatus>,
    /// Maximum rows returned. Default: 50
    pub limit: Option<u32>,
}

/// Aggregates over a service's charges.
///
/// Cancelled and refunded charges are excluded: their margin never
/// materialises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarginSummary {
    pub charge_count: i64,
    pub total_amount_cents: i64,
    pub total_margin_cents: i64,
    pub below_minimum_count: i64,
}

impl MarginSummary {
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    pub fn total_margin(&self) -> Money {
        Money::from_cents(self.total_margin_cents)
    }
}

/// Repository for charge database operations.
#[derive(Debug, Clone)]
pub struct ChargeRepository {
    pool: SqlitePool,
}

impl ChargeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ChargeRepository { pool }
    }

    /// Inserts a charge and its `charge.created` webhook event atomically.
    ///
    /// ## Returns
    /// The outbox entry that was queued.
    pub async fn create_with_outbox(
        &self,
        charge: &Charge,
        payload: &ChargeWebhookPayload,
    ) -> DbResult<WebhookOutboxEntry> {
        debug!(
            id = %charge.id,
            service_id = %charge.service_id,
            amount = charge.amount_cents,
            "Inserting charge"
        );

        let body = serde_json::to_string(payload)?;
        let entry = new_entry(&charge.tenant_id, CHARGE_CREATED_EVENT, &charge.id, body);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO charges (
                id, tenant_id, service_id, customer_name, customer_document,
                description, billing_type, status, amount_cents,
                acsm_value_cents, icetran_value_cents, taxa_cobranca_cents,
                margin_cents, below_minimum, due_date, external_reference,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&charge.id)
        .bind(&charge.tenant_id)
        .bind(&charge.service_id)
        .bind(&charge.customer_name)
        .bind(&charge.customer_document)
        .bind(&charge.description)
        .bind(charge.billing_type)
        .bind(charge.status)
        .bind(charge.amount_cents)
        .bind(charge.acsm_value_cents)
        .bind(charge.icetran_value_cents)
        .bind(charge.taxa_cobranca_cents)
        .bind(charge.margin_cents)
        .bind(charge.below_minimum)
        .bind(charge.due_date)
        .bind(&charge.external_reference)
        .bind(charge.created_at)
        .bind(charge.updated_at)
        .execute(&mut *tx)
        .await?;

        insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(id = %charge.id, outbox_id = %entry.id, "Charge created");
        Ok(entry)
    }

    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Charge>> {
        let sql = format!(
            "SELECT {} FROM charges WHERE tenant_id = ?1 AND id = ?2",
            CHARGE_COLUMNS
        );

        let charge = sqlx::query_as::<_, Charge>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(charge)
    }

    /// Lists a tenant's charges, newest first.
    pub async fn list(&self, tenant_id: &str, filter: &ChargeFilter) -> DbResult<Vec<Charge>> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM charges WHERE tenant_id = ", CHARGE_COLUMNS));
        query.push_bind(tenant_id.to_string());

        if let Some(service_id) = &filter.service_id {
            query.push(" AND service_id = ").push_bind(service_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }

        query
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(filter.limit.unwrap_or(50)));

        let charges = query
            .build_query_as::<Charge>()
            .fetch_all(&self.pool)
            .await?;

        Ok(charges)
    }

    /// Moves a charge to `next` and queues a `charge.status_changed` event.
    ///
    /// ## Arguments
    /// * `external_reference` - Gateway identifier to record, if the caller
    ///   learned it with this status change. An existing reference is kept
    ///   when `None`.
    ///
    /// ## Errors
    /// - `NotFound` if the charge does not exist in the tenant
    /// - `Core(InvalidStatusTransition)` if the lifecycle forbids the move
    /// - `Conflict` if the status changed concurrently
    pub async fn update_status(
        &self,
        tenant_id: &str,
        id: &str,
        next: ChargeStatus,
        external_reference: Option<&str>,
    ) -> DbResult<Charge> {
        let mut tx = self.pool.begin().await?;

        let current: ChargeStatus =
            sqlx::query_scalar("SELECT status FROM charges WHERE tenant_id = ?1 AND id = ?2")
                .bind(tenant_id)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("Charge", id))?;

        if !current.can_transition_to(next) {
            return Err(CoreError::InvalidStatusTransition {
                charge_id: id.to_string(),
                from: current,
                to: next,
            }
            .into());
        }

        let result = sqlx::query(
            r#"
            UPDATE charges SET
                status = ?4,
                external_reference = COALESCE(?5, external_reference),
                updated_at = ?6
            WHERE tenant_id = ?1 AND id = ?2 AND status = ?3
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(current)
        .bind(next)
        .bind(external_reference)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "Charge {} changed status concurrently",
                id
            )));
        }

        let payload = ChargeStatusChangedPayload {
            event: CHARGE_STATUS_CHANGED_EVENT.to_string(),
            charge_id: id.to_string(),
            from: current,
            to: next,
        };
        let entry = new_entry(
            tenant_id,
            CHARGE_STATUS_CHANGED_EVENT,
            id,
            serde_json::to_string(&payload)?,
        );
        insert_entry(&mut *tx, &entry).await?;

        let sql = format!(
            "SELECT {} FROM charges WHERE tenant_id = ?1 AND id = ?2",
            CHARGE_COLUMNS
        );
        let charge = sqlx::query_as::<_, Charge>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(id = %id, from = %current, to = %next, "Charge status updated");
        Ok(charge)
    }

    /// Totals over a service's live charges.
    pub async fn margin_summary(&self, tenant_id: &str, service_id: &str) -> DbResult<MarginSummary> {
        let summary = sqlx::query_as::<_, MarginSummary>(
            r#"
            SELECT
                COUNT(*) AS charge_count,
                COALESCE(SUM(amount_cents), 0) AS total_amount_cents,
                COALESCE(SUM(margin_cents), 0) AS total_margin_cents,
                COALESCE(SUM(below_minimum), 0) AS below_minimum_count
            FROM charges
            WHERE tenant_id = ?1
              AND service_id = ?2
              AND status NOT IN ('cancelled', 'refunded')
            "#,
        )
        .bind(tenant_id)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{sample_charge, sample_service};
    use crate::{Database, DbConfig};
    use multas_core::{SplitConfig, DEFAULT_TENANT_ID};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = sample_service("Recurso JARI", &SplitConfig::STANDARD);
        db.services().insert(&service).await.unwrap();
        (db, service.id)
    }

    async fn create(db: &Database, service_id: &str, amount_cents: i64) -> Charge {
        let charge = sample_charge(service_id, &SplitConfig::STANDARD, amount_cents);
        let payload = ChargeWebhookPayload::from_charge(&charge, "Recurso JARI");
        db.charges().create_with_outbox(&charge, &payload).await.unwrap();
        charge
    }

    #[tokio::test]
    async fn test_create_writes_charge_and_outbox() {
        let (db, service_id) = setup().await;
        let charge = create(&db, &service_id, 6000).await;

        let loaded = db
            .charges()
            .get_by_id(DEFAULT_TENANT_ID, &charge.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.amount_cents, 6000);
        assert_eq!(loaded.margin_cents, 4450);
        assert_eq!(loaded.status, ChargeStatus::Pending);
        assert_eq!(loaded.due_date, charge.due_date);

        let pending = db.webhook_outbox().get_pending(DEFAULT_TENANT_ID, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].event_type, CHARGE_CREATED_EVENT);
        assert_eq!(pending[0].entity_id, charge.id);

        let body: serde_json::Value = serde_json::from_str(&pending[0].payload).unwrap();
        assert_eq!(body["value"], "60.00");
        assert_eq!(body["split"]["margin"], "44.50");
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_failure() {
        let (db, _) = setup().await;

        // Unknown service: the foreign key fails and no event is queued.
        let charge = sample_charge("missing-service", &SplitConfig::STANDARD, 6000);
        let payload = ChargeWebhookPayload::from_charge(&charge, "?");
        let err = db.charges().create_with_outbox(&charge, &payload).await.unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert_eq!(db.webhook_outbox().count_pending(DEFAULT_TENANT_ID).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_survives_split_edit() {
        let (db, service_id) = setup().await;
        let charge = create(&db, &service_id, 6000).await;

        db.services()
            .update_split_config(DEFAULT_TENANT_ID, &service_id, &SplitConfig::CAPITAL)
            .await
            .unwrap();

        let loaded = db
            .charges()
            .get_by_id(DEFAULT_TENANT_ID, &charge.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.split_config(), SplitConfig::STANDARD);
        assert_eq!(loaded.margin_cents, 4450);
    }

    #[tokio::test]
    async fn test_update_status_follows_lifecycle() {
        let (db, service_id) = setup().await;
        let charge = create(&db, &service_id, 6000).await;

        let updated = db
            .charges()
            .update_status(DEFAULT_TENANT_ID, &charge.id, ChargeStatus::Received, Some("pay_123"))
            .await
            .unwrap();
        assert_eq!(updated.status, ChargeStatus::Received);
        assert_eq!(updated.external_reference.as_deref(), Some("pay_123"));

        let refunded = db
            .charges()
            .update_status(DEFAULT_TENANT_ID, &charge.id, ChargeStatus::Refunded, None)
            .await
            .unwrap();
        assert_eq!(refunded.external_reference.as_deref(), Some("pay_123"));

        let err = db
            .charges()
            .update_status(DEFAULT_TENANT_ID, &charge.id, ChargeStatus::Pending, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidStatusTransition {
                from: ChargeStatus::Refunded,
                to: ChargeStatus::Pending,
                ..
            })
        ));

        // created + two status changes
        assert_eq!(db.webhook_outbox().count_pending(DEFAULT_TENANT_ID).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_status_unknown_charge() {
        let (db, _) = setup().await;

        let err = db
            .charges()
            .update_status(DEFAULT_TENANT_ID, "missing", ChargeStatus::Received, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, service_id) = setup().await;
        let first = create(&db, &service_id, 6000).await;
        create(&db, &service_id, 8000).await;
        create(&db, &service_id, 9000).await;

        db.charges()
            .update_status(DEFAULT_TENANT_ID, &first.id, ChargeStatus::Cancelled, None)
            .await
            .unwrap();

        let all = db
            .charges()
            .list(DEFAULT_TENANT_ID, &ChargeFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let cancelled = db
            .charges()
            .list(
                DEFAULT_TENANT_ID,
                &ChargeFilter {
                    status: Some(ChargeStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.id);

        let limited = db
            .charges()
            .list(
                DEFAULT_TENANT_ID,
                &ChargeFilter {
                    service_id: Some(service_id.clone()),
                    limit: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let other = db.charges().list("other-tenant", &ChargeFilter::default()).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_margin_summary() {
        let (db, service_id) = setup().await;

        let empty = db.charges().margin_summary(DEFAULT_TENANT_ID, &service_id).await.unwrap();
        assert_eq!(empty.charge_count, 0);
        assert_eq!(empty.total_margin(), Money::zero());

        create(&db, &service_id, 6000).await;
        create(&db, &service_id, 1000).await;
        let cancelled = create(&db, &service_id, 9000).await;
        db.charges()
            .update_status(DEFAULT_TENANT_ID, &cancelled.id, ChargeStatus::Cancelled, None)
            .await
            .unwrap();

        let summary = db.charges().margin_summary(DEFAULT_TENANT_ID, &service_id).await.unwrap();
        assert_eq!(summary.charge_count, 2);
        assert_eq!(summary.total_amount_cents, 7000);
        assert_eq!(summary.total_margin_cents, 4450);
        assert_eq!(summary.below_minimum_count, 1);
    }
}
