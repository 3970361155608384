//! # Service Repository
//!
//! Database operations for services and their split configuration.
//!
//! ## Split Editing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Admin edits split (R$ 6,00 / 6,00 / 3,50 → 11,00 / 11,00 / 3,50)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  update_split_config() ← only the three split columns change           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  New charges use the new minimum (R$ 25,50)                            │
//! │  Existing charges keep their snapshot                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use multas_core::{Service, SplitConfig};

const SERVICE_COLUMNS: &str = "id, tenant_id, name, description, \
    acsm_value_cents, icetran_value_cents, taxa_cobranca_cents, \
    default_amount_cents, is_active, created_at, updated_at";

/// Repository for service database operations.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Inserts a new service.
    ///
    /// ## Errors
    /// `UniqueViolation` when the tenant already has a service with that name.
    pub async fn insert(&self, service: &Service) -> DbResult<()> {
        debug!(id = %service.id, name = %service.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (
                id, tenant_id, name, description,
                acsm_value_cents, icetran_value_cents, taxa_cobranca_cents,
                default_amount_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&service.id)
        .bind(&service.tenant_id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.acsm_value_cents)
        .bind(service.icetran_value_cents)
        .bind(service.taxa_cobranca_cents)
        .bind(service.default_amount_cents)
        .bind(service.is_active)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: service.name.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Gets a service by ID within a tenant.
    pub async fn get_by_id(&self, tenant_id: &str, id: &str) -> DbResult<Option<Service>> {
        let sql = format!(
            "SELECT {} FROM services WHERE tenant_id = ?1 AND id = ?2",
            SERVICE_COLUMNS
        );

        let service = sqlx::query_as::<_, Service>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(service)
    }

    /// Lists a tenant's services ordered by name.
    pub async fn list(&self, tenant_id: &str, include_inactive: bool) -> DbResult<Vec<Service>> {
        let sql = format!(
            "SELECT {} FROM services WHERE tenant_id = ?1 AND (is_active = 1 OR ?2) ORDER BY name",
            SERVICE_COLUMNS
        );

        let services = sqlx::query_as::<_, Service>(&sql)
            .bind(tenant_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        Ok(services)
    }

    /// Replaces the split configuration of a service.
    ///
    /// ## Returns
    /// The updated service, or `NotFound` if the ID does not exist in the
    /// tenant.
    pub async fn update_split_config(
        &self,
        tenant_id: &str,
        id: &str,
        split: &SplitConfig,
    ) -> DbResult<Service> {
        debug!(
            id = %id,
            acsm = split.acsm_value().cents(),
            icetran = split.icetran_value().cents(),
            taxa = split.taxa_cobranca().cents(),
            "Updating service split"
        );

        let result = sqlx::query(
            r#"
            UPDATE services SET
                acsm_value_cents = ?3,
                icetran_value_cents = ?4,
                taxa_cobranca_cents = ?5,
                updated_at = ?6
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(split.acsm_value().cents())
        .bind(split.icetran_value().cents())
        .bind(split.taxa_cobranca().cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        self.get_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))
    }

    /// Activates or deactivates a service.
    pub async fn set_active(&self, tenant_id: &str, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE services SET is_active = ?3, updated_at = ?4 WHERE tenant_id = ?1 AND id = ?2",
        )
        .bind(tenant_id)
        .bind(id)
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        Ok(())
    }

    /// Counts a tenant's services (active or not).
    pub async fn count(&self, tenant_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::sample_service;
    use crate::{Database, DbConfig};
    use multas_core::DEFAULT_TENANT_ID;

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = sample_service("Recurso JARI", &SplitConfig::STANDARD);

        db.services().insert(&service).await.unwrap();

        let loaded = db
            .services()
            .get_by_id(DEFAULT_TENANT_ID, &service.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "Recurso JARI");
        assert_eq!(loaded.split_config(), SplitConfig::STANDARD);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_get_is_tenant_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = sample_service("Recurso JARI", &SplitConfig::STANDARD);
        db.services().insert(&service).await.unwrap();

        let other = db.services().get_by_id("other-tenant", &service.id).await.unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.services()
            .insert(&sample_service("Recurso JARI", &SplitConfig::STANDARD))
            .await
            .unwrap();

        let err = db
            .services()
            .insert(&sample_service("Recurso JARI", &SplitConfig::CAPITAL))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { value, .. } if value == "Recurso JARI"));
    }

    #[tokio::test]
    async fn test_update_split_config() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = sample_service("Recurso CETRAN", &SplitConfig::STANDARD);
        db.services().insert(&service).await.unwrap();

        let updated = db
            .services()
            .update_split_config(DEFAULT_TENANT_ID, &service.id, &SplitConfig::CAPITAL)
            .await
            .unwrap();
        assert_eq!(updated.split_config(), SplitConfig::CAPITAL);
        assert_eq!(updated.split_config().minimum_charge().cents(), 2550);

        let missing = db
            .services()
            .update_split_config(DEFAULT_TENANT_ID, "missing", &SplitConfig::CAPITAL)
            .await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_hides_inactive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = sample_service("A - Defesa prévia", &SplitConfig::STANDARD);
        let b = sample_service("B - Recurso JARI", &SplitConfig::STANDARD);
        db.services().insert(&a).await.unwrap();
        db.services().insert(&b).await.unwrap();

        db.services().set_active(DEFAULT_TENANT_ID, &b.id, false).await.unwrap();

        let active = db.services().list(DEFAULT_TENANT_ID, false).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);

        let all = db.services().list(DEFAULT_TENANT_ID, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.services().count(DEFAULT_TENANT_ID).await.unwrap(), 2);
    }
}
