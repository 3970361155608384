//! # Database Migrations
//!
//! SQL files under `migrations/sqlite/` at the workspace root, embedded at
//! compile time.
//!
//! ```text
//! 001_initial_schema.sql
//!   services        split columns (CHECK >= 0), unique (tenant_id, name)
//!   charges         split snapshot + margin (CHECK >= 0), FK → services
//!   webhook_outbox  pending events, delivered_at NULL until acknowledged
//! ```
//!
//! Applied migrations are never edited. Schema changes go in a new
//! `NNN_description.sql`.

use sqlx::migrate::Migrator;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in filename order. Already-applied ones are
/// skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    info!("Schema is up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts, reported by `/health`.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();

    // Before the first run the bookkeeping table does not exist yet
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    Ok((embedded, usize::try_from(applied).unwrap_or(0)))
}
