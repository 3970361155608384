//! # multas-db: Database Layer for the Multas Back Office
//!
//! SQLite persistence for services, charges and the webhook outbox, using
//! sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Back Office Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (create_charge)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    multas-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ServiceRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ChargeRepo    │    │ 001_initial  │  │   │
//! │  │   │               │    │ OutboxRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (MULTAS_DB_PATH)                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use multas_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("multas.db")).await?;
//!
//! let services = db.services().list(DEFAULT_TENANT_ID, false).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::charge::{ChargeFilter, ChargeRepository, MarginSummary};
pub use repository::outbox::WebhookOutboxRepository;
pub use repository::service::ServiceRepository;
