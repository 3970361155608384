//! # Application State
//!
//! Shared state handed to every handler.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppState (Clone)                                │
//! │                                                                         │
//! │  ┌────────────────────────────┐   ┌──────────────────────────────────┐ │
//! │  │  Database                  │   │  Arc<ApiConfig>                  │ │
//! │  │  SQLite pool (thread-safe) │   │  tenant_id, viability policy,    │ │
//! │  │                            │   │  page size (read-only)           │ │
//! │  └────────────────────────────┘   └──────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use multas_core::ViabilityPolicy;
use multas_db::Database;

use crate::config::ApiConfig;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }

    /// Tenant every query is scoped to.
    #[inline]
    pub fn tenant_id(&self) -> &str {
        &self.config.tenant_id
    }

    #[inline]
    pub fn viability_policy(&self) -> ViabilityPolicy {
        self.config.viability_policy()
    }
}
