//! # Repository Module
//!
//! Database repository implementations for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.charges().create_with_outbox(&charge, &payload)            │
//! │       ▼                                                                 │
//! │  ChargeRepository                                                      │
//! │  ├── create_with_outbox(&self, charge, payload)                        │
//! │  ├── get_by_id(&self, tenant_id, id)                                   │
//! │  ├── list(&self, tenant_id, filter)                                    │
//! │  └── update_status(&self, tenant_id, id, next, reference)              │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every query is scoped by `tenant_id`.
//!
//! ## Available Repositories
//!
//! - [`ServiceRepository`](service::ServiceRepository) - Services and split configuration
//! - [`ChargeRepository`](charge::ChargeRepository) - Charges, status lifecycle, margin totals
//! - [`WebhookOutboxRepository`](outbox::WebhookOutboxRepository) - Webhook event queue

pub mod charge;
pub mod outbox;
pub mod service;
