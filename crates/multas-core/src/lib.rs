//! # multas-core: Pure Business Logic for the Multas Back Office
//!
//! This crate contains the business rules of the traffic-fine back office as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Multas Back Office Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (React)                             │   │
//! │  │   Service form ──► Charge form ──► Split preview               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    backoffice-api (axum)                        │   │
//! │  │    create_service, quote_charge, create_charge, ...             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ multas-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   split   │  │ validation│  │   │
//! │  │   │  Service  │  │   Money   │  │ SplitCfg  │  │  CPF/CNPJ │  │   │
//! │  │   │  Charge   │  │  R$ fmt   │  │  margin   │  │  amounts  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    multas-db (Database Layer)                   │   │
//! │  │         services, charges, webhook_outbox (SQLite)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`split`] - Split configuration, minimum charge, margin, viability
//! - [`money`] - Money type with integer centavos (no floating point!)
//! - [`types`] - Domain types (Service, Charge, webhook payloads)
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules (names, amounts, CPF/CNPJ, dates)
//!
//! ## Example Usage
//!
//! ```rust
//! use multas_core::money::Money;
//! use multas_core::split::SplitConfig;
//!
//! let quote = SplitConfig::STANDARD.quote(Money::from_cents(6000));
//!
//! assert_eq!(quote.minimum_charge.to_string(), "R$ 15,50");
//! assert_eq!(quote.margin.to_string(), "R$ 44,50");
//! assert!(quote.viable);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod split;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use split::{is_viable, margin, minimum_charge, SplitConfig, SplitQuote, ViabilityPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used when a deployment does not configure one.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum length of service and customer names.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length of free-text descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Largest accepted charge amount or split component, in centavos
/// (R$ 1.000.000.000,00). Three components at this bound still fit in i64.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
