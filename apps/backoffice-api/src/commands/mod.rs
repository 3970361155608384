//! # Commands Module
//!
//! The request-validation layer between HTTP handlers and the database.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (shared DTOs, money parsing)
//! ├── services.rs  ◄─── Service CRUD, split editing, split preview
//! ├── charges.rs   ◄─── Quote, create, list, status, margin summary
//! └── outbox.rs    ◄─── Webhook worker endpoints
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  routes.rs handler                                                      │
//! │  async fn create_charge(State(state), Json(req))                        │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  commands::charges::create_charge(&state, req, today)                   │
//! │  ├── validate fields            (multas_core::validation)               │
//! │  ├── quote + viability policy   (multas_core::split)                    │
//! │  └── persist                    (multas_db)                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Result<ChargeCreatedDto, ApiError> ──► JSON                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands take `&AppState` and plain values, so tests call them directly
//! against an in-memory database.

pub mod charges;
pub mod outbox;
pub mod services;

use serde::{Deserialize, Serialize};

use multas_core::{Money, SplitQuote, ValidationError};

/// Strictly parses a decimal money input, naming `field` in the error.
pub(crate) fn parse_money(field: &str, input: &str) -> Result<Money, ValidationError> {
    Money::parse_decimal(input).map_err(|e| match e {
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
            field: field.to_string(),
            reason,
        },
        other => other,
    })
}

/// Split breakdown for the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitQuoteDto {
    pub amount_cents: i64,
    pub acsm_value_cents: i64,
    pub icetran_value_cents: i64,
    pub taxa_cobranca_cents: i64,
    pub minimum_charge_cents: i64,
    pub margin_cents: i64,
    /// How much is missing to reach the minimum.
    pub shortfall_cents: i64,
    pub viable: bool,
    pub margin_bps: i64,
    pub formatted: FormattedQuote,
}

/// The same values as BRL display strings ("R$ 1.234,56").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedQuote {
    pub amount: String,
    pub acsm_value: String,
    pub icetran_value: String,
    pub taxa_cobranca: String,
    pub minimum_charge: String,
    pub margin: String,
    pub shortfall: String,
}

impl From<SplitQuote> for SplitQuoteDto {
    fn from(q: SplitQuote) -> Self {
        SplitQuoteDto {
            amount_cents: q.amount.cents(),
            acsm_value_cents: q.acsm_value.cents(),
            icetran_value_cents: q.icetran_value.cents(),
            taxa_cobranca_cents: q.taxa_cobranca.cents(),
            minimum_charge_cents: q.minimum_charge.cents(),
            margin_cents: q.margin.cents(),
            shortfall_cents: q.shortfall.cents(),
            viable: q.viable,
            margin_bps: q.margin_bps(),
            formatted: FormattedQuote {
                amount: q.amount.to_string(),
                acsm_value: q.acsm_value.to_string(),
                icetran_value: q.icetran_value.to_string(),
                taxa_cobranca: q.taxa_cobranca.to_string(),
                minimum_charge: q.minimum_charge.to_string(),
                margin: q.margin.to_string(),
                shortfall: q.shortfall.to_string(),
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use multas_core::SplitConfig;

    #[test]
    fn test_parse_money_names_field() {
        assert_eq!(parse_money("amount", "60,00").unwrap().cents(), 6000);

        let err = parse_money("acsm_value", "seis").unwrap_err();
        assert!(err.to_string().starts_with("acsm_value has invalid format"));
    }

    #[test]
    fn test_quote_dto() {
        let dto = SplitQuoteDto::from(SplitConfig::STANDARD.quote(Money::from_cents(6000)));

        assert_eq!(dto.minimum_charge_cents, 1550);
        assert_eq!(dto.margin_cents, 4450);
        assert_eq!(dto.shortfall_cents, 0);
        assert_eq!(dto.margin_bps, 7416);
        assert_eq!(dto.formatted.minimum_charge, "R$ 15,50");
        assert_eq!(dto.formatted.margin, "R$ 44,50");

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["minimumChargeCents"], 1550);
    }
}
