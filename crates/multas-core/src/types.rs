//! # Domain Types
//!
//! Core domain types of the back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────┐           │
//! │  │       Service        │        │          Charge          │           │
//! │  │  ──────────────────  │  1   * │  ──────────────────────  │           │
//! │  │  id (UUID)           │◄───────│  service_id (FK)         │           │
//! │  │  name                │        │  amount_cents            │           │
//! │  │  acsm_value_cents    │  copy  │  acsm_value_cents        │           │
//! │  │  icetran_value_cents │ ─────► │  icetran_value_cents     │           │
//! │  │  taxa_cobranca_cents │        │  taxa_cobranca_cents     │           │
//! │  └──────────────────────┘        │  margin_cents            │           │
//! │                                  │  status, billing_type    │           │
//! │                                  └────────────┬─────────────┘           │
//! │                                               │ same transaction        │
//! │                                  ┌────────────▼─────────────┐           │
//! │                                  │   WebhookOutboxEntry     │           │
//! │                                  │  payload (JSON)          │           │
//! │                                  └──────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A charge copies the split of its service at creation time. Editing the
//! service split later never changes what an existing charge pays out.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::split::{SplitConfig, SplitQuote};

/// Event type of the outbox entry written when a charge is created.
pub const CHARGE_CREATED_EVENT: &str = "charge.created";

/// Event type of the outbox entry written when a charge changes status.
pub const CHARGE_STATUS_CHANGED_EVENT: &str = "charge.status_changed";

// =============================================================================
// Service
// =============================================================================

/// A service sold to customers (e.g., "Recurso de multa - 1ª instância").
///
/// The three split columns form the service's [`SplitConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant (despachante office) this service belongs to.
    pub tenant_id: String,

    /// Display name shown in the charge form.
    pub name: String,

    pub description: Option<String>,

    /// ACSM share in centavos.
    pub acsm_value_cents: i64,

    /// ICETRAN share in centavos.
    pub icetran_value_cents: i64,

    /// Processing fee in centavos.
    pub taxa_cobranca_cents: i64,

    /// Suggested price pre-filled in the charge form.
    pub default_amount_cents: Option<i64>,

    /// Inactive services keep their history but take no new charges.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Returns the split configuration stored on this service.
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig::from_cents(
            self.acsm_value_cents,
            self.icetran_value_cents,
            self.taxa_cobranca_cents,
        )
    }

    /// Returns the suggested price, if any.
    #[inline]
    pub fn default_amount(&self) -> Option<Money> {
        self.default_amount_cents.map(Money::from_cents)
    }

    /// Copies `split` into the split columns.
    pub fn apply_split(&mut self, split: &SplitConfig) {
        self.acsm_value_cents = split.acsm_value().cents();
        self.icetran_value_cents = split.icetran_value().cents();
        self.taxa_cobranca_cents = split.taxa_cobranca().cents();
    }
}

// =============================================================================
// Charge Status
// =============================================================================

/// Where a charge is in its payment lifecycle.
///
/// ## Lifecycle
/// ```text
///            ┌──────────► confirmed ──────┐
///            │                │           ▼
///  pending ──┼──────────► received ──► refunded
///            │                ▲
///            ├──► overdue ────┘
///            │       │
///            └───────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    /// Created, waiting for the customer to pay.
    Pending,
    /// Payment confirmed by the gateway, funds not yet settled.
    Confirmed,
    /// Funds received.
    Received,
    /// Due date passed without payment.
    Overdue,
    /// Cancelled before payment.
    Cancelled,
    /// Paid and then refunded.
    Refunded,
}

impl ChargeStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ChargeStatus) -> bool {
        use ChargeStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Received)
                | (Pending, Overdue)
                | (Pending, Cancelled)
                | (Confirmed, Received)
                | (Confirmed, Refunded)
                | (Overdue, Received)
                | (Overdue, Cancelled)
                | (Received, Refunded)
        )
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChargeStatus::Cancelled | ChargeStatus::Refunded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Confirmed => "confirmed",
            ChargeStatus::Received => "received",
            ChargeStatus::Overdue => "overdue",
            ChargeStatus::Cancelled => "cancelled",
            ChargeStatus::Refunded => "refunded",
        }
    }
}

impl Default for ChargeStatus {
    fn default() -> Self {
        ChargeStatus::Pending
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChargeStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ChargeStatus::Pending),
            "confirmed" => Ok(ChargeStatus::Confirmed),
            "received" => Ok(ChargeStatus::Received),
            "overdue" => Ok(ChargeStatus::Overdue),
            "cancelled" | "canceled" => Ok(ChargeStatus::Cancelled),
            "refunded" => Ok(ChargeStatus::Refunded),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown charge status '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Billing Type
// =============================================================================

/// How the customer pays the charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BillingType {
    /// Instant PIX transfer.
    Pix,
    /// Bank slip.
    Boleto,
    /// Credit card via the payment gateway.
    CreditCard,
}

impl Default for BillingType {
    fn default() -> Self {
        BillingType::Pix
    }
}

// =============================================================================
// Charge
// =============================================================================

/// Validated input for a new charge, before it gets an id and a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeDraft {
    pub customer_name: String,
    /// CPF or CNPJ, digits only.
    pub customer_document: String,
    pub description: Option<String>,
    pub billing_type: BillingType,
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// A charge issued to a customer for one service.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Charge {
    pub id: String,
    pub tenant_id: String,
    pub service_id: String,
    pub customer_name: String,
    /// CPF or CNPJ, digits only.
    pub customer_document: String,
    pub description: Option<String>,
    pub billing_type: BillingType,
    pub status: ChargeStatus,
    /// Price charged to the customer.
    pub amount_cents: i64,
    /// ACSM share at time of charge (frozen).
    pub acsm_value_cents: i64,
    /// ICETRAN share at time of charge (frozen).
    pub icetran_value_cents: i64,
    /// Processing fee at time of charge (frozen).
    pub taxa_cobranca_cents: i64,
    /// Despachante margin at time of charge (frozen).
    pub margin_cents: i64,
    /// Set when the charge was accepted under the advisory policy with an
    /// amount below the minimum.
    pub below_minimum: bool,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Identifier assigned by the payment gateway, once known.
    pub external_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Charge {
    /// Builds a pending charge from a draft and the quote computed for it,
    /// snapshotting the split.
    pub fn from_draft(
        id: String,
        tenant_id: String,
        service_id: String,
        draft: ChargeDraft,
        quote: &SplitQuote,
        now: DateTime<Utc>,
    ) -> Self {
        Charge {
            id,
            tenant_id,
            service_id,
            customer_name: draft.customer_name,
            customer_document: draft.customer_document,
            description: draft.description,
            billing_type: draft.billing_type,
            status: ChargeStatus::Pending,
            amount_cents: quote.amount.cents(),
            acsm_value_cents: quote.acsm_value.cents(),
            icetran_value_cents: quote.icetran_value.cents(),
            taxa_cobranca_cents: quote.taxa_cobranca.cents(),
            margin_cents: quote.margin.cents(),
            below_minimum: !quote.viable,
            due_date: draft.due_date,
            external_reference: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn margin(&self) -> Money {
        Money::from_cents(self.margin_cents)
    }

    /// Split snapshot taken when the charge was created.
    pub fn split_config(&self) -> SplitConfig {
        SplitConfig::from_cents(
            self.acsm_value_cents,
            self.icetran_value_cents,
            self.taxa_cobranca_cents,
        )
    }

    /// Rebuilds the quote from the snapshot columns.
    pub fn split_quote(&self) -> SplitQuote {
        self.split_config().quote(self.amount())
    }
}

// =============================================================================
// Webhook Outbox
// =============================================================================

/// An event waiting to be delivered to the workflow-automation webhook.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WebhookOutboxEntry {
    pub id: String,
    pub tenant_id: String,
    /// `charge.created`, `charge.status_changed`.
    pub event_type: String,
    /// ID of the charge the event is about.
    pub entity_id: String,
    /// The event body as JSON.
    pub payload: String,
    /// Number of delivery attempts.
    pub attempts: i64,
    /// Last error message if delivery failed.
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Split block of the webhook payload. Amounts are decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitPayload {
    pub acsm_value: String,
    pub icetran_value: String,
    pub taxa_cobranca: String,
    pub minimum: String,
    pub margin: String,
}

impl From<&SplitQuote> for SplitPayload {
    fn from(quote: &SplitQuote) -> Self {
        SplitPayload {
            acsm_value: quote.acsm_value.to_decimal_string(),
            icetran_value: quote.icetran_value.to_decimal_string(),
            taxa_cobranca: quote.taxa_cobranca.to_decimal_string(),
            minimum: quote.minimum_charge.to_decimal_string(),
            margin: quote.margin.to_decimal_string(),
        }
    }
}

/// Body of a `charge.created` event.
///
/// ```json
/// {
///   "event": "charge.created",
///   "charge_id": "…",
///   "value": "60.00",
///   "split": { "acsm_value": "6.00", "icetran_value": "6.00",
///              "taxa_cobranca": "3.50", "minimum": "15.50", "margin": "44.50" },
///   …
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChargeWebhookPayload {
    pub event: String,
    pub charge_id: String,
    pub tenant_id: String,
    pub service_id: String,
    pub service_name: String,
    pub customer_name: String,
    pub customer_document: String,
    pub description: Option<String>,
    pub billing_type: BillingType,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub value: String,
    pub split: SplitPayload,
    pub below_minimum: bool,
}

impl ChargeWebhookPayload {
    pub fn from_charge(charge: &Charge, service_name: &str) -> Self {
        ChargeWebhookPayload {
            event: CHARGE_CREATED_EVENT.to_string(),
            charge_id: charge.id.clone(),
            tenant_id: charge.tenant_id.clone(),
            service_id: charge.service_id.clone(),
            service_name: service_name.to_string(),
            customer_name: charge.customer_name.clone(),
            customer_document: charge.customer_document.clone(),
            description: charge.description.clone(),
            billing_type: charge.billing_type,
            due_date: charge.due_date,
            value: charge.amount().to_decimal_string(),
            split: SplitPayload::from(&charge.split_quote()),
            below_minimum: charge.below_minimum,
        }
    }
}

/// Body of a `charge.status_changed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChargeStatusChangedPayload {
    pub event: String,
    pub charge_id: String,
    pub from: ChargeStatus,
    pub to: ChargeStatus,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_charge(amount_cents: i64) -> Charge {
        let draft = ChargeDraft {
            customer_name: "Maria Souza".to_string(),
            customer_document: "52998224725".to_string(),
            description: Some("Recurso AIT 123".to_string()),
            billing_type: BillingType::Pix,
            due_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            amount: Money::from_cents(amount_cents),
        };
        let quote = SplitConfig::STANDARD.quote(draft.amount);
        Charge::from_draft(
            "charge-1".to_string(),
            "tenant-1".to_string(),
            "service-1".to_string(),
            draft,
            &quote,
            Utc::now(),
        )
    }

    #[test]
    fn test_status_transitions() {
        use ChargeStatus::*;

        assert!(Pending.can_transition_to(Received));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Overdue.can_transition_to(Received));
        assert!(Received.can_transition_to(Refunded));

        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Received));
        assert!(!Received.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("received".parse::<ChargeStatus>().unwrap(), ChargeStatus::Received);
        assert_eq!("CANCELED".parse::<ChargeStatus>().unwrap(), ChargeStatus::Cancelled);
        assert!("paid".parse::<ChargeStatus>().is_err());
        assert_eq!(ChargeStatus::Overdue.to_string(), "overdue");
        assert_eq!(ChargeStatus::default(), ChargeStatus::Pending);
    }

    #[test]
    fn test_charge_snapshots_split() {
        let charge = sample_charge(6000);

        assert_eq!(charge.status, ChargeStatus::Pending);
        assert_eq!(charge.acsm_value_cents, 600);
        assert_eq!(charge.icetran_value_cents, 600);
        assert_eq!(charge.taxa_cobranca_cents, 350);
        assert_eq!(charge.margin_cents, 4450);
        assert!(!charge.below_minimum);
        assert_eq!(charge.split_quote().margin, charge.margin());
    }

    #[test]
    fn test_charge_below_minimum_flag() {
        let charge = sample_charge(1000);
        assert!(charge.below_minimum);
        assert_eq!(charge.margin_cents, 0);
    }

    #[test]
    fn test_webhook_payload_uses_decimal_strings() {
        let charge = sample_charge(6000);
        let payload = ChargeWebhookPayload::from_charge(&charge, "Recurso 1ª instância");

        assert_eq!(payload.event, CHARGE_CREATED_EVENT);
        assert_eq!(payload.value, "60.00");
        assert_eq!(payload.split.minimum, "15.50");
        assert_eq!(payload.split.margin, "44.50");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["billing_type"], "pix");
        assert_eq!(json["due_date"], "2026-11-01");
        assert_eq!(json["split"]["taxa_cobranca"], "3.50");
    }

    #[test]
    fn test_service_split_roundtrip() {
        let now = Utc::now();
        let mut service = Service {
            id: "s".to_string(),
            tenant_id: "t".to_string(),
            name: "Recurso".to_string(),
            description: None,
            acsm_value_cents: 0,
            icetran_value_cents: 0,
            taxa_cobranca_cents: 0,
            default_amount_cents: Some(6000),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        service.apply_split(&SplitConfig::CAPITAL);
        assert_eq!(service.split_config(), SplitConfig::CAPITAL);
        assert_eq!(service.split_config().minimum_charge().cents(), 2550);
        assert_eq!(service.default_amount(), Some(Money::from_cents(6000)));
    }

    #[test]
    fn test_billing_type_serde() {
        let json = serde_json::to_string(&BillingType::CreditCard).unwrap();
        assert_eq!(json, "\"credit_card\"");
    }
}
