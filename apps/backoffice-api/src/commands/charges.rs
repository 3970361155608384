//! # Charge Commands
//!
//! Quoting, issuing and tracking charges.
//!
//! ## Charge Creation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /charges { serviceId, customerName, customerDocument, amount … }  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  1. Validate fields (name, CPF/CNPJ, due date, description, amount)     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  2. Load service ──► missing: NOT_FOUND · inactive: BUSINESS_LOGIC      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  3. Quote amount against the service split                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  4. Viability policy                                                    │
//! │     ├── Enforce  + below minimum ──► BELOW_MINIMUM_CHARGE (422)         │
//! │     └── Advisory + below minimum ──► accepted, below_minimum = true     │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  5. ONE transaction: charges row + charge.created outbox row            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use multas_core::validation::{
    validate_charge_amount, validate_customer_name, validate_description, validate_document,
    validate_due_date, validate_uuid,
};
use multas_core::{
    BillingType, Charge, ChargeDraft, ChargeStatus, ChargeWebhookPayload, CoreError,
    ValidationError,
};
use multas_db::ChargeFilter;

use super::services::load_service;
use super::{parse_money, SplitQuoteDto};
use crate::error::ApiResult;
use crate::state::AppState;

/// Page size when the caller does not pass `limit`.
const DEFAULT_CHARGE_PAGE: u32 = 50;

// =============================================================================
// DTOs
// =============================================================================

/// Body of `POST /charges/quote`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteChargeRequest {
    pub service_id: String,
    pub amount: String,
}

/// Body of `POST /charges`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChargeRequest {
    pub service_id: String,
    pub customer_name: String,
    /// CPF or CNPJ, punctuation allowed.
    pub customer_document: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub billing_type: BillingType,
    pub due_date: NaiveDate,
    /// Decimal string: "60,00", "60.00", "R$ 60,00".
    pub amount: String,
}

/// Body of `PATCH /charges/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChargeStatusRequest {
    pub status: String,
    /// Gateway identifier, usually learned when the payment is confirmed.
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Query string of `GET /charges`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListChargesQuery {
    pub service_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u32>,
}

/// Charge as returned to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeDto {
    pub id: String,
    pub service_id: String,
    pub customer_name: String,
    pub customer_document: String,
    pub description: Option<String>,
    pub billing_type: BillingType,
    pub status: ChargeStatus,
    pub amount_cents: i64,
    /// "R$ 60,00"
    pub amount: String,
    pub acsm_value_cents: i64,
    pub icetran_value_cents: i64,
    pub taxa_cobranca_cents: i64,
    pub margin_cents: i64,
    pub below_minimum: bool,
    pub due_date: NaiveDate,
    pub external_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Charge> for ChargeDto {
    fn from(c: Charge) -> Self {
        let amount = c.amount().to_string();
        ChargeDto {
            id: c.id,
            service_id: c.service_id,
            customer_name: c.customer_name,
            customer_document: c.customer_document,
            description: c.description,
            billing_type: c.billing_type,
            status: c.status,
            amount_cents: c.amount_cents,
            amount,
            acsm_value_cents: c.acsm_value_cents,
            icetran_value_cents: c.icetran_value_cents,
            taxa_cobranca_cents: c.taxa_cobranca_cents,
            margin_cents: c.margin_cents,
            below_minimum: c.below_minimum,
            due_date: c.due_date,
            external_reference: c.external_reference,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Result of `POST /charges`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeCreatedDto {
    pub charge: ChargeDto,
    pub quote: SplitQuoteDto,
    /// Outbox entry the webhook worker will deliver.
    pub webhook_id: String,
}

/// Totals for one service, shown on the service dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSummaryDto {
    pub service_id: String,
    pub charge_count: i64,
    pub total_amount_cents: i64,
    pub total_margin_cents: i64,
    pub below_minimum_count: i64,
    /// "R$ 1.234,56"
    pub total_amount: String,
    pub total_margin: String,
}

// =============================================================================
// Commands
// =============================================================================

/// Quotes an amount for a service. Unlike the preview, parsing is strict and
/// a malformed amount is a validation error. Viability is reported, not
/// enforced.
pub async fn quote_charge(state: &AppState, req: QuoteChargeRequest) -> ApiResult<SplitQuoteDto> {
    let amount = parse_money("amount", &req.amount)?;
    validate_charge_amount(amount)?;

    let service = load_service(state, &req.service_id).await?;
    let quote = service.split_config().quote(amount);

    debug!(
        service_id = %service.id,
        amount = %amount,
        viable = quote.viable,
        "quote_charge"
    );

    Ok(SplitQuoteDto::from(quote))
}

/// Issues a charge and queues its `charge.created` webhook.
///
/// `today` is the business date the due date is checked against.
pub async fn create_charge(
    state: &AppState,
    req: CreateChargeRequest,
    today: NaiveDate,
) -> ApiResult<ChargeCreatedDto> {
    let customer_name = req.customer_name.trim().to_string();
    validate_customer_name(&customer_name)?;

    let customer_document = validate_document(&req.customer_document)?;

    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    validate_description(description.as_deref())?;

    validate_due_date(req.due_date, today)?;

    let amount = parse_money("amount", &req.amount)?;
    validate_charge_amount(amount)?;

    validate_uuid(&req.service_id).map_err(|_| ValidationError::InvalidFormat {
        field: "service_id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    let service = load_service(state, &req.service_id).await?;
    if !service.is_active {
        return Err(CoreError::ServiceInactive(service.id).into());
    }

    let quote = service.split_config().quote(amount);
    let policy = state.viability_policy();
    policy.check(&quote)?;

    if !quote.viable {
        warn!(
            service_id = %service.id,
            amount = %amount,
            minimum = %quote.minimum_charge,
            shortfall = %quote.shortfall,
            "Accepting charge below minimum (advisory policy)"
        );
    }

    let draft = ChargeDraft {
        customer_name,
        customer_document,
        description,
        billing_type: req.billing_type,
        due_date: req.due_date,
        amount,
    };

    let charge = Charge::from_draft(
        Uuid::new_v4().to_string(),
        state.tenant_id().to_string(),
        service.id.clone(),
        draft,
        &quote,
        Utc::now(),
    );
    let payload = ChargeWebhookPayload::from_charge(&charge, &service.name);

    let entry = state
        .db
        .charges()
        .create_with_outbox(&charge, &payload)
        .await?;

    info!(
        charge_id = %charge.id,
        service_id = %service.id,
        amount = %amount,
        margin = %quote.margin,
        below_minimum = charge.below_minimum,
        "Charge issued"
    );

    Ok(ChargeCreatedDto {
        charge: ChargeDto::from(charge),
        quote: SplitQuoteDto::from(quote),
        webhook_id: entry.id,
    })
}

pub async fn get_charge(state: &AppState, id: &str) -> ApiResult<ChargeDto> {
    let charge = state
        .db
        .charges()
        .get_by_id(state.tenant_id(), id)
        .await?
        .ok_or_else(|| CoreError::ChargeNotFound(id.to_string()))?;

    Ok(ChargeDto::from(charge))
}

/// Lists charges, newest first.
pub async fn list_charges(state: &AppState, query: ListChargesQuery) -> ApiResult<Vec<ChargeDto>> {
    let status = query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<ChargeStatus>)
        .transpose()?;

    let filter = ChargeFilter {
        service_id: query.service_id.filter(|s| !s.trim().is_empty()),
        status,
        limit: Some(state.config.page_size(query.limit, DEFAULT_CHARGE_PAGE)),
    };

    let charges = state.db.charges().list(state.tenant_id(), &filter).await?;

    debug!(count = charges.len(), ?filter, "list_charges");
    Ok(charges.into_iter().map(ChargeDto::from).collect())
}

/// Moves a charge along its lifecycle and queues a `charge.status_changed`
/// webhook.
pub async fn update_charge_status(
    state: &AppState,
    id: &str,
    req: UpdateChargeStatusRequest,
) -> ApiResult<ChargeDto> {
    let next: ChargeStatus = req.status.parse()?;
    let external_reference = req
        .external_reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let charge = state
        .db
        .charges()
        .update_status(state.tenant_id(), id, next, external_reference)
        .await?;

    info!(charge_id = %id, status = %next, "Charge status updated");
    Ok(ChargeDto::from(charge))
}

/// Totals of a service's live charges.
pub async fn charge_summary(state: &AppState, service_id: &str) -> ApiResult<ChargeSummaryDto> {
    let service = load_service(state, service_id).await?;
    let summary = state
        .db
        .charges()
        .margin_summary(state.tenant_id(), &service.id)
        .await?;

    Ok(ChargeSummaryDto {
        service_id: service.id,
        charge_count: summary.charge_count,
        total_amount_cents: summary.total_amount_cents,
        total_margin_cents: summary.total_margin_cents,
        below_minimum_count: summary.below_minimum_count,
        total_amount: summary.total_amount().to_string(),
        total_margin: summary.total_margin().to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
