//! # Service Commands
//!
//! Service management and the split calculator exposed to the back office.
//!
//! ## Split Preview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service form                                                           │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ ACSM [6,00]  ICETRAN [6,00]  Taxa [3,5]   Valor [60]          │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │           │ every keystroke                                             │
//! │           ▼                                                             │
//! │  preview_unsaved_split() ← lenient: "3,5" → R$ 3,50, "" → R$ 0,00      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Mínimo R$ 15,50 · Margem R$ 44,50 · ✓ viável                          │
//! │                                                                         │
//! │  Save ──► create_service / update_split_config ← strict parsing        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use multas_core::validation::{validate_charge_amount, validate_description, validate_service_name};
use multas_core::{CoreError, Money, Service, SplitConfig};

use super::{parse_money, SplitQuoteDto};
use crate::error::ApiResult;
use crate::state::AppState;

// =============================================================================
// DTOs
// =============================================================================

/// Service as returned to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDto {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub acsm_value_cents: i64,
    pub icetran_value_cents: i64,
    pub taxa_cobranca_cents: i64,
    pub minimum_charge_cents: i64,
    /// "R$ 15,50"
    pub minimum_charge: String,
    pub default_amount_cents: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Service> for ServiceDto {
    fn from(s: Service) -> Self {
        let minimum = s.split_config().minimum_charge();
        ServiceDto {
            id: s.id,
            name: s.name,
            description: s.description,
            acsm_value_cents: s.acsm_value_cents,
            icetran_value_cents: s.icetran_value_cents,
            taxa_cobranca_cents: s.taxa_cobranca_cents,
            minimum_charge_cents: minimum.cents(),
            minimum_charge: minimum.to_string(),
            default_amount_cents: s.default_amount_cents,
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Body of `POST /services`.
///
/// Money fields are decimal strings ("6,00", "6.00", "R$ 6,00"). A missing
/// split component takes the standard value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub acsm_value: Option<String>,
    #[serde(default)]
    pub icetran_value: Option<String>,
    #[serde(default)]
    pub taxa_cobranca: Option<String>,
    #[serde(default)]
    pub default_amount: Option<String>,
}

/// Body of `PUT /services/{id}/split`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSplitRequest {
    pub acsm_value: String,
    pub icetran_value: String,
    pub taxa_cobranca: String,
}

/// Body of `POST /split-preview`: raw, possibly half-typed form values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnsavedSplitPreviewRequest {
    pub acsm_value: String,
    pub icetran_value: String,
    pub taxa_cobranca: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPreviewDto {
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub quote: SplitQuoteDto,
}

// =============================================================================
// Commands
// =============================================================================

/// Creates a service.
///
/// ## Validation
/// - name required, at most 200 characters, unique per tenant
/// - split components parse strictly and are zero or greater
/// - default amount, when given, is positive
pub async fn create_service(state: &AppState, req: CreateServiceRequest) -> ApiResult<ServiceDto> {
    let name = req.name.trim().to_string();
    validate_service_name(&name)?;

    let description = normalize_optional(req.description);
    validate_description(description.as_deref())?;

    let base = SplitConfig::STANDARD;
    let split = SplitConfig::new(
        optional_money("acsm_value", req.acsm_value.as_deref(), base.acsm_value())?,
        optional_money("icetran_value", req.icetran_value.as_deref(), base.icetran_value())?,
        optional_money("taxa_cobranca", req.taxa_cobranca.as_deref(), base.taxa_cobranca())?,
    )?;

    let default_amount = match normalize_optional(req.default_amount) {
        Some(raw) => {
            let amount = parse_money("default_amount", &raw)?;
            validate_charge_amount(amount)?;
            Some(amount)
        }
        None => None,
    };

    let now = Utc::now();
    let mut service = Service {
        id: Uuid::new_v4().to_string(),
        tenant_id: state.tenant_id().to_string(),
        name,
        description,
        acsm_value_cents: 0,
        icetran_value_cents: 0,
        taxa_cobranca_cents: 0,
        default_amount_cents: default_amount.map(|m| m.cents()),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    service.apply_split(&split);

    state.db.services().insert(&service).await?;

    info!(
        id = %service.id,
        name = %service.name,
        minimum = %split.minimum_charge(),
        "Service created"
    );

    Ok(ServiceDto::from(service))
}

pub async fn get_service(state: &AppState, id: &str) -> ApiResult<ServiceDto> {
    let service = load_service(state, id).await?;
    Ok(ServiceDto::from(service))
}

pub async fn list_services(state: &AppState, include_inactive: bool) -> ApiResult<Vec<ServiceDto>> {
    let services = state
        .db
        .services()
        .list(state.tenant_id(), include_inactive)
        .await?;

    debug!(count = services.len(), include_inactive, "list_services");
    Ok(services.into_iter().map(ServiceDto::from).collect())
}

/// Replaces a service's split. Existing charges keep their snapshot.
pub async fn update_split_config(
    state: &AppState,
    id: &str,
    req: UpdateSplitRequest,
) -> ApiResult<ServiceDto> {
    let split = SplitConfig::new(
        parse_money("acsm_value", &req.acsm_value)?,
        parse_money("icetran_value", &req.icetran_value)?,
        parse_money("taxa_cobranca", &req.taxa_cobranca)?,
    )?;

    let service = state
        .db
        .services()
        .update_split_config(state.tenant_id(), id, &split)
        .await?;

    info!(
        id = %id,
        minimum = %split.minimum_charge(),
        "Service split updated"
    );

    Ok(ServiceDto::from(service))
}

/// Activates or deactivates a service.
pub async fn set_service_active(state: &AppState, id: &str, active: bool) -> ApiResult<ServiceDto> {
    state
        .db
        .services()
        .set_active(state.tenant_id(), id, active)
        .await?;

    info!(id = %id, active, "Service activation changed");
    get_service(state, id).await
}

/// Quotes an amount against a saved service's split.
///
/// Lenient on purpose: garbage input previews as R$ 0,00 and an inviable
/// amount is reported, never rejected. When `amount` is absent the
/// service's suggested price is used.
pub async fn preview_split(
    state: &AppState,
    id: &str,
    amount: Option<&str>,
) -> ApiResult<SplitPreviewDto> {
    let service = load_service(state, id).await?;

    let amount = match amount {
        Some(raw) => Money::parse_lenient(raw).clamp_non_negative(),
        None => service.default_amount().unwrap_or_default(),
    };
    let quote = service.split_config().quote(amount);

    Ok(SplitPreviewDto {
        service_id: Some(service.id),
        service_name: Some(service.name),
        quote: SplitQuoteDto::from(quote),
    })
}

/// Quotes form values that have not been saved yet.
pub fn preview_unsaved_split(req: &UnsavedSplitPreviewRequest) -> SplitPreviewDto {
    let split =
        SplitConfig::from_lenient_inputs(&req.acsm_value, &req.icetran_value, &req.taxa_cobranca);
    let amount = Money::parse_lenient(&req.amount).clamp_non_negative();

    SplitPreviewDto {
        service_id: None,
        service_name: None,
        quote: SplitQuoteDto::from(split.quote(amount)),
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(crate) async fn load_service(state: &AppState, id: &str) -> ApiResult<Service> {
    let service = state
        .db
        .services()
        .get_by_id(state.tenant_id(), id)
        .await?
        .ok_or_else(|| CoreError::ServiceNotFound(id.to_string()))?;
    Ok(service)
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional_money(field: &str, input: Option<&str>, fallback: Money) -> ApiResult<Money> {
    match input.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Ok(parse_money(field, raw)?),
        None => Ok(fallback),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{standard_service, test_state};
    use crate::error::ErrorCode;

    fn request(name: &str) -> CreateServiceRequest {
        CreateServiceRequest {
            name: name.to_string(),
            description: None,
            acsm_value: None,
            icetran_value: None,
            taxa_cobranca: None,
            default_amount: None,
        }
    }

    #[tokio::test]
    async fn test_create_service_defaults_to_standard_split() {
        let state = test_state().await;

        let dto = create_service(&state, request("  Recurso JARI  ")).await.unwrap();

        assert_eq!(dto.name, "Recurso JARI");
        assert_eq!(dto.minimum_charge_cents, 1550);
        assert_eq!(dto.minimum_charge, "R$ 15,50");
        assert!(dto.is_active);
    }

    #[tokio::test]
    async fn test_create_service_custom_split() {
        let state = test_state().await;

        let dto = create_service(
            &state,
            CreateServiceRequest {
                acsm_value: Some("11,00".to_string()),
                icetran_value: Some("R$ 11,00".to_string()),
                default_amount: Some("80".to_string()),
                ..request("Recurso capital")
            },
        )
        .await
        .unwrap();

        assert_eq!(dto.acsm_value_cents, 1100);
        assert_eq!(dto.icetran_value_cents, 1100);
        assert_eq!(dto.taxa_cobranca_cents, 350);
        assert_eq!(dto.minimum_charge_cents, 2550);
        assert_eq!(dto.default_amount_cents, Some(8000));
    }

    #[tokio::test]
    async fn test_create_service_rejects_bad_input() {
        let state = test_state().await;

        let err = create_service(&state, request("   ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = create_service(
            &state,
            CreateServiceRequest {
                acsm_value: Some("-1,00".to_string()),
                ..request("Negativo")
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("acsm_value"));

        let err = create_service(
            &state,
            CreateServiceRequest {
                taxa_cobranca: Some("três".to_string()),
                ..request("Texto")
            },
        )
        .await
        .unwrap_err();
        assert!(err.message.contains("taxa_cobranca"));
    }

    #[tokio::test]
    async fn test_duplicate_service_name() {
        let state = test_state().await;
        standard_service(&state, "Recurso JARI").await;

        let err = create_service(&state, request("Recurso JARI")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("already exists"));
    }

    #[tokio::test]
    async fn test_update_split_and_list() {
        let state = test_state().await;
        let service = standard_service(&state, "Recurso JARI").await;

        let updated = update_split_config(
            &state,
            &service.id,
            UpdateSplitRequest {
                acsm_value: "11,00".to_string(),
                icetran_value: "11,00".to_string(),
                taxa_cobranca: "3,50".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.minimum_charge_cents, 2550);

        let err = update_split_config(
            &state,
            &service.id,
            UpdateSplitRequest {
                acsm_value: "-0,01".to_string(),
                icetran_value: "0".to_string(),
                taxa_cobranca: "0".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        set_service_active(&state, &service.id, false).await.unwrap();
        assert!(list_services(&state, false).await.unwrap().is_empty());
        assert_eq!(list_services(&state, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_split_is_rejected_and_not_stored() {
        let state = test_state().await;
        let service = standard_service(&state, "Recurso JARI").await;

        let err = update_split_config(
            &state,
            &service.id,
            UpdateSplitRequest {
                acsm_value: "50000000000000000".to_string(),
                icetran_value: "50000000000000000".to_string(),
                taxa_cobranca: "0".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("acsm_value must be between"));

        let stored = get_service(&state, &service.id).await.unwrap();
        assert_eq!(stored.minimum_charge_cents, 1550);

        let err = create_service(
            &state,
            CreateServiceRequest {
                taxa_cobranca: Some("1.000.000.000,01".to_string()),
                ..request("Gigante")
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("taxa_cobranca"));
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_found() {
        let state = test_state().await;

        let err = get_service(&state, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_preview_is_lenient() {
        let state = test_state().await;
        let service = standard_service(&state, "Recurso JARI").await;

        let preview = preview_split(&state, &service.id, Some("60")).await.unwrap();
        assert_eq!(preview.quote.margin_cents, 4450);
        assert!(preview.quote.viable);

        let preview = preview_split(&state, &service.id, Some("abc")).await.unwrap();
        assert_eq!(preview.quote.amount_cents, 0);
        assert_eq!(preview.quote.margin_cents, 0);
        assert_eq!(preview.quote.shortfall_cents, 1550);
        assert!(!preview.quote.viable);

        // No amount: the suggested price
        let preview = preview_split(&state, &service.id, None).await.unwrap();
        assert_eq!(preview.quote.amount_cents, 6000);
    }

    #[test]
    fn test_preview_unsaved_split() {
        let preview = preview_unsaved_split(&UnsavedSplitPreviewRequest {
            acsm_value: "6".to_string(),
            icetran_value: "6,0".to_string(),
            taxa_cobranca: "3,5".to_string(),
            amount: "10".to_string(),
        });

        assert_eq!(preview.quote.minimum_charge_cents, 1550);
        assert_eq!(preview.quote.margin_cents, 0);
        assert_eq!(preview.quote.formatted.shortfall, "R$ 5,50");
        assert!(!preview.quote.viable);

        let empty = preview_unsaved_split(&UnsavedSplitPreviewRequest::default());
        assert_eq!(empty.quote.minimum_charge_cents, 0);
        assert!(empty.quote.viable);
    }
}
