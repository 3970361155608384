//! # HTTP Routes
//!
//! Thin axum handlers: extract, call the command, wrap the result.
//!
//! ```text
//! GET    /health
//! GET    /services                         POST /services
//! GET    /services/{id}                    PUT  /services/{id}/split
//! PUT    /services/{id}/active
//! GET    /services/{id}/split-preview?amount=
//! GET    /services/{id}/summary
//! POST   /split-preview
//! POST   /charges/quote                    POST /charges
//! GET    /charges?service_id&status&limit
//! GET    /charges/{id}                     PATCH /charges/{id}/status
//! GET    /webhooks/pending?limit
//! POST   /webhooks/{id}/delivered          POST /webhooks/{id}/failed
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::commands::charges::{
    self, ChargeCreatedDto, ChargeDto, ChargeSummaryDto, CreateChargeRequest, ListChargesQuery,
    QuoteChargeRequest, UpdateChargeStatusRequest,
};
use crate::commands::outbox::{self, MarkFailedRequest, PendingWebhooksDto, PendingWebhooksQuery};
use crate::commands::services::{
    self, CreateServiceRequest, ServiceDto, SplitPreviewDto, UnsavedSplitPreviewRequest,
    UpdateSplitRequest,
};
use crate::commands::SplitQuoteDto;
use crate::error::ApiResult;
use crate::state::AppState;

/// Builds the back-office router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/services", get(list_services).post(create_service))
        .route("/services/{id}", get(get_service))
        .route("/services/{id}/split", put(update_split))
        .route("/services/{id}/active", put(set_service_active))
        .route("/services/{id}/split-preview", get(preview_split))
        .route("/services/{id}/summary", get(charge_summary))
        .route("/split-preview", post(preview_unsaved_split))
        .route("/charges/quote", post(quote_charge))
        .route("/charges", get(list_charges).post(create_charge))
        .route("/charges/{id}", get(get_charge))
        .route("/charges/{id}/status", patch(update_charge_status))
        .route("/webhooks/pending", get(pending_webhooks))
        .route("/webhooks/{id}/delivered", post(mark_delivered))
        .route("/webhooks/{id}/failed", post(mark_failed))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    database: bool,
    migrations_total: usize,
    migrations_applied: usize,
    environment: String,
}

/// 200 when the database answers and every migration is applied, 503
/// otherwise.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.db.health_check().await;
    let (migrations_total, migrations_applied) = match state.db.migration_status().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Could not read migration status");
            (0, 0)
        }
    };

    let ok = database && migrations_total > 0 && migrations_total == migrations_applied;
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            ok,
            database,
            migrations_total,
            migrations_applied,
            environment: state.config.environment.to_string(),
        }),
    )
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ListServicesQuery {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Debug, Deserialize)]
struct SetActiveRequest {
    active: bool,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewQuery {
    amount: Option<String>,
}

async fn list_services(
    State(state): State<AppState>,
    query: Result<Query<ListServicesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ServiceDto>>> {
    let Query(query) = query?;
    let list = services::list_services(&state, query.include_inactive).await?;
    Ok(Json(list))
}

async fn create_service(
    State(state): State<AppState>,
    body: Result<Json<CreateServiceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ServiceDto>)> {
    let Json(req) = body?;
    let service = services::create_service(&state, req).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ServiceDto>> {
    Ok(Json(services::get_service(&state, &id).await?))
}

async fn update_split(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSplitRequest>, JsonRejection>,
) -> ApiResult<Json<ServiceDto>> {
    let Json(req) = body?;
    Ok(Json(services::update_split_config(&state, &id, req).await?))
}

async fn set_service_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SetActiveRequest>, JsonRejection>,
) -> ApiResult<Json<ServiceDto>> {
    let Json(req) = body?;
    Ok(Json(services::set_service_active(&state, &id, req.active).await?))
}

async fn preview_split(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<PreviewQuery>, QueryRejection>,
) -> ApiResult<Json<SplitPreviewDto>> {
    let Query(query) = query?;
    let preview = services::preview_split(&state, &id, query.amount.as_deref()).await?;
    Ok(Json(preview))
}

async fn preview_unsaved_split(
    body: Result<Json<UnsavedSplitPreviewRequest>, JsonRejection>,
) -> ApiResult<Json<SplitPreviewDto>> {
    let Json(req) = body?;
    Ok(Json(services::preview_unsaved_split(&req)))
}

async fn charge_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ChargeSummaryDto>> {
    Ok(Json(charges::charge_summary(&state, &id).await?))
}

// =============================================================================
// Charges
// =============================================================================

async fn quote_charge(
    State(state): State<AppState>,
    body: Result<Json<QuoteChargeRequest>, JsonRejection>,
) -> ApiResult<Json<SplitQuoteDto>> {
    let Json(req) = body?;
    Ok(Json(charges::quote_charge(&state, req).await?))
}

async fn create_charge(
    State(state): State<AppState>,
    body: Result<Json<CreateChargeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ChargeCreatedDto>)> {
    let Json(req) = body?;
    let today = Utc::now().date_naive();
    let created = charges::create_charge(&state, req, today).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_charges(
    State(state): State<AppState>,
    query: Result<Query<ListChargesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ChargeDto>>> {
    let Query(query) = query?;
    Ok(Json(charges::list_charges(&state, query).await?))
}

async fn get_charge(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ChargeDto>> {
    Ok(Json(charges::get_charge(&state, &id).await?))
}

async fn update_charge_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateChargeStatusRequest>, JsonRejection>,
) -> ApiResult<Json<ChargeDto>> {
    let Json(req) = body?;
    Ok(Json(charges::update_charge_status(&state, &id, req).await?))
}

// =============================================================================
// Webhook outbox
// =============================================================================

async fn pending_webhooks(
    State(state): State<AppState>,
    query: Result<Query<PendingWebhooksQuery>, QueryRejection>,
) -> ApiResult<Json<PendingWebhooksDto>> {
    let Query(query) = query?;
    Ok(Json(outbox::pending_webhooks(&state, query).await?))
}

async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    outbox::mark_delivered(&state, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_failed(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<MarkFailedRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    outbox::mark_failed(&state, &id, req).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::commands::test_support::{standard_service, test_state};

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(test_state().await);

        let response = send(app, Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["database"], true);
    }

    #[tokio::test]
    async fn test_create_service_and_preview() {
        let state = test_state().await;

        let response = send(
            router(state.clone()),
            Method::POST,
            "/services",
            Some(json!({ "name": "Recurso JARI", "defaultAmount": "60,00" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let service = body_json(response).await;
        assert_eq!(service["minimumCharge"], "R$ 15,50");
        let id = service["id"].as_str().unwrap().to_string();

        let response = send(
            router(state.clone()),
            Method::GET,
            &format!("/services/{}/split-preview?amount=10", id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let preview = body_json(response).await;
        assert_eq!(preview["quote"]["viable"], false);
        assert_eq!(preview["quote"]["formatted"]["shortfall"], "R$ 5,50");

        let response = send(router(state), Method::GET, "/services", None).await;
        let list = body_json(response).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_unsaved_preview() {
        let app = router(test_state().await);

        let response = send(
            app,
            Method::POST,
            "/split-preview",
            Some(json!({ "acsmValue": "6", "icetranValue": "6", "taxaCobranca": "3,5", "amount": "60" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let preview = body_json(response).await;
        assert_eq!(preview["quote"]["marginCents"], 4450);
    }

    #[tokio::test]
    async fn test_below_minimum_charge_is_422() {
        let state = test_state().await;
        let service = standard_service(&state, "Recurso JARI").await;
        let due = (Utc::now().date_naive() + chrono::Duration::days(5)).to_string();

        let response = send(
            router(state.clone()),
            Method::POST,
            "/charges",
            Some(json!({
                "serviceId": service.id,
                "customerName": "Maria Souza",
                "customerDocument": "529.982.247-25",
                "dueDate": due,
                "amount": "10,00"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["code"], "BELOW_MINIMUM_CHARGE");

        let response = send(
            router(state.clone()),
            Method::POST,
            "/charges",
            Some(json!({
                "serviceId": service.id,
                "customerName": "Maria Souza",
                "customerDocument": "529.982.247-25",
                "dueDate": due,
                "amount": "60,00"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let charge_id = created["charge"]["id"].as_str().unwrap().to_string();
        let webhook_id = created["webhookId"].as_str().unwrap().to_string();

        let response = send(
            router(state.clone()),
            Method::PATCH,
            &format!("/charges/{}/status", charge_id),
            Some(json!({ "status": "confirmed" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "confirmed");

        let response = send(
            router(state.clone()),
            Method::POST,
            &format!("/webhooks/{}/delivered", webhook_id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Only the status_changed event is left
        let response = send(router(state), Method::GET, "/webhooks/pending", None).await;
        let pending = body_json(response).await;
        assert_eq!(pending["pendingCount"], 1);
        assert_eq!(pending["webhooks"][0]["eventType"], "charge.status_changed");
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let state = test_state().await;

        let response = send(
            router(state.clone()),
            Method::POST,
            "/services",
            Some(json!({ "description": "no name" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

        let response = send(router(state.clone()), Method::GET, "/charges?status=paid", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(router(state), Method::GET, "/charges/missing", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }
}
