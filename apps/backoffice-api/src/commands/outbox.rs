//! # Webhook Outbox Commands
//!
//! Endpoints polled by the external webhook worker.
//!
//! ```text
//! worker ──► GET  /webhooks/pending?limit=20   (oldest first)
//!        ──► POST {webhook URL}                (outside this service)
//!        ──► POST /webhooks/{id}/delivered     or
//!            POST /webhooks/{id}/failed { error }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use multas_core::{ValidationError, WebhookOutboxEntry};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_WEBHOOK_BATCH: u32 = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingWebhooksQuery {
    pub limit: Option<u32>,
}

/// Body of `POST /webhooks/{id}/failed`.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkFailedRequest {
    pub error: String,
}

/// Outbox entry as handed to the worker. `payload` is the event JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDto {
    pub id: String,
    pub event_type: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
}

impl TryFrom<WebhookOutboxEntry> for WebhookDto {
    type Error = ApiError;

    fn try_from(entry: WebhookOutboxEntry) -> Result<Self, Self::Error> {
        let payload = serde_json::from_str(&entry.payload).map_err(|e| {
            warn!(id = %entry.id, error = %e, "Outbox payload is not valid JSON");
            ApiError::internal(format!("Webhook {} has a corrupt payload", entry.id))
        })?;

        Ok(WebhookDto {
            id: entry.id,
            event_type: entry.event_type,
            entity_id: entry.entity_id,
            payload,
            attempts: entry.attempts,
            last_error: entry.last_error,
            created_at: entry.created_at,
            attempted_at: entry.attempted_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWebhooksDto {
    pub webhooks: Vec<WebhookDto>,
    /// Total undelivered, not just this batch.
    pub pending_count: i64,
}

/// Oldest undelivered events first.
pub async fn pending_webhooks(
    state: &AppState,
    query: PendingWebhooksQuery,
) -> ApiResult<PendingWebhooksDto> {
    let limit = state.config.page_size(query.limit, DEFAULT_WEBHOOK_BATCH);
    let outbox = state.db.webhook_outbox();

    let entries = outbox.get_pending(state.tenant_id(), limit).await?;
    let pending_count = outbox.count_pending(state.tenant_id()).await?;

    let webhooks = entries
        .into_iter()
        .map(WebhookDto::try_from)
        .collect::<ApiResult<Vec<_>>>()?;

    debug!(batch = webhooks.len(), pending_count, "pending_webhooks");
    Ok(PendingWebhooksDto {
        webhooks,
        pending_count,
    })
}

pub async fn mark_delivered(state: &AppState, id: &str) -> ApiResult<()> {
    state
        .db
        .webhook_outbox()
        .mark_delivered(state.tenant_id(), id)
        .await?;

    info!(id = %id, "Webhook delivered");
    Ok(())
}

/// Records a failed delivery attempt. The entry stays pending.
pub async fn mark_failed(state: &AppState, id: &str, req: MarkFailedRequest) -> ApiResult<()> {
    let error = req.error.trim();
    if error.is_empty() {
        return Err(ValidationError::Required {
            field: "error".to_string(),
        }
        .into());
    }

    state
        .db
        .webhook_outbox()
        .mark_failed(state.tenant_id(), id, error)
        .await?;

    warn!(id = %id, error = %error, "Webhook delivery failed");
    Ok(())
}
