//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Back Office                        │
//! │                                                                         │
//! │  POST /charges                                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function → Result<T, ApiError>                          │  │
//! │  │                                                                  │  │
//! │  │  ValidationError ──────────────► VALIDATION_ERROR      (400)     │  │
//! │  │  CoreError::BelowMinimumCharge ► BELOW_MINIMUM_CHARGE  (422)     │  │
//! │  │  CoreError (other rules) ──────► BUSINESS_LOGIC        (422)     │  │
//! │  │  DbError::NotFound ────────────► NOT_FOUND             (404)     │  │
//! │  │  DbError (other) ──────────────► DATABASE_ERROR        (500)     │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  { "code": "BELOW_MINIMUM_CHARGE",                                     │
//! │    "message": "Charge amount R$ 10,00 is below the minimum ..." }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use multas_core::{CoreError, ValidationError};
use multas_db::DbError;

/// API error returned from handlers.
///
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Service not found: 0b7c…"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Charge amount does not cover the fixed split (422)
    BelowMinimumCharge,

    /// Business rule violated (422)
    BusinessLogic,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::BelowMinimumCharge | ErrorCode::BusinessLogic => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BusinessLogic, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                // "services.tenant_id, services.name" → "name"
                let column = field
                    .rsplit(", ")
                    .next()
                    .and_then(|c| c.rsplit('.').next())
                    .unwrap_or(&field);
                ApiError::validation(format!("{} '{}' already exists", column, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint violation: {}", message);
                ApiError::validation("Value violates a database constraint")
            }
            DbError::Conflict(message) => ApiError::business(message),
            DbError::Core(e) => ApiError::from(e),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Payload serialization failed: {}", e);
                ApiError::internal("Could not serialize event payload")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ServiceNotFound(id) => ApiError::not_found("Service", &id),
            CoreError::ChargeNotFound(id) => ApiError::not_found("Charge", &id),
            e @ CoreError::BelowMinimumCharge { .. } => {
                ApiError::new(ErrorCode::BelowMinimumCharge, e.to_string())
            }
            e @ (CoreError::ServiceInactive(_) | CoreError::InvalidStatusTransition { .. }) => {
                ApiError::business(e.to_string())
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for commands and handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use multas_core::{ChargeStatus, Money};

    #[test]
    fn test_below_minimum_maps_to_422() {
        let err = ApiError::from(CoreError::BelowMinimumCharge {
            amount: Money::from_cents(1000),
            minimum: Money::from_cents(1550),
        });

        assert_eq!(err.code, ErrorCode::BelowMinimumCharge);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.message.contains("R$ 15,50"));
    }

    #[test]
    fn test_transition_error_through_db_layer() {
        let err = ApiError::from(DbError::Core(CoreError::InvalidStatusTransition {
            charge_id: "c-1".to_string(),
            from: ChargeStatus::Cancelled,
            to: ChargeStatus::Received,
        }));

        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[test]
    fn test_db_errors() {
        assert_eq!(
            ApiError::from(DbError::not_found("Charge", "x")).status(),
            StatusCode::NOT_FOUND
        );

        let dup = ApiError::from(DbError::duplicate("services.tenant_id, services.name", "Recurso"));
        assert_eq!(dup.code, ErrorCode::ValidationError);
        assert_eq!(dup.message, "name 'Recurso' already exists");

        let internal = ApiError::from(DbError::QueryFailed("disk I/O error".to_string()));
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("disk"));
    }

    #[test]
    fn test_serialization() {
        let err = ApiError::validation("customer_name is required");
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "customer_name is required");
    }
}
