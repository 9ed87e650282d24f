//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront API                     │
//! │                                                                         │
//! │  Handler ──► Service ──► emporium-core / emporium-db / collaborators    │
//! │                               │                                         │
//! │     PricingError::EmptyCart ──┼──► ApiError { EMPTY_CART }      422     │
//! │     LifecycleError::...     ──┼──► ApiError { INVALID_... }     409     │
//! │     DbError::NotFound       ──┼──► ApiError { NOT_FOUND }       404     │
//! │     DbError::QueryFailed    ──┴──► ApiError { DATABASE_ERROR }  500     │
//! │                                         │                               │
//! │                                         ▼                               │
//! │                     HTTP status + JSON { code, message }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged here with their detail and returned to the
//! client with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use emporium_core::{CoreError, CouponRejection, LifecycleError, PricingError, ValidationError};
use emporium_db::DbError;

use crate::collaborators::CollaboratorError;

/// Error body returned by every failing endpoint.
///
/// ```json
/// {
///   "code": "INVALID_TRANSITION",
///   "message": "Invalid transition: ship is not allowed from created"
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Checkout of an empty cart (422)
    EmptyCart,

    /// Coupon rejected by a rule (422)
    InvalidCoupon,

    /// Not enough stock to add a line (409)
    InsufficientStock,

    /// Event not allowed from the current order state (409)
    InvalidTransition,

    /// Order already delivered or cancelled (409)
    TerminalState,

    /// Actor may not request this event (403)
    Unauthorized,

    /// Payment retries used up (422)
    RetryLimitExceeded,

    /// Lost an optimistic version race after all retries (409)
    ConcurrentModification,

    /// Payment gateway failure (502)
    PaymentError,

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
            ErrorCode::EmptyCart
            | ErrorCode::InvalidCoupon
            | ErrorCode::RetryLimitExceeded => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InsufficientStock
            | ErrorCode::InvalidTransition
            | ErrorCode::TerminalState
            | ErrorCode::ConcurrentModification => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::FORBIDDEN,
            ErrorCode::PaymentError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::InvalidData(message) => ApiError::validation(message),
            DbError::CouponExhausted { code } => {
                PricingError::invalid_coupon(code, CouponRejection::UsageExhausted).into()
            }
            DbError::ConcurrentModification { entity, id, .. } => ApiError::new(
                ErrorCode::ConcurrentModification,
                format!("{} {} was modified concurrently, please retry", entity, id),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::QueryFailed(e) | DbError::Serialization(e) | DbError::Internal(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts cart errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::LineNotFound { .. }
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. }
            | CoreError::Validation(_) => ApiError::validation(err.to_string()),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        let code = match err {
            PricingError::EmptyCart => ErrorCode::EmptyCart,
            PricingError::InvalidCoupon { .. } => ErrorCode::InvalidCoupon,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let code = match err {
            LifecycleError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            LifecycleError::TerminalState { .. } => ErrorCode::TerminalState,
            LifecycleError::Unauthorized { .. } => ErrorCode::Unauthorized,
            LifecycleError::RetryLimitExceeded { .. } => ErrorCode::RetryLimitExceeded,
            LifecycleError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
            LifecycleError::InvalidOrder { .. } | LifecycleError::Validation(_) => {
                ErrorCode::ValidationError
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CollaboratorError> for ApiError {
    fn from(err: CollaboratorError) -> Self {
        match err {
            CollaboratorError::Db(e) => e.into(),
            CollaboratorError::Gateway(message) => {
                tracing::error!(%message, "Payment gateway failure");
                ApiError::new(ErrorCode::PaymentError, "Payment gateway unavailable")
            }
        }
    }
}

/// Result type for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Unit Tests
// =============================================================================
