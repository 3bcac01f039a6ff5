//! Centralized API error handling for CreditVault
//!
//! Every fallible operation in the core surfaces one of these variants. The
//! business-rule rejections carry their comparison values so callers can act
//! on them without parsing messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Credit score {current} is below the required {required}")]
    InsufficientCredit { current: i32, required: i32 },

    #[error("Collateral ratio {ratio}% is below the required {required}%")]
    InsufficientCollateral { ratio: Decimal, required: Decimal },

    #[error("Payment is short of the total due by {shortfall}")]
    InsufficientPayment { shortfall: Decimal },

    #[error("Storage failure")]
    Storage(#[source] sqlx::Error),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidState(_) => "INVALID_STATE",
            ApiError::InsufficientCredit { .. } => "INSUFFICIENT_CREDIT",
            ApiError::InsufficientCollateral { .. } => "INSUFFICIENT_COLLATERAL",
            ApiError::InsufficientPayment { .. } => "INSUFFICIENT_PAYMENT",
            ApiError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::InsufficientCredit { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InsufficientCollateral { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InsufficientPayment { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Structured comparison values for business-rule rejections
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::InsufficientCredit { current, required } => {
                Some(json!({ "current": current, "required": required }))
            }
            ApiError::InsufficientCollateral { ratio, required } => {
                Some(json!({ "ratio": ratio, "required": required }))
            }
            ApiError::InsufficientPayment { shortfall } => {
                Some(json!({ "shortfall": shortfall }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Storage failures keep their diagnostic detail in the log; the
        // client only learns the mutation rolled back and may retry.
        let message = match &self {
            ApiError::Storage(source) => {
                tracing::error!(error = %source, code = %error_code, "Storage error, full rollback");
                "Storage failure, the operation was rolled back and is safe to retry".to_string()
            }
            other => {
                tracing::debug!(error = %other, code = %error_code, "Request rejected");
                other.to_string()
            }
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// Convenience conversions from common error types

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            _ => ApiError::Storage(err),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::ValidationError(format!("Invalid JSON: {}", err))
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::Unauthorized("bad signature".to_string()).error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(
            ApiError::InsufficientCredit {
                current: 400,
                required: 500
            }
            .error_code(),
            "INSUFFICIENT_CREDIT"
        );
        assert_eq!(
            ApiError::InvalidState("loan is not active".to_string()).error_code(),
            "INVALID_STATE"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Unauthorized("test".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::ValidationError("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InsufficientPayment {
                shortfall: Decimal::from(10)
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::InvalidState("test".to_string()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_business_rejections_carry_comparison_values() {
        let err = ApiError::InsufficientCredit {
            current: 400,
            required: 500,
        };
        let details = err.details().expect("details");
        assert_eq!(details["current"], 400);
        assert_eq!(details["required"], 500);

        let err = ApiError::InsufficientPayment {
            shortfall: Decimal::new(725, 2),
        };
        let details = err.details().expect("details");
        assert_eq!(details["shortfall"], serde_json::json!("7.25"));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
