//! Application error type with HTTP status mapping.
//!
//! Every variant renders as `{"error": "<message>"}`, the same body shape the
//! handlers have always returned.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks the role or ownership the operation needs.
    #[error("{0}")]
    Forbidden(String),

    /// Operation is not legal in the entity's current state.
    #[error("{0}")]
    InvalidState(String),

    /// Referenced contract, milestone, payment, job or user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    /// Unique business rule violated (e.g. a second contract for a job).
    #[error("{0}")]
    Conflict(String),

    /// A debit would take the wallet below zero.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    /// Webhook signature verification failed.
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    /// The payment processor rejected a request or could not be reached.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether a database error is a unique-constraint violation.
    pub fn is_unique_violation(err: &DbErr) -> bool {
        matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::InvalidState(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            AppError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::InvalidState("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InvalidSignature("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Gateway("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn insufficient_balance_message_names_both_amounts() {
        let err = AppError::InsufficientBalance {
            requested: 5000,
            available: 1200,
        };
        assert_eq!(
            err.to_string(),
            "insufficient balance: requested 5000, available 1200"
        );
    }
}
