// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("member has no outstanding invoices")]
    NoOutstandingInvoices,

    #[error("paid invoices cannot be deleted")]
    PaidInvoiceImmutable,

    #[error("payment is {0}, only pending payments can be approved")]
    PaymentNotPending(&'static str),

    #[error("email already in use")]
    EmailAlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("role '{0}' is not allowed to {1}")]
    Forbidden(String, &'static str),

    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("internal error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("jwt error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("csv error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("font not found: {0}")]
    FontNotFound(String),

    #[error("upload error: {0}")]
    Upload(String),
}

/// Error body sent to the dashboard.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, error, details) = match err {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                (
                    StatusCode::BAD_REQUEST,
                    "One or more fields are invalid.".to_string(),
                    Some(Value::Object(details)),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{entity} not found."), None),
            AppError::NoOutstandingInvoices => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "No outstanding invoices for this member.".to_string(),
                None,
            ),
            AppError::PaidInvoiceImmutable => (
                StatusCode::CONFLICT,
                "Paid invoices cannot be deleted.".to_string(),
                None,
            ),
            AppError::PaymentNotPending(status) => (
                StatusCode::CONFLICT,
                format!("Only pending payments can be approved; this one is {status}."),
                None,
            ),
            AppError::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "This email is already in use.".to_string(), None)
            }
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password.".to_string(), None)
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid authentication token.".to_string(),
                None,
            ),
            AppError::Forbidden(role, action) => (
                StatusCode::FORBIDDEN,
                format!("Role '{role}' is not allowed to {action}."),
                None,
            ),
            AppError::Transport(msg) => {
                tracing::warn!(error = %msg, "outbound transport failed");
                (StatusCode::BAD_GATEWAY, msg, None)
            }
            AppError::Upload(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ref e => {
                tracing::error!(error = %e, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred.".to_string(),
                    None,
                )
            }
        };

        ApiError { status, error, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        assert_eq!(ApiError::from(AppError::NotFound("Member")).status, StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(AppError::NoOutstandingInvoices).status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::from(AppError::PaidInvoiceImmutable).status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from(AppError::PaymentNotPending("Rejected")).status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(AppError::Transport("smtp down".into())).status,
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn hides_internal_details() {
        let api = ApiError::from(AppError::InternalServerError(anyhow::anyhow!("pool exploded")));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
    }
}
