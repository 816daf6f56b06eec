//! Error types for the billing proxy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use itel_billing_client::{parse_error_code, BillingError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Proxy error types.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid credentials")]
    Unauthorized,

    /// The provider answered `status: "false"`.
    #[error("{message}")]
    Provider {
        code: String,
        message: String,
        detail: Option<String>,
    },

    #[error("Billing provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProxyError {
    /// Decode a provider rejection description.
    pub fn provider(description: &str) -> Self {
        let parsed = parse_error_code(description);
        ProxyError::Provider {
            message: parsed.message().to_string(),
            code: parsed.code,
            detail: parsed.detail,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Validation(_)
            | ProxyError::Conflict(_)
            | ProxyError::Provider { .. } => StatusCode::BAD_REQUEST,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Unauthorized => StatusCode::UNAUTHORIZED,
            ProxyError::ProviderUnavailable(_)
            | ProxyError::Storage(_)
            | ProxyError::Encryption(_)
            | ProxyError::Token(_)
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ProxyError::Provider {
                code,
                message,
                detail,
            } => ErrorResponse {
                status: "false",
                message,
                error_code: Some(code),
                detail,
            },
            other if status.is_server_error() => {
                error!(error = %other, "Request failed");
                ErrorResponse {
                    status: "false",
                    message: "Internal Server Error".to_string(),
                    error_code: None,
                    detail: None,
                }
            }
            other => ErrorResponse {
                status: "false",
                message: other.to_string(),
                error_code: None,
                detail: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ProxyError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::Rejected(envelope) => ProxyError::provider(&envelope.description),
            other => ProxyError::ProviderUnavailable(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(e: std::io::Error) -> Self {
        ProxyError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(e: serde_json::Error) -> Self {
        ProxyError::Storage(format!("JSON serialization error: {}", e))
    }
}

impl From<aes_gcm::Error> for ProxyError {
    fn from(_: aes_gcm::Error) -> Self {
        ProxyError::Encryption("AES-GCM encryption/decryption failed".to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for ProxyError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        ProxyError::Token(e.to_string())
    }
}
