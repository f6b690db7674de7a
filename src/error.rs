// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authorization code is required")]
    MissingCode,

    #[error("Failed to get access token from GitHub")]
    TokenExchangeFailed,

    #[error("No email found in GitHub account")]
    NoEmailAvailable,

    #[error("User already exists with this GitHub ID or email")]
    DuplicateIdentity,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("GitHub API error: {0}")]
    UpstreamUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Errors the caller caused; these keep their own status in every flow.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::MissingCode
                | AppError::TokenExchangeFailed
                | AppError::NoEmailAvailable
                | AppError::DuplicateIdentity
                | AppError::NotFound(_)
                | AppError::Validation(_)
                | AppError::Unauthorized
        )
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::MissingCode | AppError::TokenExchangeFailed | AppError::NoEmailAvailable => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::DuplicateIdentity => (StatusCode::CONFLICT, self.to_string()),
            AppError::AuthenticationFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication failed".to_string(),
            ),
            AppError::UpstreamUnavailable(_) | AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }

    /// Raw error text, only surfaced outside production.
    fn detail(&self) -> Option<String> {
        match self {
            AppError::UpstreamUnavailable(msg)
            | AppError::AuthenticationFailed(msg)
            | AppError::Database(msg) => Some(msg.clone()),
            AppError::Internal(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

/// JSON error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detail text stashed on error responses for [`crate::middleware::errors`].
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let detail = self.detail();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            success: false,
            message: message.clone(),
            error: None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response
                .extensions_mut()
                .insert(ErrorDetail { message, detail });
        }
        response
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
