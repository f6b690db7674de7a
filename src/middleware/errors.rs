// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error detail exposure for non-production deployments.
//!
//! [`AppError`](crate::error::AppError) responses carry their raw error text
//! in an [`ErrorDetail`] extension. Outside production this middleware
//! re-renders the body with that text in the `error` field.

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

pub async fn expose_error_details(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if state.config.production {
        return response;
    }

    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let body = ErrorResponse {
        success: false,
        message: detail.message,
        error: Some(detail.detail),
    };
    (response.status(), Json(body)).into_response()
}
