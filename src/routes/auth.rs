// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub OAuth authentication routes.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::auth::{create_jwt, expired_session_cookie, session_cookie, AuthUser};
use crate::middleware::require_auth;
use crate::models::{User, UserResponse};
use crate::routes::ApiResponse;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// How long a signed OAuth state stays valid.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/auth/me", get(me))
        .route_layer(axum::middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .route("/auth/login", get(auth_start))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/github", post(auth_popup))
        .route("/auth/logout", post(logout))
        .merge(protected)
}

/// Start OAuth flow - redirect to GitHub authorization.
async fn auth_start(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response> {
    let now_ms = now_millis()?;
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let oauth_state = sign_state(&state.config.jwt_signing_key, &nonce, now_ms)?;

    let callback_url = callback_url(&state.config, &headers);
    let auth_url = state
        .auth_service
        .github()
        .authorize_url(&callback_url, &oauth_state);

    tracing::info!(
        client_id = %state.config.github_client_id,
        callback_url = %callback_url,
        "Starting OAuth flow, redirecting to GitHub"
    );

    Ok(found(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code, create session, redirect to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Response)> {
    let code = params
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or(AppError::MissingCode)?;

    let frontend_url = &state.config.frontend_url;
    let failure = || found(&format!("{}/?auth=error", frontend_url));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from GitHub");
        return Ok((jar, failure()));
    }

    let state_valid = params.state.as_deref().is_some_and(|s| {
        now_millis()
            .map(|now| verify_state(s, &state.config.jwt_signing_key, now))
            .unwrap_or(false)
    });
    if !state_valid {
        tracing::warn!("Missing, expired or tampered OAuth state parameter");
        return Ok((jar, failure()));
    }

    let callback_url = callback_url(&state.config, &headers);
    let session = match start_session(&state, &code, &callback_url).await {
        Ok((_, token)) => token,
        Err(e) => {
            tracing::error!(error = %e, "OAuth callback failed");
            return Ok((jar, failure()));
        }
    };

    let jar = jar.add(session_cookie(session, state.config.production));
    Ok((
        jar,
        found(&format!("{}/?auth=success", frontend_url)),
    ))
}

#[derive(Deserialize)]
pub struct PopupExchangeRequest {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Serialize)]
pub struct AuthSuccessResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
    pub token: String,
}

/// Popup flow: the frontend relays the code it received.
async fn auth_popup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(body): ApiJson<PopupExchangeRequest>,
) -> Result<(CookieJar, Json<AuthSuccessResponse>)> {
    let code = body
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or(AppError::MissingCode)?;

    let (user, token) = start_session(&state, &code, &state.config.popup_redirect_uri)
        .await
        .map_err(|e| {
            if e.is_client_error() {
                e
            } else {
                AppError::AuthenticationFailed(e.to_string())
            }
        })?;

    let jar = jar.add(session_cookie(token.clone(), state.config.production));
    Ok((
        jar,
        Json(AuthSuccessResponse {
            success: true,
            message: "Authentication successful".to_string(),
            user: user.sanitized(),
            token,
        }),
    ))
}

/// Complete the login and mint a session JWT.
async fn start_session(
    state: &AppState,
    code: &str,
    redirect_uri: &str,
) -> Result<(User, String)> {
    let result = state
        .auth_service
        .handle_oauth_callback(code, redirect_uri)
        .await?;

    let token = create_jwt(&result.user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok((result.user, token))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Logout - expire the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.add(expired_session_cookie(state.config.production));
    (
        jar,
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
        }),
    )
}

/// Current session's user.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::data(user.sanitized())))
}

/// `302 Found` redirect to `url`.
fn found(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// This service's `/auth/callback` URL.
///
/// Prefers the configured public URL; otherwise trusts the `Host` header,
/// using plain HTTP only for loopback hosts.
fn callback_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(public_url) = &config.public_url {
        return format!("{}/auth/callback", public_url);
    }

    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("localhost:{}", config.port));

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };

    format!("{}://{}/auth/callback", scheme, host)
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

/// Build the OAuth `state` value: base64url of `"nonce|timestamp_hex|signature_hex"`.
fn sign_state(secret: &[u8], nonce: &str, timestamp_ms: u128) -> Result<String> {
    let payload = format!("{}|{:x}", nonce, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the signature and age of an OAuth `state` value.
fn verify_state(state: &str, secret: &[u8], now_ms: u128) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", nonce, timestamp_hex).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    match u128::from_str_radix(timestamp_hex, 16) {
        Ok(issued) => issued <= now_ms && now_ms - issued <= STATE_MAX_AGE_MS,
        Err(_) => false,
    }
}
