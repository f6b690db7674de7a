// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User management and leaderboard routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::{LeaderboardEntry, LoginProfile, User, UserResponse};
use crate::routes::ApiResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Concurrent badge lookups when building a leaderboard page.
const MAX_CONCURRENT_DB_OPS: usize = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/auth", post(create_user))
        .route("/users/leaderboard", get(leaderboard))
        .route("/users/user/{github_id}", get(get_user_by_github_id))
        .route("/users/{id}/points", patch(add_points))
        .route("/users/{id}/sync", patch(mark_synced))
        .route("/users/{id}", delete(delete_user))
}

/// Body for registering a user directly.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(required)]
    pub github_id: Option<u64>,
    #[validate(required, email)]
    pub email: Option<String>,
    #[validate(required, length(min = 1))]
    pub name: Option<String>,
    #[validate(required, url)]
    pub avatar_url: Option<String>,
    #[validate(required, length(min = 1))]
    pub access_token: Option<String>,
    #[serde(default)]
    pub total_points: Option<i64>,
}

impl CreateUserRequest {
    /// Validate and convert into a login profile plus starting points.
    fn into_profile(self) -> Result<(LoginProfile, i64)> {
        if let Err(errors) = self.validate() {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|k| k.to_string())
                .collect();
            fields.sort();
            return Err(AppError::Validation(format!(
                "Missing or invalid fields: {}",
                fields.join(", ")
            )));
        }

        // validate() guarantees every required field is present
        match (
            self.github_id,
            self.email,
            self.name,
            self.avatar_url,
            self.access_token,
        ) {
            (Some(github_id), Some(email), Some(name), Some(avatar_url), Some(access_token)) => Ok((
                LoginProfile {
                    github_id,
                    email,
                    name,
                    avatar_url,
                    access_token,
                },
                self.total_points.unwrap_or(0),
            )),
            _ => Err(AppError::Validation("Missing required fields".to_string())),
        }
    }
}

/// Register a user with an already-obtained GitHub token.
async fn create_user(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>)> {
    let (profile, total_points) = body.into_profile()?;

    if state
        .db
        .find_by_identity(profile.github_id, &profile.email)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateIdentity);
    }

    let user = User::new(profile, total_points, &now_rfc3339());
    state.db.create_user(&user).await?;

    tracing::info!(user_id = %user.id, github_id = user.github_id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(user.sanitized()).with_message("User created successfully")),
    ))
}

/// Leaderboard query parameters. Unparseable values fall back to defaults.
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    page: Option<String>,
    #[serde(default)]
    limit: Option<String>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_users: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_users: u64) -> Self {
        let total_pages = total_users.div_ceil(limit as u64);
        Self {
            current_page: page,
            total_pages,
            total_users,
            has_next_page: (page as u64) < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// Resolve `page` and `limit` into validated values.
fn parse_page_params(query: &LeaderboardQuery) -> Result<(u32, u32)> {
    let parse = |value: &Option<String>, default: i64| {
        value
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(default)
    };

    let page = parse(&query.page, 1);
    let limit = parse(&query.limit, DEFAULT_PAGE_SIZE as i64);

    if page < 1 || limit < 1 {
        return Err(AppError::Validation(
            "Page and limit must be positive integers".to_string(),
        ));
    }

    let page = u32::try_from(page)
        .map_err(|_| AppError::Validation("Page is out of range".to_string()))?;
    let limit = limit.min(MAX_PAGE_SIZE as i64) as u32;
    Ok((page, limit))
}

/// Users ranked by points, with their badges.
async fn leaderboard(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    let (page, limit) = parse_page_params(&query)?;
    let offset = (page - 1).saturating_mul(limit);

    let (users, total_users) = tokio::try_join!(
        state.db.leaderboard_page(offset, limit),
        state.db.count_users(),
    )?;

    let db = &state.db;
    let entries = stream::iter(users)
        .map(|user| async move {
            let badges = db.badges_for_user(&user.id).await?;
            Ok::<_, AppError>(LeaderboardEntry::new(user, badges))
        })
        .buffered(MAX_CONCURRENT_DB_OPS)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(
        ApiResponse::data(entries).with_pagination(Pagination::new(page, limit, total_users)),
    ))
}

/// Look up a user by GitHub account ID.
async fn get_user_by_github_id(
    State(state): State<Arc<AppState>>,
    Path(github_id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let github_id: u64 = github_id
        .parse()
        .map_err(|_| AppError::Validation("GitHub ID must be a number".to_string()))?;

    let user = state
        .db
        .get_user_by_github_id(github_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(ApiResponse::data(user.sanitized())))
}

#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    #[serde(default)]
    points: serde_json::Value,
}

/// Add points to a user's total.
async fn add_points(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AddPointsRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let points = match &body.points {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| AppError::Validation("Points must be an integer".to_string()))?,
        _ => return Err(AppError::Validation("Points must be a number".to_string())),
    };

    let user = state
        .db
        .add_points(&id, points, &now_rfc3339())
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %id, points, total = user.total_points, "Points added");

    Ok(Json(
        ApiResponse::data(user.sanitized()).with_message("User points updated successfully"),
    ))
}

/// Record that the user's contributions were just synchronized.
async fn mark_synced(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = state
        .db
        .mark_synced(&id, &now_rfc3339())
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(
        ApiResponse::data(user.sanitized()).with_message("User synced successfully"),
    ))
}

/// Delete a user and their badges.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    if !state.db.delete_user(&id).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %id, "User deleted");

    Ok(Json(ApiResponse::message("User deleted successfully")))
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}
