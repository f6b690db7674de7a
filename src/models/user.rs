// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::BadgeName;

/// User record stored in Firestore.
///
/// The access token never leaves the server; API responses go through
/// [`UserResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal identifier (also used as document ID)
    pub id: String,
    /// GitHub account ID (unique)
    pub github_id: u64,
    /// Primary email address (unique)
    pub email: String,
    /// Display name, refreshed on every login
    pub name: String,
    /// Avatar URL, refreshed on every login
    pub avatar_url: String,
    /// GitHub OAuth access token
    pub access_token: String,
    /// Cumulative contribution points
    #[serde(default)]
    pub total_points: i64,
    /// Last time the user was synchronized (RFC 3339)
    pub last_synced_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile fields gathered from GitHub during a login.
#[derive(Debug, Clone)]
pub struct LoginProfile {
    pub github_id: u64,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    pub access_token: String,
}

impl User {
    /// Build a brand new user record from a login profile.
    pub fn new(profile: LoginProfile, total_points: i64, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            github_id: profile.github_id,
            email: profile.email,
            name: profile.name,
            avatar_url: profile.avatar_url,
            access_token: profile.access_token,
            total_points,
            last_synced_at: now.to_string(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Refresh the mutable profile fields after a successful login.
    ///
    /// Identity fields (`github_id`, `email`) and points are left untouched.
    pub fn apply_login(&mut self, profile: &LoginProfile, now: &str) {
        self.name = profile.name.clone();
        self.avatar_url = profile.avatar_url.clone();
        self.access_token = profile.access_token.clone();
        self.last_synced_at = now.to_string();
        self.updated_at = now.to_string();
    }

    /// Strip server-side secrets for an API response.
    pub fn sanitized(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            github_id: self.github_id,
            email: self.email.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            total_points: self.total_points,
            last_synced_at: self.last_synced_at.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// User as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub github_id: u64,
    pub email: String,
    pub name: String,
    pub avatar_url: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: i64,
    pub last_synced_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub github_id: u64,
    pub name: String,
    pub avatar_url: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: i64,
    pub badges: Vec<BadgeName>,
}

impl LeaderboardEntry {
    pub fn new(user: User, badges: Vec<BadgeName>) -> Self {
        Self {
            id: user.id,
            github_id: user.github_id,
            name: user.name,
            avatar_url: user.avatar_url,
            total_points: user.total_points,
            badges,
        }
    }
}
