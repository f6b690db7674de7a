// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Deployments use Firestore; local development without `GCP_PROJECT_ID`
//! and the test suite use the in-process [`MemoryDb`]. Both enforce the
//! same invariants: one user per GitHub ID and one user per email.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{BadgeName, LoginProfile, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Identity claims (`github_{id}` / `email_{address}`) pointing at a user ID
    pub const IDENTITIES: &str = "user_identities";
    pub const BADGES: &str = "badges";
}

/// Storage backend handle shared by all handlers.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

macro_rules! dispatch {
    ($self:ident, $db:ident => $call:expr) => {
        match $self {
            Database::Firestore($db) => $call.await,
            Database::Memory($db) => $call.await,
        }
    };
}

impl Database {
    /// Connect to the backend selected by the configuration.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        match &config.gcp_project_id {
            Some(project_id) => Ok(Database::Firestore(FirestoreDb::new(project_id).await?)),
            None => {
                tracing::warn!("GCP_PROJECT_ID not set, using in-process store (data is not persisted)");
                Ok(Database::Memory(MemoryDb::new()))
            }
        }
    }

    /// Look up a user whose GitHub ID OR email matches.
    pub async fn find_by_identity(
        &self,
        github_id: u64,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.find_by_identity(github_id, email))
    }

    /// Get a user by internal ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.get_user(id))
    }

    /// Get a user by GitHub account ID.
    pub async fn get_user_by_github_id(&self, github_id: u64) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.get_user_by_github_id(github_id))
    }

    /// Insert a new user. Fails with [`AppError::DuplicateIdentity`] if the
    /// GitHub ID or email is already taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        dispatch!(self, db => db.create_user(user))
    }

    /// Refresh profile fields and the access token after a login.
    pub async fn apply_login(
        &self,
        id: &str,
        profile: &LoginProfile,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.apply_login(id, profile, now))
    }

    /// Add `points` (may be negative) to a user's total.
    pub async fn add_points(
        &self,
        id: &str,
        points: i64,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.add_points(id, points, now))
    }

    /// Bump `last_synced_at`.
    pub async fn mark_synced(&self, id: &str, now: &str) -> Result<Option<User>, AppError> {
        dispatch!(self, db => db.mark_synced(id, now))
    }

    /// Delete a user with their identity claims and badges.
    ///
    /// Returns `false` if no such user existed.
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        dispatch!(self, db => db.delete_user(id))
    }

    /// Users ordered by points (desc) then creation time (desc).
    pub async fn leaderboard_page(&self, offset: u32, limit: u32) -> Result<Vec<User>, AppError> {
        dispatch!(self, db => db.leaderboard_page(offset, limit))
    }

    pub async fn count_users(&self) -> Result<u64, AppError> {
        dispatch!(self, db => db.count_users())
    }

    /// Badge names held by a user, in canonical order.
    pub async fn badges_for_user(&self, user_id: &str) -> Result<Vec<BadgeName>, AppError> {
        dispatch!(self, db => db.badges_for_user(user_id))
    }

    /// Award a badge. Returns `false` if the user already held it.
    pub async fn award_badge(
        &self,
        user_id: &str,
        badge: BadgeName,
        now: &str,
    ) -> Result<bool, AppError> {
        dispatch!(self, db => db.award_badge(user_id, badge, now))
    }
}
