// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MergeQuest: gamified GitHub contribution tracking
//!
//! This crate provides the backend API: GitHub OAuth login, session
//! cookies, and the user store behind the points leaderboard.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use error::AppError;
use services::{AuthService, GitHubClient};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub auth_service: AuthService,
}

impl AppState {
    /// Wire the services for `config` on top of an opened database.
    pub fn new(config: Config, db: Database) -> Result<Self, AppError> {
        let github = GitHubClient::new(&config)?;
        let auth_service = AuthService::new(github, db.clone());
        Ok(Self {
            config,
            db,
            auth_service,
        })
    }
}
