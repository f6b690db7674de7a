// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod github;

pub use auth::{AuthService, OAuthResult};
pub use github::GitHubClient;
