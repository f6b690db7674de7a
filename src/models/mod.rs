// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod badge;
pub mod user;

pub use badge::{Badge, BadgeName};
pub use user::{LeaderboardEntry, LoginProfile, User, UserResponse};
