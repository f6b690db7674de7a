// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process user store.
//!
//! A single mutex guards the records and both identity indexes, so every
//! operation is atomic with respect to the others.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::{BadgeName, LoginProfile, User};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    by_github_id: HashMap<u64, String>,
    by_email: HashMap<String, String>,
    badges: HashMap<String, BTreeSet<BadgeName>>,
}

impl Inner {
    fn modify<F>(&mut self, id: &str, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let user = self.users.get_mut(id)?;
        f(user);
        Some(user.clone())
    }
}

/// In-memory store, cheap to clone (shared handle).
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_by_identity(
        &self,
        github_id: u64,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().await;
        let id = inner
            .by_github_id
            .get(&github_id)
            .or_else(|| inner.by_email.get(email));
        Ok(id.and_then(|id| inner.users.get(id)).cloned())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.lock().await.users.get(id).cloned())
    }

    pub async fn get_user_by_github_id(&self, github_id: u64) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .by_github_id
            .get(&github_id)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.lock().await;
        if inner.by_github_id.contains_key(&user.github_id)
            || inner.by_email.contains_key(&user.email)
            || inner.users.contains_key(&user.id)
        {
            return Err(AppError::DuplicateIdentity);
        }

        inner.by_github_id.insert(user.github_id, user.id.clone());
        inner.by_email.insert(user.email.clone(), user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub async fn apply_login(
        &self,
        id: &str,
        profile: &LoginProfile,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.modify(id, |user| user.apply_login(profile, now)))
    }

    pub async fn add_points(
        &self,
        id: &str,
        points: i64,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.modify(id, |user| {
            user.total_points = user.total_points.saturating_add(points);
            user.last_synced_at = now.to_string();
            user.updated_at = now.to_string();
        }))
    }

    pub async fn mark_synced(&self, id: &str, now: &str) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.modify(id, |user| {
            user.last_synced_at = now.to_string();
            user.updated_at = now.to_string();
        }))
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner.users.remove(id) else {
            return Ok(false);
        };
        inner.by_github_id.remove(&user.github_id);
        inner.by_email.remove(&user.email);
        inner.badges.remove(id);
        Ok(true)
    }

    pub async fn leaderboard_page(&self, offset: u32, limit: u32) -> Result<Vec<User>, AppError> {
        let inner = self.inner.lock().await;
        let mut users: Vec<&User> = inner.users.values().collect();
        users.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(users
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    pub async fn count_users(&self) -> Result<u64, AppError> {
        Ok(self.inner.lock().await.users.len() as u64)
    }

    pub async fn badges_for_user(&self, user_id: &str) -> Result<Vec<BadgeName>, AppError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .badges
            .get(user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    pub async fn award_badge(
        &self,
        user_id: &str,
        badge: BadgeName,
        _now: &str,
    ) -> Result<bool, AppError> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(user_id) {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(inner
            .badges
            .entry(user_id.to_string())
            .or_default()
            .insert(badge))
    }
}
