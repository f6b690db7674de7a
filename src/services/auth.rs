// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GitHub login: code exchange, profile lookup and user upsert.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{LoginProfile, User};
use crate::services::github::{select_email, GitHubClient};
use crate::time_utils::now_rfc3339;

/// Login service combining the GitHub client with the user store.
#[derive(Clone)]
pub struct AuthService {
    github: GitHubClient,
    db: Database,
}

/// Result of a completed OAuth login.
#[derive(Debug)]
pub struct OAuthResult {
    pub user: User,
    /// `true` if this login registered a new user
    pub created: bool,
}

impl AuthService {
    pub fn new(github: GitHubClient, db: Database) -> Self {
        Self { github, db }
    }

    pub fn github(&self) -> &GitHubClient {
        &self.github
    }

    /// Handle an OAuth callback: exchange the code, fetch the GitHub
    /// profile and primary email, then create or refresh the user.
    ///
    /// `redirect_uri` must match the one the authorization code was
    /// issued for.
    pub async fn handle_oauth_callback(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthResult, AppError> {
        if code.trim().is_empty() {
            return Err(AppError::MissingCode);
        }

        let access_token = self.github.exchange_code(code, redirect_uri).await?;

        let (github_user, emails) = tokio::try_join!(
            self.github.get_user(&access_token),
            self.github.get_emails(&access_token),
        )?;

        let email = select_email(&emails, &github_user).ok_or(AppError::NoEmailAvailable)?;

        let profile = LoginProfile {
            github_id: github_user.id,
            email,
            name: github_user.display_name(),
            avatar_url: github_user.avatar_url,
            access_token,
        };

        let (user, created) = self.upsert_user(profile).await?;

        tracing::info!(
            user_id = %user.id,
            github_id = user.github_id,
            created,
            "GitHub login completed"
        );

        Ok(OAuthResult { user, created })
    }

    /// Create the user, or refresh the existing one matching the GitHub ID
    /// or email.
    ///
    /// A concurrent first login for the same identity makes one insert fail
    /// with [`AppError::DuplicateIdentity`]; the loser then updates the
    /// winner's record instead, so both logins succeed on one user.
    pub async fn upsert_user(&self, profile: LoginProfile) -> Result<(User, bool), AppError> {
        let now = now_rfc3339();

        if let Some(existing) = self
            .db
            .find_by_identity(profile.github_id, &profile.email)
            .await?
        {
            let user = self.refresh_user(&existing.id, &profile, &now).await?;
            return Ok((user, false));
        }

        let user = User::new(profile.clone(), 0, &now);
        match self.db.create_user(&user).await {
            Ok(()) => Ok((user, true)),
            Err(AppError::DuplicateIdentity) => {
                tracing::info!(
                    github_id = profile.github_id,
                    "User created by a concurrent login, updating instead"
                );
                let existing = self
                    .db
                    .find_by_identity(profile.github_id, &profile.email)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database("identity claimed but no user found".to_string())
                    })?;
                let user = self.refresh_user(&existing.id, &profile, &now).await?;
                Ok((user, false))
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh_user(
        &self,
        id: &str,
        profile: &LoginProfile,
        now: &str,
    ) -> Result<User, AppError> {
        self.db
            .apply_login(id, profile, now)
            .await?
            .ok_or_else(|| AppError::Database(format!("user {} disappeared during login", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryDb;

    fn service(db: &MemoryDb) -> AuthService {
        let github = GitHubClient::new(&Config::test_default()).unwrap();
        AuthService::new(github, Database::Memory(db.clone()))
    }

    fn profile(github_id: u64, email: &str, name: &str, token: &str) -> LoginProfile {
        LoginProfile {
            github_id,
            email: email.to_string(),
            name: name.to_string(),
            avatar_url: "http://x/a.png".to_string(),
            access_token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_refreshes() {
        let db = MemoryDb::new();
        let service = service(&db);

        let (first, created) = service
            .upsert_user(profile(42, "a@x.com", "alice", "tok1"))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(first.total_points, 0);

        let (second, created) = service
            .upsert_user(profile(42, "a@x.com", "alice2", "tok2"))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "alice2");
        assert_eq!(second.access_token, "tok2");
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_matches_on_email() {
        let db = MemoryDb::new();
        let service = service(&db);

        let (first, _) = service
            .upsert_user(profile(42, "a@x.com", "alice", "tok1"))
            .await
            .unwrap();
        let (second, created) = service
            .upsert_user(profile(99, "a@x.com", "alice", "tok2"))
            .await
            .unwrap();

        assert!(!created);
        assert_eq!(second.id, first.id);
        // Identity fields are never rewritten
        assert_eq!(second.github_id, 42);
    }

    #[tokio::test]
    async fn test_upsert_preserves_points() {
        let db = MemoryDb::new();
        let service = service(&db);

        let (user, _) = service
            .upsert_user(profile(42, "a@x.com", "alice", "tok1"))
            .await
            .unwrap();
        db.add_points(&user.id, 30, "2026-01-02T00:00:00Z")
            .await
            .unwrap();

        let (again, _) = service
            .upsert_user(profile(42, "a@x.com", "alice", "tok2"))
            .await
            .unwrap();
        assert_eq!(again.total_points, 30);
    }

    #[tokio::test]
    async fn test_concurrent_first_logins_create_one_user() {
        let db = MemoryDb::new();
        let service = service(&db);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .upsert_user(profile(42, "a@x.com", "alice", &format!("tok{i}")))
                        .await
                })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            let (user, _) = handle.await.unwrap().unwrap();
            ids.push(user.id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected_before_any_request() {
        let db = MemoryDb::new();
        let result = service(&db).handle_oauth_callback("  ", "http://cb").await;
        assert!(matches!(result, Err(AppError::MissingCode)));
    }
}
