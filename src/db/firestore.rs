// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, keyed by internal ID)
//! - Identity claims (one document per GitHub ID and per email)
//! - Badges (keyed by `{user_id}_{badge}`)
//!
//! Firestore has no unique indexes, so uniqueness of GitHub ID and email is
//! enforced by writing the claim documents with a must-not-exist
//! precondition in the same transaction that creates the user.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Badge, BadgeName, LoginProfile, User};
use firestore::{FirestoreQueryDirection, FirestoreWritePrecondition};
use serde::{Deserialize, Serialize};

/// Maps an identity (GitHub ID or email) to the owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityClaim {
    user_id: String,
}

/// Result row of the users count aggregation.
#[derive(Debug, Deserialize)]
struct UserCount {
    count: u64,
}

fn github_claim_id(github_id: u64) -> String {
    format!("github_{}", github_id)
}

fn email_claim_id(email: &str) -> String {
    // Document IDs may not contain '/'
    format!("email_{}", urlencoding::encode(email))
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Identity Claims ─────────────────────────────────────────

    async fn claimed_user_id(&self, claim_id: &str) -> Result<Option<String>, AppError> {
        let claim: Option<IdentityClaim> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::IDENTITIES)
            .obj()
            .one(claim_id)
            .await
            .map_err(db_err)?;
        Ok(claim.map(|c| c.user_id))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by internal ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(db_err)
    }

    pub async fn get_user_by_github_id(&self, github_id: u64) -> Result<Option<User>, AppError> {
        match self.claimed_user_id(&github_claim_id(github_id)).await? {
            Some(user_id) => self.get_user(&user_id).await,
            None => Ok(None),
        }
    }

    /// Look up a user whose GitHub ID OR email is claimed.
    pub async fn find_by_identity(
        &self,
        github_id: u64,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user_id = match self.claimed_user_id(&github_claim_id(github_id)).await? {
            Some(id) => Some(id),
            None => self.claimed_user_id(&email_claim_id(email)).await?,
        };

        match user_id {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    /// Atomically create the user and both identity claims.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;
        let claim = IdentityClaim {
            user_id: user.id.clone(),
        };

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for claim_id in [github_claim_id(user.github_id), email_claim_id(&user.email)] {
            client
                .fluent()
                .update()
                .in_col(collections::IDENTITIES)
                .precondition(FirestoreWritePrecondition::Exists(false))
                .document_id(&claim_id)
                .object(&claim)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add claim to transaction: {}", e))
                })?;
        }

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            // A failed precondition means another request claimed the identity first.
            if self
                .find_by_identity(user.github_id, &user.email)
                .await?
                .is_some()
            {
                tracing::info!(github_id = user.github_id, "Identity already claimed");
                return Err(AppError::DuplicateIdentity);
            }
            return Err(AppError::Database(format!(
                "Transaction commit failed: {}",
                e
            )));
        }

        tracing::debug!(user_id = %user.id, github_id = user.github_id, "User created");
        Ok(())
    }

    /// Read-modify-write a user inside a transaction.
    ///
    /// The read is bound to the transaction, so Firestore retries the whole
    /// closure on contention instead of losing a concurrent update.
    async fn modify_user<F>(&self, id: &str, f: F) -> Result<Option<User>, AppError>
    where
        F: Fn(&mut User) + Clone + Send + Sync + 'static,
    {
        let client = self.get_client()?;
        let id = id.to_string();

        client
            .run_transaction(|db, transaction| {
                let id = id.clone();
                let f = f.clone();
                Box::pin(async move {
                    let user: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&id)
                        .await?;

                    let Some(mut user) = user else {
                        return Ok(None);
                    };
                    f(&mut user);

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .precondition(FirestoreWritePrecondition::Exists(true))
                        .document_id(&id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Some(user))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("User update failed: {}", e)))
    }

    pub async fn apply_login(
        &self,
        id: &str,
        profile: &LoginProfile,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        let profile = profile.clone();
        let now = now.to_string();
        self.modify_user(id, move |user| user.apply_login(&profile, &now))
            .await
    }

    pub async fn add_points(
        &self,
        id: &str,
        points: i64,
        now: &str,
    ) -> Result<Option<User>, AppError> {
        let now = now.to_string();
        self.modify_user(id, move |user| {
            user.total_points = user.total_points.saturating_add(points);
            user.last_synced_at = now.clone();
            user.updated_at = now.clone();
        })
        .await
    }

    pub async fn mark_synced(&self, id: &str, now: &str) -> Result<Option<User>, AppError> {
        let now = now.to_string();
        self.modify_user(id, move |user| {
            user.last_synced_at = now.clone();
            user.updated_at = now.clone();
        })
        .await
    }

    /// Delete a user, their identity claims, and their badges in one transaction.
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let Some(user) = self.get_user(id).await? else {
            return Ok(false);
        };

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut targets = vec![
            (collections::USERS, user.id.clone()),
            (collections::IDENTITIES, github_claim_id(user.github_id)),
            (collections::IDENTITIES, email_claim_id(&user.email)),
        ];
        targets.extend(
            BadgeName::ALL
                .iter()
                .map(|badge| (collections::BADGES, Badge::doc_id(&user.id, *badge))),
        );

        for (collection, doc_id) in &targets {
            client
                .fluent()
                .delete()
                .from(*collection)
                .document_id(doc_id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        collection, e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit user deletion: {}", e)))?;

        tracing::info!(user_id = %user.id, github_id = user.github_id, "User deleted");
        Ok(true)
    }

    // ─── Leaderboard ─────────────────────────────────────────────

    /// Users ordered by points then creation time, both descending.
    ///
    /// Requires a composite index on (total_points desc, created_at desc).
    pub async fn leaderboard_page(&self, offset: u32, limit: u32) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([
                ("total_points", FirestoreQueryDirection::Descending),
                ("created_at", FirestoreQueryDirection::Descending),
            ])
            .offset(offset)
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    /// Server-side count aggregation over the users collection.
    pub async fn count_users(&self) -> Result<u64, AppError> {
        let counts: Vec<UserCount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        Ok(counts.first().map_or(0, |c| c.count))
    }

    // ─── Badges ──────────────────────────────────────────────────

    pub async fn badges_for_user(&self, user_id: &str) -> Result<Vec<BadgeName>, AppError> {
        let badges: Vec<Badge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BADGES)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(db_err)?;

        let mut names: Vec<BadgeName> = badges.into_iter().map(|b| b.badge).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn award_badge(
        &self,
        user_id: &str,
        badge: BadgeName,
        now: &str,
    ) -> Result<bool, AppError> {
        if self.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let doc_id = Badge::doc_id(user_id, badge);
        let existing: Option<Badge> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BADGES)
            .obj()
            .one(&doc_id)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Ok(false);
        }

        let record = Badge {
            user_id: user_id.to_string(),
            badge,
            awarded_at: now.to_string(),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BADGES)
            .document_id(&doc_id)
            .object(&record)
            .execute()
            .await
            .map_err(db_err)?;

        tracing::info!(user_id, badge = ?badge, "Badge awarded");
        Ok(true)
    }
}
