// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running, e.g.
//! `gcloud emulators firestore start --host-port=localhost:8081` with
//! `FIRESTORE_EMULATOR_HOST=localhost:8081`.
//!
//! Each test uses unique GitHub IDs and emails so runs don't interfere.

use mergequest::error::AppError;
use mergequest::models::{BadgeName, LoginProfile, User};

mod common;
use common::test_db;

/// Generate a unique GitHub ID for test isolation.
fn unique_github_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
}

fn profile(github_id: u64, name: &str, token: &str) -> LoginProfile {
    LoginProfile {
        github_id,
        email: format!("{github_id}@example.com"),
        name: name.to_string(),
        avatar_url: "https://example.com/a.png".to_string(),
        access_token: token.to_string(),
    }
}

fn test_user(github_id: u64) -> User {
    User::new(profile(github_id, "Test", "tok1"), 0, "2026-01-15T10:00:00Z")
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_new_user_creation() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(unique_github_id());

    assert!(db.get_user(&user.id).await.unwrap().is_none());

    db.create_user(&user).await.unwrap();

    let fetched = db.get_user(&user.id).await.unwrap().expect("user stored");
    assert_eq!(fetched.github_id, user.github_id);
    assert_eq!(fetched.email, user.email);
    assert_eq!(fetched.access_token, "tok1");
    assert_eq!(fetched.total_points, 0);

    let by_github = db.get_user_by_github_id(user.github_id).await.unwrap();
    assert_eq!(by_github.unwrap().id, user.id);
}

#[tokio::test]
async fn test_identity_uniqueness() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(unique_github_id());
    db.create_user(&user).await.unwrap();

    // Same GitHub ID under a fresh email
    let mut same_github = test_user(user.github_id);
    same_github.email = format!("other-{}@example.com", user.github_id);
    assert!(matches!(
        db.create_user(&same_github).await,
        Err(AppError::DuplicateIdentity)
    ));

    // Same email under a fresh GitHub ID
    let mut same_email = test_user(unique_github_id());
    same_email.email = user.email.clone();
    assert!(matches!(
        db.create_user(&same_email).await,
        Err(AppError::DuplicateIdentity)
    ));

    let found = db
        .find_by_identity(unique_github_id(), &user.email)
        .await
        .unwrap();
    assert_eq!(found.unwrap().id, user.id);
}

#[tokio::test]
async fn test_login_refresh_and_points() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(unique_github_id());
    db.create_user(&user).await.unwrap();

    let refreshed = db
        .apply_login(
            &user.id,
            &profile(user.github_id, "Renamed", "tok2"),
            "2026-02-01T00:00:00Z",
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.name, "Renamed");
    assert_eq!(refreshed.access_token, "tok2");
    assert_eq!(refreshed.created_at, user.created_at);

    db.add_points(&user.id, 10, "2026-02-02T00:00:00Z")
        .await
        .unwrap();
    let updated = db
        .add_points(&user.id, 5, "2026-02-03T00:00:00Z")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.total_points, 15);
    assert_eq!(updated.last_synced_at, "2026-02-03T00:00:00Z");

    let synced = db
        .mark_synced(&user.id, "2026-02-04T00:00:00Z")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(synced.last_synced_at, "2026-02-04T00:00:00Z");
    assert_eq!(synced.total_points, 15);

    assert!(db
        .add_points("no-such-user", 1, "2026-02-05T00:00:00Z")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_concurrent_point_increments() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(unique_github_id());
    db.create_user(&user).await.unwrap();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let db = db.clone();
            let id = user.id.clone();
            tokio::spawn(async move { db.add_points(&id, 2, "2026-02-01T00:00:00Z").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let fetched = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(fetched.total_points, 10);
}

// ═══════════════════════════════════════════════════════════════════════════
// BADGE + DELETION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_badges_and_deletion() {
    require_emulator!();

    let db = test_db().await;
    let user = test_user(unique_github_id());
    db.create_user(&user).await.unwrap();

    let now = "2026-03-01T00:00:00Z";
    assert!(db.award_badge(&user.id, BadgeName::MergeArtisian, now).await.unwrap());
    assert!(!db.award_badge(&user.id, BadgeName::MergeArtisian, now).await.unwrap());
    assert!(db.award_badge(&user.id, BadgeName::NewbieCommitter, now).await.unwrap());

    assert_eq!(
        db.badges_for_user(&user.id).await.unwrap(),
        vec![BadgeName::NewbieCommitter, BadgeName::MergeArtisian]
    );

    assert!(db.delete_user(&user.id).await.unwrap());
    assert!(db.get_user(&user.id).await.unwrap().is_none());
    assert!(db.badges_for_user(&user.id).await.unwrap().is_empty());
    assert!(!db.delete_user(&user.id).await.unwrap());

    // Identity claims are released with the user
    db.create_user(&test_user(user.github_id)).await.unwrap();
}

#[tokio::test]
async fn test_leaderboard_order() {
    require_emulator!();

    let db = test_db().await;
    let mut users = Vec::new();
    for points in [5, 500_000_000, 250_000_000] {
        let mut user = test_user(unique_github_id());
        user.total_points = points;
        db.create_user(&user).await.unwrap();
        users.push(user);
    }

    // Other tests share the emulator, so only check the relative order
    let page = db.leaderboard_page(0, 100).await.unwrap();
    let position = |id: &str| page.iter().position(|u| u.id == id);
    let high = position(&users[1].id).expect("top user on first page");
    let mid = position(&users[2].id).expect("second user on first page");
    assert!(high < mid);

    assert!(db.count_users().await.unwrap() >= 3);
}

#[tokio::test]
async fn test_count_users_tracks_creates() {
    require_emulator!();

    let db = test_db().await;
    let before = db.count_users().await.unwrap();

    db.create_user(&test_user(unique_github_id())).await.unwrap();
    db.create_user(&test_user(unique_github_id())).await.unwrap();

    // Other tests may add users concurrently
    assert!(db.count_users().await.unwrap() >= before + 2);
}
