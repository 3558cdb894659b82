// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MongoDB store tests. These need a running server and are skipped unless
//! `MONGODB_TEST_URI` is set. Each test uses its own throwaway database.

use chrono::{Duration, Utc};
use songtrackpro::db::Database;
use songtrackpro::error::AppError;
use songtrackpro::models::metrics::MetricsQuery;
use songtrackpro::models::{MetaAdMetric, RefreshTokenRecord, Tier, User};

async fn test_db() -> Option<Database> {
    let Ok(uri) = std::env::var("MONGODB_TEST_URI") else {
        println!("Skipping test because MONGODB_TEST_URI is not set");
        return None;
    };
    let name = format!("songtrackpro_test_{}", uuid::Uuid::new_v4().simple());
    Some(Database::connect(&uri, &name).await.unwrap())
}

fn user(id: &str, email: &str) -> User {
    let now = Utc::now();
    User {
        id: id.to_string(),
        email: email.to_string(),
        name: "Test".to_string(),
        password_hash: "x".to_string(),
        tier: Tier::Free,
        created_at: now,
        updated_at: now,
    }
}

fn meta(date: &str, ad: &str) -> MetaAdMetric {
    MetaAdMetric {
        campaign_id: "c1".to_string(),
        ad_id: ad.to_string(),
        date: date.parse().unwrap(),
        impressions: 10,
        clicks: 1,
        spend: 2.5,
        reach: Some(7),
        conversions: None,
    }
}

#[tokio::test]
async fn test_email_unique_case_insensitive() {
    let Some(db) = test_db().await else { return };

    db.insert_user(&user("u1", "Artist@Example.com")).await.unwrap();
    let err = db
        .insert_user(&user("u2", "artist@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let found = db.find_user_by_email("ARTIST@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, "u1");
    assert_eq!(found.email, "artist@example.com");
}

#[tokio::test]
async fn test_snapshots_unique_and_ordered() {
    let Some(db) = test_db().await else { return };

    for day in ["2026-04-01", "2026-04-03", "2026-04-02"] {
        db.insert_meta_metric(&meta(day, "a1")).await.unwrap();
    }
    let err = db.insert_meta_metric(&meta("2026-04-02", "a1")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let rows = db
        .query_meta_metrics(&MetricsQuery {
            campaign_id: "c1".to_string(),
            from: Some("2026-04-02".parse().unwrap()),
            to: None,
        })
        .await
        .unwrap();
    let days: Vec<String> = rows.iter().map(|m| m.date.to_string()).collect();
    assert_eq!(days, ["2026-04-03", "2026-04-02"]);
    assert_eq!(rows[0], meta("2026-04-03", "a1"));
}

#[tokio::test]
async fn test_refresh_token_revoked_once() {
    let Some(db) = test_db().await else { return };
    let now = Utc::now();

    db.insert_refresh_token(&RefreshTokenRecord {
        token_hash: "h1".to_string(),
        user_id: "u1".to_string(),
        created_at: now,
        expires_at: now + Duration::days(7),
        revoked_at: None,
        replaced_by: None,
    })
    .await
    .unwrap();

    let first = db
        .revoke_refresh_token("h1", now, Some("h2".to_string()))
        .await
        .unwrap();
    assert!(first.is_some_and(|r| r.revoked_at.is_none()));
    assert!(db.revoke_refresh_token("h1", now, None).await.unwrap().is_none());

    let stored = db.get_refresh_token("h1").await.unwrap().unwrap();
    assert!(stored.revoked_at.is_some());
    assert_eq!(stored.replaced_by.as_deref(), Some("h2"));
}
