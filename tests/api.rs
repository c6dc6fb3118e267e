//! End-to-end tests for the tripstore HTTP API.
//!
//! The suite drives the public `tripstore::api::router` through
//! `tower::ServiceExt::oneshot`:
//! 1. Against the in-memory store, always.
//! 2. Against PostgreSQL when `TRIPSTORE_TEST_DSN` points at a disposable
//!    database; skipped otherwise.

use anyhow::{bail, Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use base64ct::{Base64, Encoding};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tripstore::{
    api::{
        self,
        handlers::auth::{AuthGate, PasswordHasher},
    },
    store::{CredentialStore, MemoryStore, PgStore, RecordStore},
};
use uuid::Uuid;

fn app<S>(store: Arc<S>) -> Result<Router>
where
    S: CredentialStore + RecordStore + 'static,
{
    let hasher = PasswordHasher::new(4)?;
    let gate = Arc::new(AuthGate::new(store.clone(), hasher));
    Ok(api::router(gate, store))
}

fn basic(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        Base64::encode_string(format!("{username}:{password}").as_bytes())
    )
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(app.clone().oneshot(request).await?)
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn register(app: &Router, username: &str, password: &str) -> Result<StatusCode> {
    let response = send(
        app,
        "POST",
        "/user/",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await?;
    Ok(response.status())
}

async fn trip_lifecycle(app: &Router, alice: &str, bob: &str) -> Result<()> {
    assert_eq!(register(app, alice, "pw1").await?, StatusCode::OK);
    assert_eq!(register(app, bob, "pw2").await?, StatusCode::OK);
    assert_eq!(register(app, alice, "again").await?, StatusCode::BAD_REQUEST);

    let alice_auth = basic(alice, "pw1");
    let bob_auth = basic(bob, "pw2");

    let created = send(
        app,
        "POST",
        "/trip/",
        Some(&alice_auth),
        Some(json!({"name": "Paris", "owner": bob, "nights": 3})),
    )
    .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let trip = json_body(created).await?;
    assert_eq!(trip["name"], "Paris");
    assert_eq!(trip["owner"], alice);
    assert_eq!(trip["nights"], 3);
    let id = trip["id"]
        .as_str()
        .context("created trip has no id")?
        .to_string();
    let uri = format!("/trip/{id}");

    let foreign = send(app, "GET", &uri, Some(&bob_auth), None).await?;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    let unknown = send(
        app,
        "GET",
        &format!("/trip/{}", Uuid::now_v7()),
        Some(&bob_auth),
        None,
    )
    .await?;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let bobs_list = json_body(send(app, "GET", "/trip/", Some(&bob_auth), None).await?).await?;
    assert_eq!(bobs_list, json!([]));

    let updated = send(
        app,
        "PUT",
        &uri,
        Some(&alice_auth),
        Some(json!({"name": "Lyon"})),
    )
    .await?;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(
        json_body(updated).await?,
        json!({"id": id, "owner": alice, "name": "Lyon"})
    );

    let foreign_update = send(
        app,
        "PUT",
        &uri,
        Some(&bob_auth),
        Some(json!({"name": "Nope"})),
    )
    .await?;
    assert_eq!(foreign_update.status(), StatusCode::NOT_FOUND);

    let alices_list =
        json_body(send(app, "GET", "/trip/", Some(&alice_auth), None).await?).await?;
    assert_eq!(alices_list, json!([{"id": id, "owner": alice, "name": "Lyon"}]));

    for _ in 0..2 {
        let deleted = send(app, "DELETE", &uri, Some(&alice_auth), None).await?;
        assert_eq!(deleted.status(), StatusCode::OK);
        assert_eq!(json_body(deleted).await?, json!({"id": id}));
    }

    let gone = send(app, "GET", &uri, Some(&alice_auth), None).await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let unauthenticated = send(app, "GET", "/trip/", None, None).await?;
    assert_eq!(unauthenticated.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(unauthenticated).await?,
        json!({"error": "Basic Auth Required."})
    );

    Ok(())
}

#[tokio::test]
async fn trip_lifecycle_in_memory() -> Result<()> {
    let app = app(Arc::new(MemoryStore::new()))?;
    trip_lifecycle(&app, "alice", "bob").await
}

#[tokio::test]
async fn concurrent_registration_creates_one_user() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let app = app(store.clone())?;

    let mut tasks = Vec::new();
    for attempt in 0..6 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            register(&app, "carol", &format!("pw{attempt}")).await
        }));
    }

    let mut created = 0;
    for task in tasks {
        match task.await?? {
            StatusCode::OK => created += 1,
            StatusCode::BAD_REQUEST => {}
            other => bail!("unexpected registration status {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(store.user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn trip_lifecycle_postgres() -> Result<()> {
    let Ok(dsn) = std::env::var("TRIPSTORE_TEST_DSN") else {
        eprintln!("TRIPSTORE_TEST_DSN not set, skipping");
        return Ok(());
    };

    let store = Arc::new(PgStore::connect(&dsn, 2).await?);
    assert!(store.ping().await.is_ok());
    let app = app(store)?;

    // Unique names so reruns against the same database do not collide.
    let suffix = Uuid::now_v7().simple().to_string();
    trip_lifecycle(&app, &format!("alice-{suffix}"), &format!("bob-{suffix}")).await
}
