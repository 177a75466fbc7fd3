//! Test helpers: build the router against a mockito origin and temp-dir local storage.
//!
//! Run from workspace root: `cargo test -p mirror-api`.

#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use mirror_api::setup::{build_state, routes};
use mirror_core::{Clock, Config, ManualClock, MirrorServiceConfig};
use mockito::{Server, ServerGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

pub const ORIGIN_API_KEY: &str = "origin-key";
pub const FILES_BASE_URL: &str = "http://localhost/files";

/// Test application: server, fake origin and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub origin: ServerGuard,
    pub clock: Arc<ManualClock>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Register a student record on the fake origin.
    pub async fn serve_record(&mut self, id: &str, body: serde_json::Value) -> mockito::Mock {
        self.origin
            .mock("GET", format!("/api/students/{}", id).as_str())
            .match_header("x-api-key", ORIGIN_API_KEY)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Register an attachment on the fake origin.
    pub async fn serve_file(&mut self, path: &str, content_type: &str, body: &[u8]) -> mockito::Mock {
        self.origin
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", content_type)
            .with_body(body)
            .create_async()
            .await
    }
}

/// Split a local temporary URL into route path, `expires` and `signature`.
pub fn signed_path(url: &str) -> (String, String, String) {
    let rest = url
        .strip_prefix("http://localhost")
        .expect("temporary URL points at the test file route");
    let (path, query) = rest.split_once('?').expect("temporary URL has a query");
    let params: HashMap<&str, &str> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    (
        path.to_string(),
        params["expires"].to_string(),
        params["signature"].to_string(),
    )
}

/// App with the fake origin configured as the default origin.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(true).await
}

/// App optionally without any configured origin (requests must supply overrides).
pub async fn setup_test_app_with(configure_origin: bool) -> TestApp {
    let origin = Server::new_async().await;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert(
        "LOCAL_STORAGE_PATH".to_string(),
        temp_dir.path().display().to_string(),
    );
    vars.insert("LOCAL_STORAGE_BASE_URL".to_string(), FILES_BASE_URL.to_string());
    vars.insert(
        "LOCAL_STORAGE_SIGNING_SECRET".to_string(),
        "test-signing-secret".to_string(),
    );
    if configure_origin {
        vars.insert("ORIGIN_BASE_URL".to_string(), origin.url());
        vars.insert("ORIGIN_API_KEY".to_string(), ORIGIN_API_KEY.to_string());
    }

    let config = Config(Box::new(
        MirrorServiceConfig::from_vars(&vars).expect("Failed to build test config"),
    ));

    // Start well after the epoch so signed URLs carry realistic expiries.
    let clock = Arc::new(ManualClock::new(
        DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000),
    ));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let state = build_state(config, dyn_clock)
        .await
        .expect("Failed to build app state");
    let app = routes::setup_routes(state);
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        origin,
        clock,
        _temp_dir: temp_dir,
    }
}
