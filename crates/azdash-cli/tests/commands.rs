//! `azdash` commands against an in-process backend with auth disabled.

use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use azdash_cli::cli::Args;
use azdash_cli::commands;
use clap::Parser;
use serde_json::json;
use tempfile::TempDir;

async fn spawn_backend() -> String {
    let router = Router::new()
        .route(
            "/api/config/azure-ad",
            get(|| async { Json(json!({ "enabled": false })) }),
        )
        .route(
            "/api/v1/users",
            get(|headers: HeaderMap| async move {
                // Echo the APIM header back as the role so tests can see it
                let apim = headers
                    .get("x-apim-base-url")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("missing")
                    .to_string();
                Json(json!([
                    {"id": 7, "username": "bob", "email": "bob@example.com", "role": apim}
                ]))
            }),
        )
        .route(
            "/api/v1/audit",
            get(|| async {
                Json(json!([{
                    "timestamp": "not-a-date",
                    "method": "DELETE",
                    "path": "/v1/users/7",
                    "user": "alice",
                    "status": 204
                }]))
            }),
        )
        .route(
            "/actuator/health",
            get(|| async { Json(json!({ "status": "UP" })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api")
}

/// A config file whose storage and token cache live in `dir`.
fn write_config(dir: &TempDir, api_root: &str) -> String {
    let path = dir.path().join("config.toml");
    let content = format!(
        "api_root = \"{api_root}\"\nconfig_timeout_secs = 2\ntoken_cache = \"{}\"\nstorage_path = \"{}\"\n",
        dir.path().join("tokens.json").display(),
        dir.path().join("storage.json").display(),
    );
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

async fn run(config: &str, argv: &[&str]) -> azdash_cli::Result<String> {
    let mut full = vec!["azdash", "--config", config];
    full.extend_from_slice(argv);
    commands::run(Args::try_parse_from(full).unwrap()).await
}

#[tokio::test]
async fn test_users_with_apim_override() {
    let api_root = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &api_root);

    let out = run(&config, &["users"]).await.unwrap();
    assert!(out.contains("bob@example.com"));
    assert!(!out.contains("missing"));

    run(&config, &["apim", "set", "https://apim.example.net"])
        .await
        .unwrap();
    let out = run(&config, &["users"]).await.unwrap();
    assert!(out.contains("https://apim.example.net"));
}

#[tokio::test]
async fn test_policy_prints_disabled_sentinel() {
    let api_root = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &api_root);

    let out = run(&config, &["policy"]).await.unwrap();
    let policy: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        policy,
        json!({ "enabled": false, "clientId": "", "authority": "", "apiScope": "" })
    );
}

#[tokio::test]
async fn test_default_command_renders_dashboard() {
    let api_root = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &api_root);

    let out = run(&config, &[]).await.unwrap();
    assert!(out.contains("Backend health: UP"));
    assert!(out.contains("bob"));
    assert!(out.contains("not-a-date"));
    assert!(!out.contains("! "));
}

#[tokio::test]
async fn test_sign_in_when_disabled() {
    let api_root = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &api_root);

    let out = run(&config, &["sign-in"]).await.unwrap();
    assert!(out.contains("disabled"));
}

#[tokio::test]
async fn test_api_root_flag_overrides_config() {
    let api_root = spawn_backend().await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "http://127.0.0.1:9/api");

    let out = run(&config, &["health", "--api-root", &api_root])
        .await
        .unwrap();
    assert_eq!(out, "Backend health: UP\n");
}
