//! Integration tests for the service's liveness endpoint

use std::net::TcpListener;
use std::sync::Arc;

use auth_service::auth::{AuthCore, SecretHasher, TokenCodec, MIN_COST};
use auth_service::configuration::JwtSettings;
use auth_service::startup::run;
use auth_service::store::InMemoryUserStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let jwt = JwtSettings {
        access_token_secret: "access-secret-key-at-least-32-characters".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "refresh-secret-key-at-least-32-characters".to_string(),
        refresh_token_expiry: 604800,
        issuer: "test".to_string(),
    };
    let auth = AuthCore::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(TokenCodec::new(&jwt)),
        SecretHasher::new(MIN_COST).unwrap(),
    );
    let server = run(listener, auth).expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/auth/unknown", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
