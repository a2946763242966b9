//! Common test utilities and fixtures for integration tests
//!
//! Every test gets its own application over in-memory stores, so tests run
//! without external services and in parallel.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use duet_app::{create_app, Stores};
use duet_common::Config;
use duet_rooms::RoomRouter;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse";

/// Configuration with cheap password hashing and short live-channel timings
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let overrides: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    Config::from_lookup(move |key| {
        if let Some((_, v)) = overrides.iter().find(|(k, _)| k == key) {
            return Some(v.clone());
        }
        match key {
            "JWT_SECRET" => Some("integration-test-secret-32-bytes-long".to_string()),
            "PASSWORD_MEMORY_KIB" => Some("8192".to_string()),
            "PASSWORD_ITERATIONS" => Some("1".to_string()),
            "HANDSHAKE_TIMEOUT_SECS" => Some("1".to_string()),
            _ => None,
        }
    })
    .expect("test config")
}

/// A registered user with a live access token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub token: String,
}

pub struct TestApp {
    pub router: Router,
    pub rooms: Arc<RoomRouter>,
    pub config: Config,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let app = create_app(&config, Stores::in_memory()).expect("app");
        Self {
            router: app.router,
            rooms: app.rooms,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("infallible")
    }

    /// Register then log in a user named `name`
    pub async fn create_user(&self, name: &str) -> TestUser {
        let email = format!("{}_{}@duet.test", name.to_lowercase(), Uuid::new_v4().simple());

        let resp = self
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": email, "name": name, "password": TEST_PASSWORD}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let user = parse_body(resp).await;

        let resp = self
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": email, "password": TEST_PASSWORD}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let login = parse_body(resp).await;

        TestUser {
            id: user["id"].as_str().unwrap().parse().unwrap(),
            email,
            name: name.to_string(),
            token: login["accessToken"].as_str().unwrap().to_string(),
        }
    }

    /// Open (or fetch) the conversation between `a` and `b`, as `a`
    pub async fn open_conversation(&self, a: &TestUser, b: &TestUser) -> Uuid {
        let resp = self
            .send(json_request(
                Method::POST,
                "/api/conversations",
                Some(&a.token),
                json!({"participantIds": [a.id, b.id]}),
            ))
            .await;
        assert!(resp.status().is_success(), "status {}", resp.status());
        let body = parse_body(resp).await;
        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn send_message(&self, user: &TestUser, conversation_id: Uuid, content: &str) -> Value {
        let resp = self
            .send(json_request(
                Method::POST,
                "/api/messages",
                Some(&user.token),
                json!({"conversationId": conversation_id, "content": content}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        parse_body(resp).await
    }

    /// Serve the router on an ephemeral port
    pub async fn serve(&self) -> Result<SocketAddr> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(addr)
    }
}

/// Helper: build a request with an optional bearer token and JSON body
pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

/// Helper: build a body-less request with an optional bearer token
pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Helper: parse response body as JSON Value
pub async fn parse_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Assert the error envelope carries `code`
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let body = parse_body(response).await;
    assert_eq!(body["error"]["code"], code, "body: {}", body);
}
