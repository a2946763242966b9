//! Registration, login, refresh and logout

use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use crate::common::{assert_error, json_request, parse_body, TestApp, TEST_PASSWORD};

fn set_cookie(resp: &axum::http::Response<axum::body::Body>) -> String {
    resp.headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie")
        .to_str()
        .unwrap()
        .to_string()
}

/// `refreshToken=<value>` part of a Set-Cookie header
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

mod test_register {
    use super::*;

    #[tokio::test]
    async fn test_register_returns_public_user() {
        let app = TestApp::new();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": "Ada@Example.COM", "name": "Ada", "password": "secret1"}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = parse_body(resp).await;
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["name"], "Ada");
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_rejected() {
        let app = TestApp::new();
        let body = json!({"email": "dup@example.com", "name": "Dup", "password": "secret1"});

        let first = app
            .send(json_request(Method::POST, "/api/auth/register", None, body.clone()))
            .await;
        assert_eq!(first.status(), StatusCode::CREATED);

        // Same address, different case
        let second = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": "DUP@example.com", "name": "Dup", "password": "secret1"}),
            ))
            .await;
        assert_error(second, StatusCode::UNAUTHORIZED, "ALREADY_EXISTS").await;
    }

    #[tokio::test]
    async fn test_register_short_password_is_invalid() {
        let app = TestApp::new();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": "short@example.com", "name": "Short", "password": "12345"}),
            ))
            .await;
        assert_error(resp, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    }

    #[tokio::test]
    async fn test_register_malformed_body_is_invalid() {
        let app = TestApp::new();
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/register",
                None,
                json!({"email": "x@example.com"}),
            ))
            .await;
        assert_error(resp, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
    }
}

mod test_login {
    use super::*;

    #[tokio::test]
    async fn test_login_sets_refresh_cookie() {
        let app = TestApp::new();
        let user = app.create_user("Grace").await;

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": user.email, "password": TEST_PASSWORD}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let cookie = set_cookie(&resp);
        assert!(cookie.starts_with("refreshToken="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/api/auth"));
        assert!(cookie.contains(&format!(
            "Max-Age={}",
            app.config.refresh_token_ttl_secs
        )));
        assert!(!cookie.contains("Secure"));

        let body = parse_body(resp).await;
        assert!(body["accessToken"].as_str().is_some());
        assert_eq!(body["user"]["id"], user.id.to_string());
    }

    #[tokio::test]
    async fn test_login_secure_cookie_when_configured() {
        let app = TestApp::with_config(crate::common::test_config(&[("COOKIE_SECURE", "true")]));
        let user = app.create_user("Secure").await;

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": user.email, "password": TEST_PASSWORD}),
            ))
            .await;
        assert!(set_cookie(&resp).contains("Secure"));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let app = TestApp::new();
        let user = app.create_user("Linus").await;

        let wrong_password = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": user.email, "password": "not-the-password"}),
            ))
            .await;
        let unknown_email = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": "nobody@example.com", "password": TEST_PASSWORD}),
            ))
            .await;

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(parse_body(wrong_password).await, parse_body(unknown_email).await);
    }
}

mod test_refresh {
    use super::*;

    async fn login_cookie(app: &TestApp) -> String {
        let user = app.create_user("Refresh").await;
        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/login",
                None,
                json!({"email": user.email, "password": TEST_PASSWORD}),
            ))
            .await;
        cookie_pair(&set_cookie(&resp))
    }

    #[tokio::test]
    async fn test_refresh_with_cookie_rotates() {
        let app = TestApp::new();
        let cookie = login_cookie(&app).await;

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .header(header::COOKIE, &cookie)
            .body(axum::body::Body::empty())
            .unwrap();
        let resp = app.send(req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let rotated = set_cookie(&resp);
        assert!(rotated.starts_with("refreshToken="));

        let body = parse_body(resp).await;
        let access = body["accessToken"].as_str().unwrap();

        // The new access token works against a protected route
        let resp = app
            .send(crate::common::empty_request(Method::GET, "/api/users", Some(access)))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_with_body_token() {
        let app = TestApp::new();
        let cookie = login_cookie(&app).await;
        let token = cookie.trim_start_matches("refreshToken=");

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/refresh",
                None,
                json!({"refreshToken": token}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let app = TestApp::new();
        let user = app.create_user("Mixup").await;

        let resp = app
            .send(json_request(
                Method::POST,
                "/api/auth/refresh",
                None,
                json!({"refreshToken": user.token}),
            ))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let app = TestApp::new();
        let resp = app
            .send(crate::common::empty_request(Method::POST, "/api/auth/refresh", None))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let app = TestApp::new();
        let cookie = login_cookie(&app).await;
        let refresh = cookie.trim_start_matches("refreshToken=");

        let resp = app
            .send(crate::common::empty_request(Method::GET, "/api/users", Some(refresh)))
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

mod test_logout {
    use super::*;

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let app = TestApp::new();
        let resp = app
            .send(crate::common::empty_request(Method::POST, "/api/auth/logout", None))
            .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let cookie = set_cookie(&resp);
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
