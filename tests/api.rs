use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::connect_info::MockConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceExt;
use warden::{
    admission::{RateLimitConfig, RateLimiter},
    api::{self, AppState, ServerConfig},
    token::{JwtMaker, TokenMaker},
    user::{InMemoryUserRepository, UserManager},
};

const SECRET: &str = "0123456789abcdef0123456789abcdef";

fn app_with_limit(limit: usize) -> Result<Router> {
    let tokens: Arc<dyn TokenMaker> =
        Arc::new(JwtMaker::new(&SecretString::from(SECRET.to_string()))?);
    let users = UserManager::new(Arc::new(InMemoryUserRepository::new()), tokens.clone());

    let state = AppState {
        users: Arc::new(users),
        tokens,
        limiter: RateLimiter::new(RateLimitConfig {
            limit,
            window: Duration::from_secs(60),
        }),
    };

    Ok(api::app(&state, &ServerConfig::default())?
        .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 40000)))))
}

fn app() -> Result<Router> {
    app_with_limit(100)
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<Reply> {
    let mut request = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok(Reply {
        status,
        headers,
        body,
    })
}

async fn register(app: &Router, username: &str, email: &str) -> Result<Reply> {
    send(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({"username": username, "email": email, "password": "password123"})),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> Result<Reply> {
    send(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await
}

async fn token_for(app: &Router, email: &str) -> Result<String> {
    let reply = login(app, email, "password123").await?;
    assert_eq!(reply.status, StatusCode::OK);
    Ok(reply.body["token"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn register_login_and_manage_user() -> Result<()> {
    let app = app()?;

    let created = register(&app, "johndoe", "user@example.com").await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["username"], "johndoe");
    assert_eq!(created.body["email"], "user@example.com");
    assert!(created.body.get("password_hash").is_none());
    let id = created.body["id"].as_i64().unwrap_or_default();
    assert!(id > 0);

    let logged_in = login(&app, "user@example.com", "password123").await?;
    assert_eq!(logged_in.status, StatusCode::OK);
    assert_eq!(logged_in.body["user"]["id"], id);
    assert!(logged_in.body["expires_at"].is_string());
    let token = logged_in.body["token"].as_str().unwrap_or_default().to_string();
    assert!(!token.is_empty());

    let fetched = send(&app, Method::GET, &format!("/api/v1/users/{id}"), Some(&token), None).await?;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["username"], "johndoe");

    for uri in ["/api/v1/users", "/api/v1/users/"] {
        let listed = send(&app, Method::GET, uri, Some(&token), None).await?;
        assert_eq!(listed.status, StatusCode::OK, "{uri}");
        assert_eq!(listed.body.as_array().map(Vec::len), Some(1));
    }

    let updated = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{id}"),
        Some(&token),
        Some(json!({"username": "janedoe"})),
    )
    .await?;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["username"], "janedoe");
    assert_eq!(updated.body["email"], "user@example.com");

    let deleted = send(&app, Method::DELETE, &format!("/api/v1/users/{id}"), Some(&token), None).await?;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(deleted.body, Value::Null);

    // the token outlives the account
    let gone = send(&app, Method::GET, &format!("/api/v1/users/{id}"), Some(&token), None).await?;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["code"], 404);

    let deleted_again = send(&app, Method::DELETE, &format!("/api/v1/users/{id}"), Some(&token), None).await?;
    assert_eq!(deleted_again.status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn duplicate_email_conflicts() -> Result<()> {
    let app = app()?;

    assert_eq!(register(&app, "alice", "alice@example.com").await?.status, StatusCode::CREATED);

    let again = register(&app, "alice2", "Alice@Example.com").await?;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["code"], 409);
    assert_eq!(again.body["message"], "email already exists");

    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> Result<()> {
    let app = app()?;

    let reply = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({"username": "jo", "email": "not-an-email", "password": "short"})),
    )
    .await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = reply.body["details"]
        .as_array()
        .map(|details| details.iter().filter_map(|d| d["field"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(fields, ["username", "email", "password"]);

    let unknown_field = send(
        &app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "username": "johndoe",
            "email": "user@example.com",
            "password": "password123",
            "admin": true
        })),
    )
    .await?;
    assert_eq!(unknown_field.status, StatusCode::BAD_REQUEST);

    let no_body = send(&app, Method::POST, "/api/v1/auth/register", None, None).await?;
    assert_eq!(no_body.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_body.body["code"], 400);

    Ok(())
}

#[tokio::test]
async fn login_failures_look_alike() -> Result<()> {
    let app = app()?;
    register(&app, "johndoe", "user@example.com").await?;

    let wrong_password = login(&app, "user@example.com", "wrongpassword").await?;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);

    let unknown_email = login(&app, "nobody@example.com", "password123").await?;
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.body["message"], wrong_password.body["message"]);

    let empty_password = login(&app, "user@example.com", "").await?;
    assert_eq!(empty_password.status, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn users_routes_require_bearer_token() -> Result<()> {
    let app = app()?;

    let missing = send(&app, Method::GET, "/api/v1/users", None, None).await?;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "authorization header is not provided");

    let basic = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/1")
                .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(basic.status(), StatusCode::UNAUTHORIZED);

    let forged = send(&app, Method::GET, "/api/v1/users", Some("not.a.jwt"), None).await?;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.body["message"], "invalid token");

    Ok(())
}

#[tokio::test]
async fn bad_ids_pagination_and_patches_are_rejected() -> Result<()> {
    let app = app()?;
    let created = register(&app, "johndoe", "user@example.com").await?;
    register(&app, "janedoe", "jane@example.com").await?;
    let id = created.body["id"].as_i64().unwrap_or_default();
    let token = token_for(&app, "user@example.com").await?;

    for uri in ["/api/v1/users/abc", "/api/v1/users/-1", "/api/v1/users/0"] {
        let reply = send(&app, Method::GET, uri, Some(&token), None).await?;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
    }

    for query in ["limit=0", "limit=101", "limit=x", "offset=-1"] {
        let reply = send(&app, Method::GET, &format!("/api/v1/users?{query}"), Some(&token), None).await?;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{query}");
    }

    let page = send(&app, Method::GET, "/api/v1/users?limit=1&offset=1", Some(&token), None).await?;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body[0]["username"], "janedoe");

    let empty_patch = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{id}"),
        Some(&token),
        Some(json!({})),
    )
    .await?;
    assert_eq!(empty_patch.status, StatusCode::BAD_REQUEST);

    let taken_email = send(
        &app,
        Method::PUT,
        &format!("/api/v1/users/{id}"),
        Some(&token),
        Some(json!({"email": "jane@example.com"})),
    )
    .await?;
    assert_eq!(taken_email.status, StatusCode::CONFLICT);

    let missing = send(
        &app,
        Method::PUT,
        "/api/v1/users/999",
        Some(&token),
        Some(json!({"username": "ghost"})),
    )
    .await?;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn malformed_query_uses_error_body() -> Result<()> {
    let app = app()?;
    register(&app, "johndoe", "user@example.com").await?;
    let token = token_for(&app, "user@example.com").await?;

    let reply = send(&app, Method::GET, "/api/v1/users?limit=1&limit=2", Some(&token), None).await?;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], 400);
    assert!(
        reply.body["message"]
            .as_str()
            .is_some_and(|message| message.starts_with("invalid query string"))
    );

    Ok(())
}

#[tokio::test]
async fn api_is_rate_limited_but_health_is_not() -> Result<()> {
    let app = app_with_limit(3)?;

    for _ in 0..3 {
        let reply = login(&app, "nobody@example.com", "password123").await?;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    let limited = login(&app, "nobody@example.com", "password123").await?;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["code"], 429);
    assert_eq!(
        limited
            .headers
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
        Some("60")
    );

    let protected = send(&app, Method::GET, "/api/v1/users", None, None).await?;
    assert_eq!(protected.status, StatusCode::TOO_MANY_REQUESTS);

    let health = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(health.status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn health_and_request_ids() -> Result<()> {
    let app = app()?;

    let health = send(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");
    assert_eq!(health.body["name"], "warden");
    assert!(health.headers.contains_key("x-app"));
    assert!(health.headers.contains_key("x-request-id"));
    assert_eq!(
        health
            .headers
            .get(header::SERVER)
            .and_then(|value| value.to_str().ok()),
        Some(warden::APP_USER_AGENT)
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-123")
    );

    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let app = app()?;

    let doc = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await?;
    assert_eq!(doc.status, StatusCode::OK);
    assert_eq!(doc.body["info"]["title"], "warden");
    assert!(doc.body["paths"]["/api/v1/users/{id}"].is_object());

    Ok(())
}

#[tokio::test]
async fn unknown_route_is_not_found() -> Result<()> {
    let app = app()?;

    let reply = send(&app, Method::GET, "/api/v2/users", None, None).await?;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    Ok(())
}
