use crate::{
    APP_USER_AGENT,
    admission::{RateLimiter, limit_by_ip, require_bearer},
    token::TokenMaker,
    user::UserService,
};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE, SERVER},
    },
    middleware,
    routing::{get, post},
};
use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::oneshot};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span, warn};
use ulid::Ulid;
use url::Url;

pub mod error;
pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

use handlers::{auth, health, users};

/// Everything the routes need, shared by clone.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserService>,
    pub tokens: Arc<dyn TokenMaker>,
    pub limiter: RateLimiter,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
    /// Allowed CORS origins; empty means any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(5),
            cors_origins: Vec::new(),
        }
    }
}

/// Build the routes with admission control but without the HTTP envelope.
///
/// `/api/v1` is rate limited per client IP; `/api/v1/users` additionally
/// requires a bearer token. `/health` and the `OpenAPI` document are exempt.
pub fn routes(state: &AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/users", get(users::list_users))
        .route("/api/v1/users/", get(users::list_users))
        .route(
            "/api/v1/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_bearer,
        ));

    let v1 = Router::new()
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .merge(protected)
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            limit_by_ip,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .merge(v1)
        .layer(Extension(state.users.clone()))
}

/// Full application: routes wrapped in request-id, tracing, panic recovery,
/// timeout and CORS layers.
///
/// # Errors
/// Returns error if a configured CORS origin is not a valid URL origin
pub fn app(state: &AppState, config: &ServerConfig) -> Result<Router> {
    let cors = cors_layer(&config.cors_origins)?;

    Ok(routes(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(SetResponseHeaderLayer::if_not_present(
                SERVER,
                HeaderValue::from_static(APP_USER_AGENT),
            ))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(cors),
    ))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(config: ServerConfig, state: AppState) -> Result<()> {
    let app = app(&state, &config)?;

    state.limiter.start_cleanup();

    let listener = TcpListener::bind(format!("::0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    info!("Listening on [::]:{}", config.port);

    let (stopping_tx, stopping_rx) = oneshot::channel::<()>();

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("Gracefully shutdown");
        let _ = stopping_tx.send(());
    })
    .into_future();

    // in-flight requests get `shutdown_timeout` to finish once a signal arrives
    let deadline = async move {
        if stopping_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(config.shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result?,
        () = deadline => warn!(
            "Shutdown timeout of {:?} elapsed, dropping in-flight requests",
            config.shutdown_timeout
        ),
    }

    state.limiter.stop_cleanup();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    if origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }

    let origins = origins
        .iter()
        .map(|origin| cors_origin(origin))
        .collect::<Result<Vec<_>>>()?;

    Ok(cors.allow_origin(AllowOrigin::list(origins)))
}

fn cors_origin(origin: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(origin).with_context(|| format!("Invalid CORS origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("CORS origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build CORS origin header")
}
