//! HTTP API for the authentication service.
//!
//! # Modules
//!
//! - [`auth`]: Registration, login, token refresh, logout
//! - [`reset`]: Password reset request, code validation, confirmation
//! - [`users`]: Current user and profile updates (access token required)
//! - [`middleware`]: Access token extraction and request metrics
//! - [`rate_limit`]: Per route class admission control
//! - [`request_id`]: Request correlation
//!
//! # Endpoints Overview
//!
//! ```text
//! GET   /health                                - Health check (public)
//! GET   /metrics                               - Prometheus metrics (public)
//! POST  /api/v1/auth/register                  - Register user        [login limiter]
//! POST  /api/v1/auth/login                     - Login                [login limiter]
//! POST  /api/v1/auth/refresh                   - Rotate token pair    [api limiter]
//! POST  /api/v1/auth/logout                    - Clear session cookies [api limiter]
//! POST  /api/v1/auth/password-reset/request    - Send a reset code    [reset limiter]
//! POST  /api/v1/auth/password-reset/validate   - Check a reset code   [reset limiter]
//! POST  /api/v1/auth/password-reset/confirm    - Set a new password   [reset limiter]
//! GET   /api/v1/users/me                       - Current user         [api limiter, auth]
//! PATCH /api/v1/users/{id}                     - Update own profile   [api limiter, auth]
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod rate_limit;
pub mod request_id;
pub mod reset;
pub mod users;

use crate::config::{RateLimitSettings, ServerConfig};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
};
use keyward::{
    AuthService, PasswordResetFlow, RateLimiter,
    cache::{KeyValueCache, RedisCache},
    db::{Database, UserRepository},
    notify::Notifier,
};
use metrics_exporter_prometheus::PrometheusHandle;
use rate_limit::RouteLimiter;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub reset: Arc<PasswordResetFlow>,
    pub limiters: RateLimiters,
    /// Upper bound on each password reset call
    pub request_deadline: Duration,
    /// Probed by `/health` when the PostgreSQL store is in use
    pub database: Option<Database>,
    /// Probed by `/health` when the Redis cache is in use
    pub redis: Option<RedisCache>,
    /// Rendered on `/metrics`; `None` disables the endpoint
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the core services from their collaborators
    pub fn new(
        config: &ServerConfig,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn KeyValueCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let auth = AuthService::new(
            &config.security.auth_config(),
            users.clone(),
            notifier.clone(),
        );
        let reset = PasswordResetFlow::new(
            users,
            cache,
            notifier,
            auth.hasher().clone(),
            config.reset.reset_config(),
        );

        Self {
            auth: Arc::new(auth),
            reset: Arc::new(reset),
            limiters: RateLimiters::new(&config.rate_limits),
            request_deadline: config.request_deadline,
            database: None,
            redis: None,
            metrics: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_redis(mut self, redis: RedisCache) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// One limiter per route class
#[derive(Clone)]
pub struct RateLimiters {
    pub login: Arc<RateLimiter>,
    pub reset: Arc<RateLimiter>,
    pub api: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            login: Arc::new(RateLimiter::new(settings.login)),
            reset: Arc::new(RateLimiter::new(settings.reset)),
            api: Arc::new(RateLimiter::new(settings.api)),
        }
    }

    /// Start the background sweeper of every limiter
    ///
    /// Each sweeper exits once its limiter is dropped.
    pub fn spawn_sweepers(&self) {
        for limiter in [&self.login, &self.reset, &self.api] {
            limiter.spawn_sweeper();
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use kw_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(from_fn(middleware::track_metrics))
        .layer(from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
///
/// Route layers run outermost-last, so the limiter always runs before
/// token validation.
fn create_v1_router(state: AppState) -> Router<AppState> {
    let login_limiter = RouteLimiter::new("login", state.limiters.login.clone());
    let reset_limiter = RouteLimiter::new("reset", state.limiters.reset.clone());
    let api_limiter = RouteLimiter::new("api", state.limiters.api.clone());

    let credential_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route_layer(from_fn_with_state(
            login_limiter,
            rate_limit::rate_limit_middleware,
        ));

    let reset_routes = Router::new()
        .route("/auth/password-reset/request", post(reset::request_reset))
        .route("/auth/password-reset/validate", post(reset::validate_code))
        .route("/auth/password-reset/confirm", post(reset::confirm_reset))
        .route_layer(from_fn_with_state(
            reset_limiter,
            rate_limit::rate_limit_middleware,
        ));

    let session_routes = Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route_layer(from_fn_with_state(
            api_limiter.clone(),
            rate_limit::rate_limit_middleware,
        ));

    let protected_routes = Router::new()
        .route("/users/me", get(users::current_user))
        .route("/users/{id}", patch(users::update_profile))
        .route_layer(from_fn_with_state(state, middleware::auth_middleware))
        .route_layer(from_fn_with_state(
            api_limiter,
            rate_limit::rate_limit_middleware,
        ));

    Router::new()
        .merge(credential_routes)
        .merge(reset_routes)
        .merge(session_routes)
        .merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if every configured backend answers, or
/// `503 Service Unavailable` otherwise. In-memory backends are always healthy.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.4.0","database":true,"cache":true,"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match &state.database {
        Some(database) => database.health_check().await.is_ok(),
        None => true,
    };

    let cache_healthy = match &state.redis {
        Some(redis) => redis.health_check().await.is_ok(),
        None => true,
    };

    let overall_healthy = db_healthy && cache_healthy;

    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "cache": cache_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
