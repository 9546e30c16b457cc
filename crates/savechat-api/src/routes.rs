use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use http::{header, HeaderValue, Method, StatusCode};
use savechat_core::DatabaseService;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{ClientRateLimiter, RateLimitMetricsSnapshot};
use crate::{backup, collections, conversations, settings, snippets};

/// Browser extension pages are always allowed to call the API.
const EXTENSION_ORIGIN_PREFIX: &str = "chrome-extension://";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseService,
    authenticator: Arc<Authenticator>,
    rate_limiter: Arc<ClientRateLimiter>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: DatabaseService) -> Self {
        Self {
            authenticator: Arc::new(Authenticator::new(&config.auth)),
            rate_limiter: Arc::new(ClientRateLimiter::from_config(config.as_ref())),
            config,
            db,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .nest("/conversations", conversations::router())
        .nest("/snippets", snippets::router())
        .nest("/collections", collections::router())
        .nest("/settings", settings::router())
        .nest("/backup", backup::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .route("/health", get(health))
        .merge(protected_routes);

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(state.clone(), limit_by_client))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(configured: &[String]) -> CorsLayer {
    let configured = configured.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|origin| {
                origin.starts_with(EXTENSION_ORIGIN_PREFIX)
                    || configured.iter().any(|allowed| allowed == origin)
            })
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct UnhealthyResponse {
    status: &'static str,
    error: &'static str,
}

async fn health(State(state): State<AppState>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "healthy",
            timestamp: Utc::now().timestamp(),
            rate_limit: state.rate_limiter.metrics_snapshot(),
        })
        .into_response(),
        Err(error) => {
            tracing::error!(error = %error, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy",
                    error: "Database connection failed",
                }),
            )
                .into_response()
        }
    }
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caller = state.authenticator.authenticate(request.headers())?;
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

async fn limit_by_client(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string());
    state.rate_limiter.check(&client).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
pub mod test_support {
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::AuthMode;

    pub const API_KEY: &str = "test-key";

    pub fn test_config() -> AppConfig {
        AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            db_path: ":memory:".into(),
            auth: AuthMode::ApiKey {
                key: API_KEY.to_string(),
            },
            cors_origins: vec!["https://app.example".to_string()],
            rate_limit_max: 1_000,
            rate_limit_window: Duration::from_secs(60),
            store_timeout: Duration::from_secs(5),
        }
    }

    pub async fn test_app_with(config: AppConfig) -> (Router, AppState) {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let state = AppState::new(Arc::new(config), db);
        (app_router(state.clone()), state)
    }

    pub async fn test_app() -> (Router, AppState) {
        test_app_with(test_config()).await
    }

    /// Send an authorized request with an optional JSON body.
    pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
