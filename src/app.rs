use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::Settings;
use crate::middleware::request_id_layer;
use crate::routes;
use crate::services::{Notifier, RedisCache, WorkflowConfig};
use crate::store::Store;

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub settings: Settings,
    pub tokens: TokenIssuer,
    pub hasher: PasswordHasher,
    pub notifier: Notifier,
    /// Read cache for public tender lookups; `None` when Redis is not configured
    pub cache: Option<RedisCache>,
    pub workflow: WorkflowConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        settings: Settings,
        hasher: PasswordHasher,
        notifier: Notifier,
        cache: Option<RedisCache>,
    ) -> Arc<Self> {
        let tokens = TokenIssuer::new(
            &settings.jwt_secret,
            settings.jwt_issuer.clone(),
            settings.jwt_ttl_seconds,
        );
        let workflow = settings.workflow();
        Arc::new(Self {
            store,
            settings,
            tokens,
            hasher,
            notifier,
            cache,
            workflow,
        })
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.settings);

    // Build trace layer (use DEBUG for spans to reduce overhead at INFO level)
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-request-id"),
        ]))
        .allow_credentials(true)
        .max_age(max_age)
}
