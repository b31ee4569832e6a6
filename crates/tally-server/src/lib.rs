//! Tally Web Server
//!
//! Axum-based REST API for recurring payment detection.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Request body size limit
//! - Security headers (nosniff, frame denial)
//! - Sanitized error responses
//!
//! There is no authentication; bind to localhost or put it behind a proxy
//! that handles it.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tally_core::{AIBackend, AIClient, TallyConfig};

mod handlers;

/// Maximum request body size (10 MB)
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Maximum merchants per normalize request
pub const MAX_MERCHANTS: usize = 10_000;

/// HTTP-level settings
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Origins allowed by CORS; empty means same-origin only
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Read `TALLY_ALLOWED_ORIGINS` (comma-separated)
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("TALLY_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { allowed_origins }
    }
}

/// Shared application state
pub struct AppState {
    pub config: TallyConfig,
    pub ai: Option<AIClient>,
}

/// Create the application router, building the AI client from `config`
pub fn create_router(config: TallyConfig, server: ServerConfig) -> Router {
    let ai = AIClient::from_config(&config.ai);
    match &ai {
        Some(client) => info!(
            "AI backend configured: {} at {} (model: {})",
            client.kind(),
            client.host(),
            client.model()
        ),
        None => info!("ℹ️  AI backend not configured (set OLLAMA_HOST to enable AI detection)"),
    }
    create_router_with_ai(config, server, ai)
}

/// Create the application router with an explicit AI client (for testing)
pub fn create_router_with_ai(
    config: TallyConfig,
    server: ServerConfig,
    ai: Option<AIClient>,
) -> Router {
    let state = Arc::new(AppState { config, ai });

    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/subscriptions/detect",
            post(handlers::detect_subscriptions),
        )
        .route("/merchants/normalize", post(handlers::normalize_merchants));

    // Build CORS layer
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let cors = if server.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = server
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(config: TallyConfig, host: &str, port: u16) -> anyhow::Result<()> {
    check_ai_connection(&config).await;

    let app = create_router(config, ServerConfig::from_env());
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(config: &TallyConfig) {
    let Some(client) = AIClient::from_config(&config.ai) else {
        return;
    };

    if client.health_check().await {
        info!("✅ AI backend connected: {} ({})", client.host(), client.model());
    } else {
        warn!(
            "⚠️  AI backend configured but not responding: {} (detection will fall back to statistics)",
            client.host()
        );
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
