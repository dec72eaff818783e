use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, routing::get, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use orghub_api_rust::database::manager::DatabaseManager;
use orghub_api_rust::database::store::PgStore;
use orghub_api_rust::engine::{NullAuditSink, RoleTransitionEngine};
use orghub_api_rust::handlers::users;
use orghub_api_rust::middleware::jwt_auth_middleware;
use orghub_api_rust::{config, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting OrgHub API in {:?} mode", config.environment);

    let pool = DatabaseManager::main_pool()
        .await
        .expect("database connection");
    let store = PgStore::new(pool);
    let engine = if config.security.enable_audit_logging {
        Arc::new(RoleTransitionEngine::new(store))
    } else {
        Arc::new(RoleTransitionEngine::with_audit_sink(
            store,
            Arc::new(NullAuditSink),
        ))
    };
    let state = AppState { engine };

    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("OrgHub API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/health", get(health))
        // Protected API
        .merge(user_routes(state))
        // Global middleware
        .layer(cors_layer(&config::config().security))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(security: &config::SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        // No cross-origin access: the layer stays inert with an empty origin set.
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/users", get(users::user_list))
        .route(
            "/api/users/:id",
            get(users::user_get).put(users::user_update),
        )
        .layer(middleware::from_fn(jwt_auth_middleware))
        .with_state(state)
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "SERVICE_UNAVAILABLE",
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
