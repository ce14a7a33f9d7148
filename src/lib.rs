pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod websocket;
pub mod ws;

use std::sync::Arc;

use axum::{http::{HeaderValue, Method}, Router};
use chrono::{DateTime, Utc};
use tower_http::{cors::{AllowOrigin, CorsLayer}, trace::TraceLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use docs::ApiDoc;
use ws::{BroadcastHub, Registry, SessionLifecycle};

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
    pub lifecycle: SessionLifecycle,
    pub hub: BroadcastHub,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(Registry::new());
        let lifecycle = SessionLifecycle::new(registry.clone());
        let hub = BroadcastHub::new(lifecycle.clone());
        Self {
            config: Arc::new(config),
            registry,
            lifecycle,
            hub,
            started_at: Utc::now(),
        }
    }
}

/// Build the full application router: relay endpoints, API routes and docs.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(routes::create_ws_routes(state.clone()))
        .nest("/api", routes::create_api_routes(state))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origins) = config.cors_origin_list() else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET])
}
