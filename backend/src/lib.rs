pub mod ai_client;
pub mod assembler;
pub mod batch;
pub mod config;
pub mod elevation;
pub mod error;
pub mod format;
pub mod geometry;
pub mod gpx_export;
pub mod models;
pub mod proxy;
pub mod routing_client;
pub mod store;
pub mod walks_handlers;

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::ai_client::{GeminiModel, SuggestionClient};
use crate::batch::BatchPolicy;
use crate::config::Config;
use crate::models::ApiError;
use crate::proxy::DirectionsProxy;
use crate::routing_client::RoutingClient;
use crate::store::WalkStore;

pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Everything a request handler needs, owned by whoever starts the server.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<RoutingClient>,
    pub suggester: Arc<SuggestionClient<GeminiModel>>,
    pub proxy: Arc<DirectionsProxy>,
    pub store: Arc<Mutex<WalkStore>>,
    pub batch_policy: BatchPolicy,
    route_work: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        router: RoutingClient,
        suggester: SuggestionClient<GeminiModel>,
        proxy: DirectionsProxy,
        store: WalkStore,
    ) -> Self {
        Self {
            router: Arc::new(router),
            suggester: Arc::new(suggester),
            proxy: Arc::new(proxy),
            store: Arc::new(Mutex::new(store)),
            batch_policy: BatchPolicy::default(),
            route_work: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wire every client from `config` over one shared HTTP connection pool.
    pub fn from_config(config: &Config, store: WalkStore) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        Ok(Self::new(
            RoutingClient::from_config(http.clone(), &config.routing),
            SuggestionClient::new(GeminiModel::new(http.clone(), config.language_model.clone())),
            DirectionsProxy::from_config(http, &config.routing),
            store,
        ))
    }

    pub fn with_batch_policy(mut self, policy: BatchPolicy) -> Self {
        self.batch_policy = policy;
        self
    }

    /// Claim the single slot for route-producing work (assemble, suggest,
    /// re-route). Released when the returned guard drops.
    pub fn begin_route_work(&self) -> ApiResult<RouteWorkGuard> {
        self.route_work
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RouteWorkGuard(Arc::clone(&self.route_work)))
            .map_err(|_| {
                tracing::debug!("rejecting overlapping route request");
                api_error(
                    StatusCode::CONFLICT,
                    "Another route is already being generated",
                )
            })
    }
}

pub struct RouteWorkGuard(Arc<AtomicBool>);

impl Drop for RouteWorkGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/directions", post(proxy::forward_directions))
        .route(
            "/api/walks",
            get(walks_handlers::list_walks)
                .post(walks_handlers::add_walk)
                .put(walks_handlers::replace_walks),
        )
        .route("/api/walks/assemble", post(walks_handlers::assemble_walk))
        .route("/api/walks/suggest", post(walks_handlers::suggest_walk))
        .route("/api/walks/reroute", post(walks_handlers::reroute_walks))
        .route("/api/walks/:name", get(walks_handlers::get_walk))
        .route("/api/walks/:name/gpx", get(walks_handlers::export_gpx))
        .route(
            "/api/walks/:name/elevation",
            get(walks_handlers::elevation_profile),
        )
        .layer(cors)
        .with_state(state)
}

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        status,
        Json(ApiError {
            message: message.into(),
        }),
    )
}
