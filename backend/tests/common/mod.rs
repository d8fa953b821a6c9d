#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use walkbook::{
    AppState,
    ai_client::{GeminiModel, SuggestionClient},
    batch::BatchPolicy,
    config::{LanguageModelConfig, RoutingConfig},
    proxy::DirectionsProxy,
    routing_client::RoutingClient,
    store::{BUNDLED_WALKS, WalkStore},
};

/// Nothing listens on the discard port, so connections are refused at once.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn routing_config(base_url: &str, api_key: Option<&str>, proxy_url: Option<&str>) -> RoutingConfig {
    RoutingConfig {
        base_url: base_url.to_string(),
        profile: "foot-hiking".into(),
        preference: "recommended".into(),
        api_key: api_key.map(str::to_string),
        proxy_url: proxy_url.map(str::to_string),
    }
}

pub fn language_model_config(base_url: &str, api_key: Option<&str>) -> LanguageModelConfig {
    LanguageModelConfig {
        base_url: base_url.to_string(),
        model: "test-model".into(),
        api_key: api_key.map(str::to_string),
    }
}

/// App state over a seeded temporary store; keep the returned dir alive.
pub fn test_state(
    routing: &RoutingConfig,
    language_model: LanguageModelConfig,
) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = WalkStore::load(dir.path().join("walks_store.json"), BUNDLED_WALKS).unwrap();
    let http = reqwest::Client::new();

    let state = AppState::new(
        RoutingClient::from_config(http.clone(), routing),
        SuggestionClient::new(GeminiModel::new(http.clone(), language_model)),
        DirectionsProxy::from_config(http, routing),
        store,
    )
    .with_batch_policy(BatchPolicy::immediate());
    (state, dir)
}

/// Minimal directions-service answer: a straight three-point path.
pub fn geojson_route(distance_m: f64, duration_s: f64) -> serde_json::Value {
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[-3.0, 54.40], [-3.01, 54.41], [-3.02, 54.42]]
            },
            "properties": {
                "summary": { "distance": distance_m, "duration": duration_s },
                "segments": [{
                    "steps": [
                        { "instruction": "Head north", "name": "Fell road", "distance": 800.0, "duration": 600.0 },
                        { "instruction": "Turn left", "name": "Bridleway", "distance": 900.0, "duration": 700.0 },
                        { "instruction": "Arrive", "name": "-", "distance": 0.0, "duration": 0.0 }
                    ]
                }]
            }
        }]
    })
}
