use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkbook::{AppState, config::Config, create_router, store::WalkStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "walkbook=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = WalkStore::from_config(&config)?;
    tracing::info!(
        "walk store at {} holds {} walks",
        store.path().display(),
        store.walks().len()
    );

    if config.routing.api_key.is_none() && config.routing.proxy_url.is_none() {
        tracing::warn!("ORS_API_KEY not set; routes will fall back to straight lines");
    }
    if config.language_model.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set; walk suggestions are disabled");
    }

    let state = AppState::from_config(&config, store)?;
    let app = create_router(state);

    let addr = config.bind_addr;
    tracing::info!("starting walkbook on http://{addr}");
    tracing::info!("API endpoints:");
    tracing::info!("  POST /api/directions - Directions proxy with server-held key");
    tracing::info!("  GET|POST|PUT /api/walks - Walk library");
    tracing::info!("  POST /api/walks/assemble - Route a drawn walk");
    tracing::info!("  POST /api/walks/suggest - Suggest and route a walk");
    tracing::info!("  POST /api/walks/reroute - Re-route the whole library");
    tracing::info!("  GET /api/walks/:name/gpx - GPX export");
    tracing::info!("  GET /api/walks/:name/elevation - Elevation profile");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
