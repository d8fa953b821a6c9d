use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkbook::{
    ai_client::{GeminiModel, SuggestionClient},
    assembler::RouteAssembler,
    config::Config,
    routing_client::RoutingClient,
    store::WalkStore,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ask the language model for a walk, route it and print it as JSON"
)]
struct Args {
    /// What kind of walk to look for, e.g. "easy lakeside loop near Keswick"
    prompt: String,

    /// Language model to use (defaults to GEMINI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Add the routed walk to the store
    #[arg(long)]
    save: bool,

    /// Walk store snapshot used with --save (defaults to WALKS_STORE_PATH)
    #[arg(long)]
    store: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(model) = &args.model {
        config.language_model.model = model.clone();
    }
    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }

    let http = config.http_client()?;
    let suggester = SuggestionClient::new(GeminiModel::new(
        http.clone(),
        config.language_model.clone(),
    ));
    let router = RoutingClient::from_config(http, &config.routing);

    let draft = suggester.suggest_walk(&args.prompt).await?;
    tracing::info!("suggested '{}'", draft.name);

    let assembled = RouteAssembler::new(&router)
        .with_enricher(&suggester)
        .assemble(draft)
        .await;
    if let Some(warning) = assembled.warning() {
        tracing::warn!("{warning}");
    }

    println!("{}", serde_json::to_string_pretty(&assembled.walk)?);

    if args.save {
        let mut store = WalkStore::from_config(&config)?;
        store.add(assembled.walk)?;
        tracing::info!("saved to {}", store.path().display());
    }
    Ok(())
}
