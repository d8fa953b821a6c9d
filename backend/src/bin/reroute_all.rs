use std::{path::PathBuf, sync::Mutex, time::Duration};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkbook::{
    batch::{BatchPolicy, reroute_all},
    config::Config,
    routing_client::RoutingClient,
    store::WalkStore,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Re-route every stored walk through the directions service"
)]
struct Args {
    /// Walk store snapshot to update (defaults to WALKS_STORE_PATH)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Directions API key (defaults to ORS_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Pause after a successful call, in milliseconds
    #[arg(long, default_value_t = 1500)]
    success_delay_ms: u64,

    /// Pause after a failed call, in milliseconds
    #[arg(long, default_value_t = 4000)]
    failure_delay_ms: u64,
}

impl Args {
    fn policy(&self) -> BatchPolicy {
        BatchPolicy {
            success_delay: Duration::from_millis(self.success_delay_ms),
            failure_delay: Duration::from_millis(self.failure_delay_ms),
        }
    }
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
    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }
    if let Some(key) = &args.api_key {
        config.routing.api_key = Some(key.clone());
    }

    let router = RoutingClient::from_config(config.http_client()?, &config.routing);
    if !router.has_transport() {
        return Err("no directions API key or proxy configured".into());
    }

    let store = Mutex::new(WalkStore::from_config(&config)?);
    let report = reroute_all(&router, &store, args.policy()).await?;

    for line in &report.log {
        println!("{line}");
    }
    println!(
        "{} of {} walks updated, {} failed",
        report.updated,
        report.total,
        report.failures.len()
    );
    Ok(())
}
