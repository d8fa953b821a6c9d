use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ORS_BASE_URL: &str = "https://api.openrouteservice.org";
const DEFAULT_ORS_PROFILE: &str = "foot-hiking";
const DEFAULT_ORS_PREFERENCE: &str = "recommended";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_STORE_PATH: &str = "backend/data/walks_store.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub base_url: String,
    pub profile: String,
    pub preference: String,
    /// Server-held key, used by the proxy endpoint and the direct transport.
    pub api_key: Option<String>,
    /// Proxy to try before calling the service directly.
    pub proxy_url: Option<String>,
}

impl RoutingConfig {
    pub fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.base_url.trim_end_matches('/'),
            self.profile
        )
    }
}

#[derive(Debug, Clone)]
pub struct LanguageModelConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub routing: RoutingConfig,
    pub language_model: LanguageModelConfig,
    pub store_path: PathBuf,
    /// Replaces the bundled default library when set.
    pub dataset_path: Option<PathBuf>,
    pub http_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_raw = var_or("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let timeout_raw = var_or("HTTP_TIMEOUT_SECS", &DEFAULT_HTTP_TIMEOUT_SECS.to_string());
        let timeout_secs: u64 = timeout_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "HTTP_TIMEOUT_SECS",
            value: timeout_raw.clone(),
        })?;

        Ok(Self {
            bind_addr,
            routing: RoutingConfig {
                base_url: var_or("ORS_BASE_URL", DEFAULT_ORS_BASE_URL),
                profile: var_or("ORS_PROFILE", DEFAULT_ORS_PROFILE),
                preference: var_or("ORS_PREFERENCE", DEFAULT_ORS_PREFERENCE),
                api_key: non_empty_var("ORS_API_KEY"),
                proxy_url: non_empty_var("ORS_PROXY_URL"),
            },
            language_model: LanguageModelConfig {
                base_url: var_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
                model: var_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_key: non_empty_var("GEMINI_API_KEY"),
            },
            store_path: PathBuf::from(var_or("WALKS_STORE_PATH", DEFAULT_STORE_PATH)),
            dataset_path: non_empty_var("WALKS_DATASET").map(PathBuf::from),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("walkbook/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
