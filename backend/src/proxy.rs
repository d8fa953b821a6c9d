use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{
        HeaderMap, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

use crate::{AppState, config::RoutingConfig, models::ApiError};

/// Server side of the same-origin directions proxy: holds the API key so it
/// never reaches the browser.
#[derive(Debug, Clone)]
pub struct DirectionsProxy {
    http: reqwest::Client,
    upstream_url: String,
    api_key: Option<String>,
}

impl DirectionsProxy {
    pub fn new(
        http: reqwest::Client,
        upstream_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            upstream_url: upstream_url.into(),
            api_key,
        }
    }

    pub fn from_config(http: reqwest::Client, config: &RoutingConfig) -> Self {
        Self::new(http, config.directions_url(), config.api_key.clone())
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn forward(&self, headers: &HeaderMap, body: Bytes) -> Result<Response, ProxyFailure> {
        let key = self.api_key.as_deref().ok_or(ProxyFailure::NoKey)?;

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/json");
        let accept = headers
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/json, application/geo+json");

        tracing::debug!("proxying {} bytes to {}", body.len(), self.upstream_url);
        let upstream = self
            .http
            .post(&self.upstream_url)
            .header(AUTHORIZATION, key)
            .header(CONTENT_TYPE, content_type)
            .header(ACCEPT, accept)
            .body(body)
            .send()
            .await
            .map_err(|err| ProxyFailure::Upstream(err.to_string()))?;

        let status = upstream.status();
        let upstream_type = upstream.headers().get(CONTENT_TYPE).cloned();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|err| ProxyFailure::Upstream(err.to_string()))?;

        if !status.is_success() {
            tracing::warn!("directions service answered {} through proxy", status);
        }

        let mut response = (status, bytes).into_response();
        if let Some(value) = upstream_type {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
        Ok(response)
    }
}

enum ProxyFailure {
    NoKey,
    Upstream(String),
}

/// POST /api/directions - Forward a directions request with the server-held key
pub async fn forward_directions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    state
        .proxy
        .forward(&headers, body)
        .await
        .map_err(|failure| {
            let (status, message) = match failure {
                ProxyFailure::NoKey => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Directions API key is not configured on the server".to_string(),
                ),
                ProxyFailure::Upstream(err) => {
                    tracing::warn!("directions proxy upstream failed: {}", err);
                    (
                        StatusCode::BAD_GATEWAY,
                        format!("Directions service unreachable: {err}"),
                    )
                }
            };
            (status, Json(ApiError { message }))
        })
}
