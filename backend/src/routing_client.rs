use std::future::Future;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::{
    config::RoutingConfig,
    error::RoutingError,
    geometry::dedup_consecutive,
    models::{Coordinate, RouteResult, RouteStep},
};

/// Points closer than this are sent to the service only once.
const DUPLICATE_EPSILON_DEG: f64 = 1e-6;

/// Foot-trail directions between ordered points.
///
/// Implementations never retry; the caller decides how to degrade. Only
/// [`DirectionsService::route_multi_waypoint`] must be provided, the other
/// two shapes are expressed through it.
pub trait DirectionsService: Send + Sync {
    /// Route through `points` in order, car park first.
    fn route_multi_waypoint(
        &self,
        points: &[Coordinate],
    ) -> impl Future<Output = Result<RouteResult, RoutingError>> + Send;

    /// `start`, each via-point in order, then `end`.
    fn route_between(
        &self,
        start: Coordinate,
        end: Coordinate,
        via: &[Coordinate],
    ) -> impl Future<Output = Result<RouteResult, RoutingError>> + Send {
        let mut points = Vec::with_capacity(via.len() + 2);
        points.push(start);
        points.extend_from_slice(via);
        points.push(end);
        async move { self.route_multi_waypoint(&points).await }
    }

    /// `start` → `destination` → `start` as one merged path.
    fn route_circular(
        &self,
        start: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<RouteResult, RoutingError>> + Send {
        async move { self.route_between(start, start, &[destination]).await }
    }
}

/// One way of reaching the directions service.
#[derive(Debug, Clone)]
pub enum Transport {
    /// Same-origin proxy holding the key server-side.
    Proxy { url: String },
    /// Straight to the service with a locally held key.
    Direct { url: String, api_key: Option<String> },
}

impl Transport {
    fn label(&self) -> &'static str {
        match self {
            Transport::Proxy { .. } => "proxy",
            Transport::Direct { .. } => "direct",
        }
    }

    async fn send(
        &self,
        http: &reqwest::Client,
        body: &DirectionsRequest,
    ) -> Result<String, RoutingError> {
        let request = match self {
            Transport::Proxy { url } => http.post(url),
            Transport::Direct { url, api_key } => {
                let key = api_key.as_deref().ok_or(RoutingError::NoCredentials)?;
                http.post(url).header(AUTHORIZATION, key)
            }
        };

        let response = request
            .header(ACCEPT, "application/json, application/geo+json")
            .json(body)
            .send()
            .await
            .map_err(|err| RoutingError::Unavailable(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| RoutingError::Unavailable(err.to_string()))?;

        if !status.is_success() {
            return Err(RoutingError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// Transports tried in order; the first success wins.
#[derive(Debug, Clone, Default)]
pub struct TransportChain {
    transports: Vec<Transport>,
}

impl TransportChain {
    pub fn new(transports: Vec<Transport>) -> Self {
        Self { transports }
    }

    /// Proxy first when configured, then the direct call when a key exists.
    pub fn from_config(config: &RoutingConfig) -> Self {
        let mut transports = Vec::new();
        if let Some(url) = &config.proxy_url {
            transports.push(Transport::Proxy { url: url.clone() });
        }
        if config.api_key.is_some() {
            transports.push(Transport::Direct {
                url: config.directions_url(),
                api_key: config.api_key.clone(),
            });
        }
        Self { transports }
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    async fn send(
        &self,
        http: &reqwest::Client,
        body: &DirectionsRequest,
    ) -> Result<String, RoutingError> {
        let mut last_failure = None;

        for transport in &self.transports {
            match transport.send(http, body).await {
                Ok(text) => return Ok(text),
                Err(RoutingError::NoCredentials) => {
                    tracing::debug!("{} transport has no credentials, skipping", transport.label());
                }
                Err(err) => {
                    tracing::warn!("{} transport failed: {}", transport.label(), err);
                    last_failure = Some(err);
                }
            }
        }

        Err(last_failure.unwrap_or(RoutingError::NoCredentials))
    }
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    /// `[lon, lat]` pairs, the service's axis order.
    coordinates: Vec<[f64; 2]>,
    preference: String,
    instructions: bool,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    summary: Summary,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    instruction: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// HTTP client for the foot-trail directions service.
#[derive(Debug, Clone)]
pub struct RoutingClient {
    http: reqwest::Client,
    chain: TransportChain,
    preference: String,
}

impl RoutingClient {
    pub fn new(http: reqwest::Client, chain: TransportChain, preference: impl Into<String>) -> Self {
        Self {
            http,
            chain,
            preference: preference.into(),
        }
    }

    pub fn from_config(http: reqwest::Client, config: &RoutingConfig) -> Self {
        Self::new(http, TransportChain::from_config(config), config.preference.clone())
    }

    pub fn has_transport(&self) -> bool {
        !self.chain.is_empty()
    }
}

impl DirectionsService for RoutingClient {
    async fn route_multi_waypoint(&self, points: &[Coordinate]) -> Result<RouteResult, RoutingError> {
        let distinct = dedup_consecutive(points, DUPLICATE_EPSILON_DEG);
        if distinct.len() < 2 {
            tracing::debug!("degenerate route request ({} distinct points)", distinct.len());
            return Ok(degenerate_route(points));
        }

        let body = DirectionsRequest {
            coordinates: distinct.iter().map(|c| [c.lon, c.lat]).collect(),
            preference: self.preference.clone(),
            instructions: true,
        };
        tracing::debug!("requesting foot route through {} points", body.coordinates.len());

        let text = self.chain.send(&self.http, &body).await?;
        let result = parse_directions_response(&text)?;

        tracing::info!(
            "foot route resolved: {} points, {:.0} m, {:.0} s",
            result.waypoints.len(),
            result.distance_m,
            result.duration_s
        );
        Ok(result)
    }
}

/// Zero-length route: the single point repeated, or nothing for no input.
fn degenerate_route(points: &[Coordinate]) -> RouteResult {
    let waypoints = match points.first() {
        Some(&point) => vec![point, point],
        None => Vec::new(),
    };
    RouteResult {
        waypoints,
        distance_m: 0.0,
        duration_s: 0.0,
        steps: Vec::new(),
    }
}

/// Decode a GeoJSON directions response, swapping `[lon, lat]` to
/// [`Coordinate`].
pub fn parse_directions_response(text: &str) -> Result<RouteResult, RoutingError> {
    let collection: FeatureCollection = serde_json::from_str(text)
        .map_err(|err| RoutingError::InvalidResponse(err.to_string()))?;
    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| RoutingError::InvalidResponse("no route in response".into()))?;

    let waypoints: Vec<Coordinate> = feature
        .geometry
        .coordinates
        .iter()
        .filter(|pair| pair.len() >= 2)
        .map(|pair| Coordinate {
            lat: pair[1],
            lon: pair[0],
        })
        .collect();
    if waypoints.is_empty() {
        return Err(RoutingError::InvalidResponse("route has no geometry".into()));
    }

    let steps = feature
        .properties
        .segments
        .into_iter()
        .flat_map(|segment| segment.steps)
        .map(|step| RouteStep {
            instruction: step.instruction,
            name: step.name,
            distance_m: step.distance,
            duration_s: step.duration,
        })
        .collect();

    Ok(RouteResult {
        waypoints,
        distance_m: feature.properties.summary.distance,
        duration_s: feature.properties.summary.duration,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RESPONSE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": [[-3.0, 54.40], [-3.01, 54.41], [-3.02, 54.42, 310.5]]
            },
            "properties": {
                "summary": {"distance": 2850.4, "duration": 2052.3},
                "segments": [
                    {"steps": [
                        {"instruction": "Head north on Tarn Lane", "name": "Tarn Lane", "distance": 1200.0, "duration": 864.0},
                        {"instruction": "Arrive at your destination", "distance": 0.0, "duration": 0.0}
                    ]}
                ]
            }
        }]
    }"#;

    fn offline_client() -> RoutingClient {
        RoutingClient::new(reqwest::Client::new(), TransportChain::default(), "recommended")
    }

    #[test]
    fn parses_geojson_and_swaps_axis_order() {
        let result = parse_directions_response(SAMPLE_RESPONSE).unwrap();
        assert_eq!(result.waypoints.len(), 3);
        assert_eq!(result.waypoints[0], Coordinate::new(54.40, -3.0));
        assert_eq!(result.waypoints[2], Coordinate::new(54.42, -3.02));
        assert_eq!(result.distance_m, 2850.4);
        assert_eq!(result.duration_s, 2052.3);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].name, "Tarn Lane");
    }

    #[test]
    fn missing_summary_defaults_to_zero() {
        let text = r#"{"features":[{"geometry":{"coordinates":[[-3.0,54.4],[-3.0,54.4]]},"properties":{"summary":{}}}]}"#;
        let result = parse_directions_response(text).unwrap();
        assert_eq!(result.distance_m, 0.0);
        assert!(result.steps.is_empty());
    }

    #[test]
    fn empty_feature_list_is_invalid() {
        let err = parse_directions_response(r#"{"features":[]}"#).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidResponse(_)));
    }

    #[test]
    fn empty_geometry_is_invalid() {
        let text = r#"{"features":[{"geometry":{"coordinates":[]},"properties":{}}]}"#;
        let err = parse_directions_response(text).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidResponse(_)));
    }

    #[test]
    fn request_body_uses_lon_lat_order() {
        let body = DirectionsRequest {
            coordinates: vec![[-3.0, 54.4]],
            preference: "recommended".into(),
            instructions: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["coordinates"][0][0], -3.0);
        assert_eq!(json["coordinates"][0][1], 54.4);
        assert_eq!(json["preference"], "recommended");
    }

    #[tokio::test]
    async fn same_start_and_end_never_fails() {
        let client = offline_client();
        let a = Coordinate::new(54.40, -3.00);

        let between = client.route_between(a, a, &[]).await.unwrap();
        assert_eq!(between.waypoints, vec![a, a]);
        assert_eq!(between.distance_m, 0.0);

        let circular = client.route_circular(a, a).await.unwrap();
        assert!(!circular.waypoints.is_empty());
    }

    #[tokio::test]
    async fn empty_chain_reports_missing_credentials() {
        let client = offline_client();
        let err = client
            .route_between(Coordinate::new(54.40, -3.00), Coordinate::new(54.42, -3.02), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoCredentials));
    }

    #[tokio::test]
    async fn direct_transport_without_key_is_skipped() {
        let chain = TransportChain::new(vec![Transport::Direct {
            url: "http://127.0.0.1:9/unused".into(),
            api_key: None,
        }]);
        let client = RoutingClient::new(reqwest::Client::new(), chain, "recommended");
        let err = client
            .route_multi_waypoint(&[Coordinate::new(54.40, -3.00), Coordinate::new(54.42, -3.02)])
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::NoCredentials));
    }

    #[tokio::test]
    async fn unreachable_proxy_is_unavailable() {
        let chain = TransportChain::new(vec![Transport::Proxy {
            url: "http://127.0.0.1:9/api/directions".into(),
        }]);
        let client = RoutingClient::new(reqwest::Client::new(), chain, "recommended");
        let err = client
            .route_multi_waypoint(&[Coordinate::new(54.40, -3.00), Coordinate::new(54.42, -3.02)])
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::Unavailable(_)));
    }

    #[test]
    fn chain_from_config_puts_proxy_first() {
        let config = RoutingConfig {
            base_url: "https://ors.example".into(),
            profile: "foot-hiking".into(),
            preference: "recommended".into(),
            api_key: Some("secret".into()),
            proxy_url: Some("http://localhost:8080/api/directions".into()),
        };
        let chain = TransportChain::from_config(&config);
        assert!(matches!(chain.transports[0], Transport::Proxy { .. }));
        assert!(matches!(
            &chain.transports[1],
            Transport::Direct { url, .. } if url == "https://ors.example/v2/directions/foot-hiking/geojson"
        ));
    }
}
