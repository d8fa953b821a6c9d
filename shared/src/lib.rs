use serde::{Deserialize, Serialize};

/// Tolerance, in degrees, under which two coordinates are the same place.
pub const COORD_EPSILON: f64 = 0.0015;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lon: self.lon + (other.lon - self.lon) * t,
        }
    }

    /// True when both axes differ by no more than `epsilon` degrees.
    pub fn approx_eq(self, other: Self, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() <= epsilon && (self.lon - other.lon).abs() <= epsilon
    }

    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Moderate,
    Challenging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkType {
    Summit,
    Ridge,
    Lakeside,
    Waterfall,
    Woodland,
    Coastal,
    #[default]
    Valley,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionStep {
    #[serde(default)]
    pub step: u32,
    pub instruction: String,
    #[serde(default)]
    pub landmark: String,
}

/// A walk in the library.
///
/// `end == start` (within [`COORD_EPSILON`]) marks a circular walk; there is
/// no separate flag to drift out of sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Walk {
    pub name: String,
    pub start: Coordinate,
    pub end: Coordinate,
    #[serde(default)]
    pub waypoints: Vec<Coordinate>,
    pub distance: String,
    pub time: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "not_available")]
    pub elevation: String,
    #[serde(default)]
    pub terrain: String,
    #[serde(default)]
    pub walk_type: WalkType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payoff: String,
    #[serde(default)]
    pub parking: String,
    #[serde(default)]
    pub directions: Vec<DirectionStep>,
}

impl Walk {
    pub fn is_circular(&self) -> bool {
        self.start.approx_eq(self.end, COORD_EPSILON)
    }
}

/// A walk before route assembly: endpoints and hints, no resolved path.
///
/// Built from map clicks in the route builder or from a language-model
/// suggestion. `end == None` means the walk returns to `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftWalk {
    pub name: String,
    pub start: Coordinate,
    #[serde(default)]
    pub end: Option<Coordinate>,
    #[serde(default)]
    pub is_circular: Option<bool>,
    /// Feature the loop should reach (summit, tarn, ...), if known.
    #[serde(default)]
    pub destination: Option<Coordinate>,
    #[serde(default)]
    pub loop_waypoints: Vec<Coordinate>,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "not_available")]
    pub elevation: String,
    #[serde(default)]
    pub terrain: String,
    #[serde(default)]
    pub walk_type: WalkType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payoff: String,
    #[serde(default)]
    pub parking: String,
    #[serde(default)]
    pub directions: Vec<DirectionStep>,
}

impl Default for Coordinate {
    fn default() -> Self {
        Self { lat: 0.0, lon: 0.0 }
    }
}

impl From<&Walk> for DraftWalk {
    fn from(walk: &Walk) -> Self {
        Self {
            name: walk.name.clone(),
            start: walk.start,
            end: Some(walk.end),
            is_circular: Some(walk.is_circular()),
            destination: None,
            loop_waypoints: Vec::new(),
            distance: walk.distance.clone(),
            time: walk.time.clone(),
            difficulty: walk.difficulty,
            elevation: walk.elevation.clone(),
            terrain: walk.terrain.clone(),
            walk_type: walk.walk_type,
            description: walk.description.clone(),
            payoff: walk.payoff.clone(),
            parking: walk.parking.clone(),
            directions: walk.directions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    #[serde(default)]
    pub name: String,
    pub distance_m: f64,
    pub duration_s: f64,
}

/// Path resolved by the directions service, axis order already (lat, lon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub waypoints: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_s: f64,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    pub elevations: Vec<Option<f64>>,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub total_ascent: f64,
    pub total_descent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

pub fn not_available() -> String {
    "N/A".to_string()
}
