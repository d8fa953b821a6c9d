use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, COORD_EPSILON, Coordinate, Difficulty, DirectionStep, DraftWalk, ElevationProfile,
    RouteResult, RouteStep, Walk, WalkType,
};

/// How the path of an assembled walk was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RouteStatus {
    /// Real trail geometry from the directions service.
    Routed,
    /// Straight-line stand-in; the directions service failed.
    Approximate { reason: String },
}

impl RouteStatus {
    pub fn is_approximate(&self) -> bool {
        matches!(self, RouteStatus::Approximate { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembleResponse {
    pub walk: Walk,
    #[serde(flatten)]
    pub status: RouteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub gpx_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub prompt: String,
}
