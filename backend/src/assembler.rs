//! Turns a draft walk into a finished one with a drawable path.
//!
//! The directions service is asked for real trail geometry in one of three
//! shapes (through via-points, out-and-back loop, point to point). Whatever
//! happens there, the assembled walk always carries a path: on failure the
//! known points are joined with straight lines and the result is flagged as
//! approximate.

use std::future::Future;

use crate::{
    error::RoutingError,
    format::{format_distance, format_duration},
    geometry::{loop_offset, path_length_km, straight_line},
    models::{
        COORD_EPSILON, Coordinate, Difficulty, DirectionStep, DraftWalk, RouteResult, RouteStatus,
        RouteStep, Walk,
    },
    routing_client::DirectionsService,
};

/// Walks with fewer direction steps than this get enrichment.
pub const MIN_DIRECTION_STEPS: usize = 3;

/// Pace used to estimate a time for straight-line stand-in paths.
const FALLBACK_PACE_KMH: f64 = 4.0;

/// Best-effort source of written directions for a resolved path.
pub trait DirectionsEnricher: Send + Sync {
    /// Never fails; an empty list means nothing could be produced.
    fn suggest_directions(
        &self,
        name: &str,
        waypoints: &[Coordinate],
        start_label: &str,
        difficulty: Difficulty,
    ) -> impl Future<Output = Vec<DirectionStep>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrichment;

impl DirectionsEnricher for NoEnrichment {
    async fn suggest_directions(
        &self,
        _name: &str,
        _waypoints: &[Coordinate],
        _start_label: &str,
        _difficulty: Difficulty,
    ) -> Vec<DirectionStep> {
        Vec::new()
    }
}

/// Which request the directions service gets for a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutePlan {
    /// Start, via-points, then start again (loop) or the end point.
    MultiWaypoint { points: Vec<Coordinate>, circular: bool },
    /// Out to `destination` and back. `synthetic` marks a made-up
    /// destination offset from the start.
    Circular {
        start: Coordinate,
        destination: Coordinate,
        synthetic: bool,
    },
    Linear { start: Coordinate, end: Coordinate },
}

impl RoutePlan {
    pub fn for_draft(draft: &DraftWalk) -> Self {
        let start = draft.start;
        let end = effective_end(draft);
        let circular = end.is_none();

        if !draft.loop_waypoints.is_empty() {
            let mut points = Vec::with_capacity(draft.loop_waypoints.len() + 2);
            points.push(start);
            points.extend_from_slice(&draft.loop_waypoints);
            points.push(end.unwrap_or(start));
            return RoutePlan::MultiWaypoint { points, circular };
        }

        match end {
            Some(end) => RoutePlan::Linear { start, end },
            None => match draft
                .destination
                .filter(|destination| !destination.approx_eq(start, COORD_EPSILON))
            {
                Some(destination) => RoutePlan::Circular {
                    start,
                    destination,
                    synthetic: false,
                },
                None => RoutePlan::Circular {
                    start,
                    destination: loop_offset(start),
                    synthetic: true,
                },
            },
        }
    }

    pub fn start(&self) -> Coordinate {
        match self {
            RoutePlan::MultiWaypoint { points, .. } => points[0],
            RoutePlan::Circular { start, .. } | RoutePlan::Linear { start, .. } => *start,
        }
    }

    /// Where the walk finishes: the start again for loops.
    pub fn end(&self) -> Coordinate {
        match self {
            RoutePlan::MultiWaypoint {
                points,
                circular: false,
            } => points[points.len() - 1],
            RoutePlan::Linear { end, .. } => *end,
            _ => self.start(),
        }
    }

    pub fn is_circular(&self) -> bool {
        match self {
            RoutePlan::MultiWaypoint { circular, .. } => *circular,
            RoutePlan::Circular { .. } => true,
            RoutePlan::Linear { .. } => false,
        }
    }

    pub async fn resolve<R: DirectionsService>(
        &self,
        router: &R,
    ) -> Result<RouteResult, RoutingError> {
        match self {
            RoutePlan::MultiWaypoint { points, .. } => router.route_multi_waypoint(points).await,
            RoutePlan::Circular {
                start, destination, ..
            } => router.route_circular(*start, *destination).await,
            RoutePlan::Linear { start, end } => router.route_between(*start, *end, &[]).await,
        }
    }

    /// Known points joined by straight lines; at least two points.
    pub fn straight_line(&self) -> Vec<Coordinate> {
        match self {
            RoutePlan::MultiWaypoint { points, .. } => points.clone(),
            RoutePlan::Circular {
                start, destination, ..
            } => straight_line(*start, *destination, 1),
            RoutePlan::Linear { start, end } => straight_line(*start, *end, 1),
        }
    }
}

/// The draft's end point, or `None` when the walk returns to its start.
///
/// Coordinates win over the `isCircular` hint: a hinted loop whose end lies
/// elsewhere is linear, and an end on top of the start is a loop whatever
/// the hint says. A linear hint with no end uses the destination as the end.
fn effective_end(draft: &DraftWalk) -> Option<Coordinate> {
    let start = draft.start;
    match (draft.end, draft.is_circular) {
        (Some(end), hint) => {
            let same_place = end.approx_eq(start, COORD_EPSILON);
            if hint.is_some_and(|circular| circular != same_place) {
                tracing::debug!(
                    "'{}': circular hint {:?} contradicted by coordinates",
                    draft.name,
                    hint
                );
            }
            (!same_place).then_some(end)
        }
        (None, Some(false)) => draft
            .destination
            .filter(|destination| !destination.approx_eq(start, COORD_EPSILON)),
        (None, _) => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledWalk {
    pub walk: Walk,
    pub status: RouteStatus,
}

impl AssembledWalk {
    /// Banner text for the user when the path is only approximate.
    pub fn warning(&self) -> Option<String> {
        match &self.status {
            RouteStatus::Routed => None,
            RouteStatus::Approximate { reason } => Some(format!(
                "Showing an approximate straight-line route: {reason}"
            )),
        }
    }
}

pub struct RouteAssembler<'a, R, E = NoEnrichment> {
    router: &'a R,
    enricher: &'a E,
}

impl<'a, R: DirectionsService> RouteAssembler<'a, R> {
    pub fn new(router: &'a R) -> Self {
        Self {
            router,
            enricher: &NoEnrichment,
        }
    }
}

impl<'a, R, E> RouteAssembler<'a, R, E>
where
    R: DirectionsService,
    E: DirectionsEnricher,
{
    pub fn with_enricher<E2: DirectionsEnricher>(self, enricher: &'a E2) -> RouteAssembler<'a, R, E2> {
        RouteAssembler {
            router: self.router,
            enricher,
        }
    }

    /// Resolve `draft` into a walk. Never fails: routing problems turn into
    /// a straight-line path with [`RouteStatus::Approximate`].
    pub async fn assemble(&self, draft: DraftWalk) -> AssembledWalk {
        let plan = RoutePlan::for_draft(&draft);
        tracing::debug!("assembling '{}' with plan {:?}", draft.name, plan);

        let (waypoints, distance, time, service_steps, status) =
            match plan.resolve(self.router).await {
                Ok(result) if !result.waypoints.is_empty() => (
                    result.waypoints,
                    format_distance(result.distance_m),
                    format_duration(result.duration_s),
                    result.steps,
                    RouteStatus::Routed,
                ),
                Ok(_) => fallback(&plan, &draft, "directions service returned an empty path"),
                Err(err) => fallback(&plan, &draft, &err.to_string()),
            };

        let mut walk = Walk {
            name: draft.name,
            start: plan.start(),
            end: plan.end(),
            waypoints,
            distance,
            time,
            difficulty: draft.difficulty,
            elevation: draft.elevation,
            terrain: draft.terrain,
            walk_type: draft.walk_type,
            description: draft.description,
            payoff: draft.payoff,
            parking: draft.parking,
            directions: draft.directions,
        };

        if walk.directions.len() < MIN_DIRECTION_STEPS {
            self.enrich_directions(&mut walk, service_steps).await;
        }

        match &status {
            RouteStatus::Routed => tracing::info!(
                "assembled '{}': {} points, {}, {}",
                walk.name,
                walk.waypoints.len(),
                walk.distance,
                walk.time
            ),
            RouteStatus::Approximate { reason } => tracing::warn!(
                "assembled '{}' with straight-line fallback: {}",
                walk.name,
                reason
            ),
        }

        AssembledWalk { walk, status }
    }

    async fn enrich_directions(&self, walk: &mut Walk, service_steps: Vec<RouteStep>) {
        let start_label = if walk.parking.trim().is_empty() {
            format!("{:.5}, {:.5}", walk.start.lat, walk.start.lon)
        } else {
            walk.parking.clone()
        };

        let suggested = self
            .enricher
            .suggest_directions(&walk.name, &walk.waypoints, &start_label, walk.difficulty)
            .await;
        if !suggested.is_empty() {
            walk.directions = suggested;
            return;
        }

        if service_steps.len() > walk.directions.len() {
            tracing::debug!(
                "'{}': using {} turn instructions from the directions service",
                walk.name,
                service_steps.len()
            );
            walk.directions = service_steps
                .into_iter()
                .enumerate()
                .map(|(idx, step)| DirectionStep {
                    step: idx as u32 + 1,
                    instruction: step.instruction,
                    landmark: step.name,
                })
                .collect();
        }
    }
}

type Resolved = (Vec<Coordinate>, String, String, Vec<RouteStep>, RouteStatus);

fn fallback(plan: &RoutePlan, draft: &DraftWalk, reason: &str) -> Resolved {
    let waypoints = plan.straight_line();
    let length_km = path_length_km(&waypoints);

    let distance = if draft.distance.trim().is_empty() {
        format_distance(length_km * 1000.0)
    } else {
        draft.distance.clone()
    };
    let time = if draft.time.trim().is_empty() {
        format_duration(length_km / FALLBACK_PACE_KMH * 3600.0)
    } else {
        draft.time.clone()
    };

    (
        waypoints,
        distance,
        time,
        Vec::new(),
        RouteStatus::Approximate {
            reason: reason.to_string(),
        },
    )
}
