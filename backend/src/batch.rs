use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    assembler::RoutePlan,
    error::{RerouteError, RoutingError, StoreError},
    format::{format_distance, format_duration},
    geometry::farthest_from,
    models::{DraftWalk, Walk},
    routing_client::DirectionsService,
    store::{RouteUpdate, WalkStore},
};

/// Pauses between directions calls during a library re-route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPolicy {
    pub success_delay: Duration,
    pub failure_delay: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            success_delay: Duration::from_millis(1500),
            failure_delay: Duration::from_secs(4),
        }
    }
}

impl BatchPolicy {
    pub fn immediate() -> Self {
        Self {
            success_delay: Duration::ZERO,
            failure_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub updated: usize,
    pub failures: Vec<BatchFailure>,
    /// One human-readable line per walk, in processing order.
    pub log: Vec<String>,
}

/// Re-route every walk in `store`, one directions call at a time.
///
/// Each success is written to the store straight away, so an interrupted
/// batch keeps what it already did. Failures are recorded and the batch
/// moves on. Only path, distance and time are written back, onto whatever
/// the store holds under that name when the route arrives.
pub async fn reroute_all<R: DirectionsService>(
    router: &R,
    store: &Mutex<WalkStore>,
    policy: BatchPolicy,
) -> Result<BatchReport, StoreError> {
    let walks = lock(store)?.walks().to_vec();
    let total = walks.len();
    let mut report = BatchReport {
        total,
        ..BatchReport::default()
    };
    tracing::info!("re-routing {} walks", total);

    for (idx, walk) in walks.into_iter().enumerate() {
        let position = format!("[{}/{}]", idx + 1, total);
        let name = walk.name.clone();

        let outcome = match reroute_one(router, &walk).await {
            Ok(route) => {
                let summary = format!("{}, {}", route.distance, route.time);
                let saved = {
                    let mut guard = lock(store)?;
                    guard.update_route(&name, route)
                };
                saved.map(|()| summary).map_err(RerouteError::from)
            }
            Err(err) => Err(RerouteError::from(err)),
        };

        let delay = match outcome {
            Ok(summary) => {
                tracing::info!("{} '{}' re-routed: {}", position, name, summary);
                report.log.push(format!("{position} {name}: {summary}"));
                report.updated += 1;
                policy.success_delay
            }
            Err(err) => {
                tracing::warn!("{} '{}' failed: {}", position, name, err);
                report.log.push(format!("{position} {name}: failed ({err})"));
                report.failures.push(BatchFailure {
                    name,
                    error: err.to_string(),
                });
                policy.failure_delay
            }
        };

        if idx + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    tracing::info!(
        "re-route finished: {} updated, {} failed",
        report.updated,
        report.failures.len()
    );
    Ok(report)
}

async fn reroute_one<R: DirectionsService>(
    router: &R,
    walk: &Walk,
) -> Result<RouteUpdate, RoutingError> {
    let mut draft = DraftWalk::from(walk);
    if walk.is_circular() {
        draft.destination = farthest_from(walk.start, &walk.waypoints);
    }

    let result = RoutePlan::for_draft(&draft).resolve(router).await?;
    if result.waypoints.is_empty() {
        return Err(RoutingError::InvalidResponse("empty path".into()));
    }

    Ok(RouteUpdate {
        waypoints: result.waypoints,
        distance: format_distance(result.distance_m),
        time: format_duration(result.duration_s),
    })
}

fn lock(store: &Mutex<WalkStore>) -> Result<MutexGuard<'_, WalkStore>, StoreError> {
    store.lock().map_err(|_| StoreError::Poisoned)
}
