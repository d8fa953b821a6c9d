// Handlers for the walk library API endpoints

use std::sync::MutexGuard;

use axum::{
    Json,
    extract::{Path, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};

use crate::{
    ApiResult, AppState, api_error,
    assembler::{AssembledWalk, RouteAssembler},
    batch::{BatchReport, reroute_all},
    elevation::{parse_elevation_gain, synthetic_elevation_profile},
    error::{ExportError, StoreError, SuggestionError},
    gpx_export::{encode_walk_as_gpx, encode_walk_as_gpx_base64},
    models::{ApiError, AssembleResponse, DraftWalk, ElevationProfile, SuggestRequest, Walk},
    store::WalkStore,
};

/// GET /api/walks - Current walk library
pub async fn list_walks(State(state): State<AppState>) -> ApiResult<Json<Vec<Walk>>> {
    let store = lock_store(&state)?;
    Ok(Json(store.walks().to_vec()))
}

/// GET /api/walks/:name - A single walk
pub async fn get_walk(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Walk>> {
    find_walk(&state, &name).map(Json)
}

/// POST /api/walks - Add a walk to the library
pub async fn add_walk(
    State(state): State<AppState>,
    Json(walk): Json<Walk>,
) -> ApiResult<(StatusCode, Json<Walk>)> {
    validate_walk(&walk)?;
    lock_store(&state)?
        .add(walk.clone())
        .map_err(store_error_to_api_error)?;
    tracing::info!("added walk '{}'", walk.name);
    Ok((StatusCode::CREATED, Json(walk)))
}

/// PUT /api/walks - Replace the whole library
pub async fn replace_walks(
    State(state): State<AppState>,
    Json(walks): Json<Vec<Walk>>,
) -> ApiResult<Json<Vec<Walk>>> {
    walks.iter().try_for_each(validate_walk)?;
    lock_store(&state)?
        .replace_all(walks.clone())
        .map_err(store_error_to_api_error)?;
    tracing::info!("walk library replaced with {} walks", walks.len());
    Ok(Json(walks))
}

/// POST /api/walks/assemble - Build a walk from route-builder clicks
pub async fn assemble_walk(
    State(state): State<AppState>,
    Json(draft): Json<DraftWalk>,
) -> ApiResult<Json<AssembleResponse>> {
    validate_draft(&draft)?;
    let _work = state.begin_route_work()?;

    let assembled = RouteAssembler::new(state.router.as_ref())
        .with_enricher(state.suggester.as_ref())
        .assemble(draft)
        .await;
    assembled_response(assembled)
}

/// POST /api/walks/suggest - Ask the language model for a walk, then route it
pub async fn suggest_walk(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> ApiResult<Json<AssembleResponse>> {
    let _work = state.begin_route_work()?;

    let draft = state
        .suggester
        .suggest_walk(&request.prompt)
        .await
        .map_err(suggestion_error_to_api_error)?;
    tracing::info!("language model suggested '{}'", draft.name);

    let assembled = RouteAssembler::new(state.router.as_ref())
        .with_enricher(state.suggester.as_ref())
        .assemble(draft)
        .await;
    assembled_response(assembled)
}

/// POST /api/walks/reroute - Re-route every walk in the library
pub async fn reroute_walks(State(state): State<AppState>) -> ApiResult<Json<BatchReport>> {
    let _work = state.begin_route_work()?;

    reroute_all(state.router.as_ref(), &state.store, state.batch_policy)
        .await
        .map(Json)
        .map_err(store_error_to_api_error)
}

/// GET /api/walks/:name/gpx - Download a walk as GPX
pub async fn export_gpx(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let walk = find_walk(&state, &name)?;
    let gpx = encode_walk_as_gpx(&walk).map_err(export_error_to_api_error)?;
    let disposition = format!("attachment; filename=\"{}.gpx\"", file_stem(&walk.name));

    Ok((
        [
            (CONTENT_TYPE, "application/gpx+xml".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        gpx,
    ))
}

/// GET /api/walks/:name/elevation - Synthetic elevation profile of a walk
pub async fn elevation_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ElevationProfile>> {
    let walk = find_walk(&state, &name)?;
    let gain = parse_elevation_gain(&walk.elevation).unwrap_or(0.0);
    Ok(Json(synthetic_elevation_profile(&walk.waypoints, gain)))
}

fn assembled_response(assembled: AssembledWalk) -> ApiResult<Json<AssembleResponse>> {
    let gpx_base64 =
        encode_walk_as_gpx_base64(&assembled.walk).map_err(export_error_to_api_error)?;
    let warning = assembled.warning();

    Ok(Json(AssembleResponse {
        walk: assembled.walk,
        status: assembled.status,
        warning,
        gpx_base64,
    }))
}

fn lock_store(state: &AppState) -> ApiResult<MutexGuard<'_, WalkStore>> {
    state
        .store
        .lock()
        .map_err(|_| store_error_to_api_error(StoreError::Poisoned))
}

fn find_walk(state: &AppState, name: &str) -> ApiResult<Walk> {
    lock_store(state)?
        .find(name)
        .cloned()
        .ok_or_else(|| store_error_to_api_error(StoreError::NotFound(name.to_string())))
}

/// Names that collide with the static `/api/walks/<segment>` routes.
const RESERVED_WALK_NAMES: [&str; 3] = ["assemble", "suggest", "reroute"];

fn validate_walk(walk: &Walk) -> ApiResult<()> {
    if walk.name.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Walk name is required"));
    }
    if RESERVED_WALK_NAMES.contains(&walk.name.as_str()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Walk name '{}' is reserved", walk.name),
        ));
    }
    let all_valid = [walk.start, walk.end]
        .iter()
        .chain(&walk.waypoints)
        .all(|point| point.is_valid());
    if !all_valid {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Walk '{}' has coordinates out of range", walk.name),
        ));
    }
    Ok(())
}

fn validate_draft(draft: &DraftWalk) -> ApiResult<()> {
    let all_valid = std::iter::once(draft.start)
        .chain(draft.end)
        .chain(draft.destination)
        .chain(draft.loop_waypoints.iter().copied())
        .all(|point| point.is_valid());
    if all_valid {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::BAD_REQUEST,
            "Draft walk has coordinates out of range",
        ))
    }
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() { "walk".to_string() } else { stem }
}

/// Convert StoreError to API error response
fn store_error_to_api_error(err: StoreError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Parse(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Poisoned => {
            tracing::error!("walk store failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, err.to_string())
}

fn suggestion_error_to_api_error(err: SuggestionError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        SuggestionError::EmptyPrompt => StatusCode::BAD_REQUEST,
        SuggestionError::MalformedResponse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SuggestionError::NoCredentials => StatusCode::SERVICE_UNAVAILABLE,
        SuggestionError::Unavailable(_) | SuggestionError::Rejected { .. } => {
            StatusCode::BAD_GATEWAY
        }
    };
    tracing::warn!("walk suggestion failed: {}", err);
    api_error(status, err.to_string())
}

fn export_error_to_api_error(err: ExportError) -> (StatusCode, Json<ApiError>) {
    tracing::error!("GPX export failed: {}", err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
