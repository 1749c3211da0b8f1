//! Movement log HTTP handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};

use super::resolve_actor;
use crate::api::{ApiError, AppState};
use crate::models::{Movement, MovementEntry, MovementFilter};

/// Cap applied to the unfiltered log when no `limit` is given
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// List movements newest first (`?recordId=&limit=`)
pub async fn list_movements(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MovementFilter>, QueryRejection>,
) -> Result<Json<Vec<Movement>>, ApiError> {
    let Query(mut filter) = query?;
    if filter.record_id.is_none() && filter.limit.is_none() {
        filter.limit = Some(DEFAULT_LOG_LIMIT);
    }
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.list_movements(&filter)?))
}

/// Full history of one record
pub async fn list_record_movements(
    State(state): State<Arc<AppState>>,
    record_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Movement>>, ApiError> {
    let Path(record_id) = record_id?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.list_movements(&MovementFilter::for_record(record_id))?))
}

/// Append an explicit movement entry
pub async fn append_movement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<MovementEntry>, JsonRejection>,
) -> Result<(StatusCode, Json<Movement>), ApiError> {
    let Json(mut entry) = payload?;
    entry.moved_by = resolve_actor(entry.moved_by.as_deref(), &headers);

    let pipeline = state.pipeline.lock().await;
    Ok((StatusCode::CREATED, Json(pipeline.append_movement(&entry)?)))
}
