//! Pipeline record HTTP handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use super::{header_actor, resolve_actor, MessageResponse};
use crate::api::{ApiError, AppState};
use crate::models::{NewRecord, Record, RecordPatch};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub stage_id: Option<i64>,
}

/// Body of a stage move
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub stage_id: Option<i64>,
    pub moved_by: Option<String>,
}

/// List records, newest first, optionally filtered by `?stageId=`
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RecordQuery>, QueryRejection>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let Query(query) = query?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.list_records(query.stage_id)?))
}

/// List the records of one stage
pub async fn list_records_in_stage(
    State(state): State<Arc<AppState>>,
    stage_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let Path(stage_id) = stage_id?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.list_records(Some(stage_id))?))
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Record>, ApiError> {
    let Path(id) = id?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.get_record(id)?))
}

/// Create a record; its initial movement is attributed to the `X-Actor` caller
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewRecord>, JsonRejection>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let Json(data) = payload?;
    let actor = header_actor(&headers);
    let pipeline = state.pipeline.lock().await;
    Ok((StatusCode::CREATED, Json(pipeline.create_record(&data, actor.as_deref())?)))
}

pub async fn update_record(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let actor = header_actor(&headers);
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.update_record(id, &patch, actor.as_deref())?))
}

/// Move a record to another stage
pub async fn move_record(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<Record>, ApiError> {
    let Path(id) = id?;
    let Json(request) = payload?;
    let stage_id = request
        .stage_id
        .ok_or_else(|| ApiError::validation("stageId is required"))?;
    let actor = resolve_actor(request.moved_by.as_deref(), &headers);

    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.move_record(id, stage_id, actor.as_deref())?))
}

pub async fn delete_record(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Path(id) = id?;
    let pipeline = state.pipeline.lock().await;
    pipeline.delete_record(id)?;
    Ok(Json(MessageResponse {
        message: "Record deleted successfully".to_string(),
    }))
}
