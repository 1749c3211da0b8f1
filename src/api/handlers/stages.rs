//! Stage management HTTP handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::header_actor;
use crate::api::{ApiError, AppState};
use crate::models::{NewStage, Stage, StageDeletion, StageDeletionReport, StagePatch};

/// Query string for stage deletion
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStageQuery {
    pub reassign_to: Option<i64>,
    #[serde(default)]
    pub cascade: bool,
}

impl DeleteStageQuery {
    fn mode(&self) -> Result<StageDeletion, ApiError> {
        match (self.reassign_to, self.cascade) {
            (Some(_), true) => Err(ApiError::validation(
                "reassignTo and cascade cannot be combined",
            )),
            (Some(target), false) => Ok(StageDeletion::ReassignTo(target)),
            (None, true) => Ok(StageDeletion::Cascade),
            (None, false) => Ok(StageDeletion::Refuse),
        }
    }
}

#[derive(Serialize)]
pub struct DeleteStageResponse {
    message: String,
    #[serde(flatten)]
    report: StageDeletionReport,
}

/// One entry of a reorder request
#[derive(Debug, Deserialize)]
pub struct StageOrder {
    pub id: i64,
    pub position: i64,
}

/// List stages by position
pub async fn list_stages(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Stage>>, ApiError> {
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.list_stages()?))
}

/// Get one stage
pub async fn get_stage(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Stage>, ApiError> {
    let Path(id) = id?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.get_stage(id)?))
}

/// Create a stage
pub async fn create_stage(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewStage>, JsonRejection>,
) -> Result<(StatusCode, Json<Stage>), ApiError> {
    let Json(data) = payload?;
    let pipeline = state.pipeline.lock().await;
    Ok((StatusCode::CREATED, Json(pipeline.create_stage(&data)?)))
}

/// Update a stage
pub async fn update_stage(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<StagePatch>, JsonRejection>,
) -> Result<Json<Stage>, ApiError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.update_stage(id, &patch)?))
}

/// Delete a stage; `?reassignTo=<id>` or `?cascade=true` handle remaining records
pub async fn delete_stage(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<DeleteStageQuery>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<DeleteStageResponse>, ApiError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let mode = query.mode()?;
    let actor = header_actor(&headers);

    let pipeline = state.pipeline.lock().await;
    let report = pipeline.delete_stage(id, mode, actor.as_deref())?;
    Ok(Json(DeleteStageResponse {
        message: "Stage deleted successfully".to_string(),
        report,
    }))
}

/// Apply a new stage order given as `[{id, position}]`.
///
/// Pairs are sorted by position (ties keep submission order); the resulting
/// stages are renumbered 1..n.
pub async fn reorder_stages(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<StageOrder>>, JsonRejection>,
) -> Result<Json<Vec<Stage>>, ApiError> {
    let Json(mut order) = payload?;
    order.sort_by_key(|entry| entry.position);
    let ids: Vec<i64> = order.iter().map(|entry| entry.id).collect();

    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.reorder_stages(&ids)?))
}
