use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::{ApiError, AppState};
use crate::board::Board;

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    /// Records shown per column; all when absent
    pub limit: Option<usize>,
}

/// Board projection: one column per stage in position order
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    query: Result<Query<BoardQuery>, QueryRejection>,
) -> Result<Json<Board>, ApiError> {
    let Query(query) = query?;
    let pipeline = state.pipeline.lock().await;
    Ok(Json(pipeline.board(query.limit)?))
}
