//! HTTP API route definitions

use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(handlers::health))
        // Stages (static routes before dynamic {id} routes)
        .route(
            "/api/stages",
            get(handlers::stages::list_stages).post(handlers::stages::create_stage),
        )
        .route("/api/stages/reorder", patch(handlers::stages::reorder_stages))
        .route(
            "/api/stages/{id}",
            get(handlers::stages::get_stage)
                .put(handlers::stages::update_stage)
                .delete(handlers::stages::delete_stage),
        )
        // Records
        .route(
            "/api/pipeline-records",
            get(handlers::records::list_records).post(handlers::records::create_record),
        )
        .route(
            "/api/pipeline-records/stage/{stage_id}",
            get(handlers::records::list_records_in_stage),
        )
        .route(
            "/api/pipeline-records/{id}",
            get(handlers::records::get_record)
                .put(handlers::records::update_record)
                .delete(handlers::records::delete_record),
        )
        .route(
            "/api/pipeline-records/{id}/stage",
            patch(handlers::records::move_record),
        )
        // Movements
        .route(
            "/api/pipeline-movements",
            get(handlers::movements::list_movements).post(handlers::movements::append_movement),
        )
        .route(
            "/api/pipeline-movements/record/{record_id}",
            get(handlers::movements::list_record_movements),
        )
        // Board
        .route("/api/board", get(handlers::board::get_board))
        .with_state(state)
}
