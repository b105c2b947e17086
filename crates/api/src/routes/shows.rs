//! Seat map endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ShowId;
use serde::Serialize;

use super::parse_id;
use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct SeatResponse {
    pub seat_id: String,
    pub status: String,
    pub price_cents: i64,
}

#[derive(Serialize)]
pub struct SeatMapResponse {
    pub show_id: String,
    pub title: String,
    pub auditorium: String,
    pub starts_at: String,
    pub available: usize,
    pub seats: Vec<SeatResponse>,
}

/// GET /shows/{id}/seats
#[tracing::instrument(skip(state))]
pub async fn seats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SeatMapResponse>, ApiError> {
    let show_id: ShowId = parse_id("show", &id)?;
    let show = state.workflow.get_show(show_id).await?;
    let records = state.workflow.seat_map(show_id).await?;

    let seats: Vec<SeatResponse> = records
        .iter()
        .map(|r| SeatResponse {
            seat_id: r.seat_id().to_string(),
            status: r.status().to_string(),
            price_cents: r.price().cents(),
        })
        .collect();

    Ok(Json(SeatMapResponse {
        show_id: show.id.to_string(),
        title: show.title,
        auditorium: show.auditorium,
        starts_at: show.starts_at.to_rfc3339(),
        available: records.iter().filter(|r| r.is_available()).count(),
        seats,
    }))
}
