//! Booking and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::CancellationReceipt;
use common::{SeatId, ShowId, TicketId, UserId};
use domain::{BookingTicket, PaymentMethod};
use serde::{Deserialize, Serialize};

use super::parse_id;
use super::payments::PaymentResponse;
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub show_id: String,
    pub seat_ids: Vec<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Serialize)]
pub struct TicketResponse {
    pub id: String,
    pub user_id: String,
    pub show_id: String,
    pub seat_ids: Vec<String>,
    pub status: String,
    pub total_cents: i64,
    pub total: String,
    pub payment_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&BookingTicket> for TicketResponse {
    fn from(ticket: &BookingTicket) -> Self {
        Self {
            id: ticket.id().to_string(),
            user_id: ticket.user_id().to_string(),
            show_id: ticket.show_id().to_string(),
            seat_ids: ticket.seat_ids().iter().map(|s| s.to_string()).collect(),
            status: ticket.status().to_string(),
            total_cents: ticket.total_cost().cents(),
            total: ticket.total_cost().to_string(),
            payment_ref: ticket.payment_ref().map(|t| t.to_string()),
            created_at: ticket.created_at().to_rfc3339(),
            updated_at: ticket.updated_at().to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct CancellationResponse {
    pub ticket: TicketResponse,
    pub refund_bps: u32,
    pub refund: Option<PaymentResponse>,
}

impl From<&CancellationReceipt> for CancellationResponse {
    fn from(receipt: &CancellationReceipt) -> Self {
        Self {
            ticket: TicketResponse::from(&receipt.ticket),
            refund_bps: receipt.refund_bps,
            refund: receipt.refund.as_ref().map(PaymentResponse::from),
        }
    }
}

/// POST /bookings: book seats and charge the customer in one step.
#[tracing::instrument(skip(state, req), fields(show_id = %req.show_id))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let user_id: UserId = parse_id("user", &req.user_id)?;
    let show_id: ShowId = parse_id("show", &req.show_id)?;
    let seat_ids = req.seat_ids.into_iter().map(SeatId::new).collect();

    let ticket = state
        .workflow
        .book(user_id, show_id, seat_ids, req.payment_method)
        .await?;

    Ok((StatusCode::CREATED, Json(TicketResponse::from(&ticket))))
}

/// GET /bookings/{id}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket_id: TicketId = parse_id("ticket", &id)?;
    let ticket = state.workflow.get_ticket(ticket_id).await?;
    Ok(Json(TicketResponse::from(&ticket)))
}

/// POST /bookings/{id}/cancel: cancel a confirmed ticket and refund per policy.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancellationResponse>, ApiError> {
    let ticket_id: TicketId = parse_id("ticket", &id)?;
    let receipt = state.workflow.cancel(ticket_id).await?;
    Ok(Json(CancellationResponse::from(&receipt)))
}

/// GET /users/{id}/bookings
#[tracing::instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TicketResponse>>, ApiError> {
    let user_id: UserId = parse_id("user", &id)?;
    let tickets = state.workflow.tickets_for_user(user_id).await?;
    Ok(Json(tickets.iter().map(TicketResponse::from).collect()))
}
