//! Payment ledger lookup and maintenance endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::TransactionId;
use domain::PaymentEntry;
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct PaymentResponse {
    pub transaction_id: String,
    pub ticket_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub method: String,
    pub status: String,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    /// Set on refunds: the charge being reversed.
    pub original_transaction_id: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl From<&PaymentEntry> for PaymentResponse {
    fn from(entry: &PaymentEntry) -> Self {
        Self {
            transaction_id: entry.transaction_id().to_string(),
            ticket_id: entry.ticket_id().to_string(),
            user_id: entry.user_id().to_string(),
            amount_cents: entry.amount().cents(),
            method: entry.method().to_string(),
            status: entry.status().to_string(),
            gateway_reference: entry.gateway_reference().map(String::from),
            failure_reason: entry.failure_reason().map(String::from),
            original_transaction_id: entry.original().map(|t| t.to_string()),
            created_at: entry.created_at().to_rfc3339(),
            completed_at: entry.completed_at().map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /payments/{txn}
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(txn): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let entry = state.workflow.find_payment(&TransactionId::new(txn)).await?;
    Ok(Json(PaymentResponse::from(&entry)))
}

/// POST /payments/{txn}/verify: reconcile a pending entry with the gateway.
#[tracing::instrument(skip(state))]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(txn): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let entry = state
        .workflow
        .verify_payment(&TransactionId::new(txn))
        .await?;
    Ok(Json(PaymentResponse::from(&entry)))
}

/// POST /payments/{txn}/cancel: abandon a pending entry.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(txn): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let entry = state
        .workflow
        .cancel_pending_payment(&TransactionId::new(txn))
        .await?;
    Ok(Json(PaymentResponse::from(&entry)))
}
