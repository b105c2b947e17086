//! HTTP API server with observability for the seat booking engine.
//!
//! A thin adapter over [`booking::BookingWorkflow`]: handlers parse requests,
//! call the workflow and map its errors to HTTP status codes. Structured
//! logging comes from tracing and metrics are exposed in Prometheus format.

pub mod config;
pub mod demo;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking::{
    BookingConfig, BookingServices, BookingWorkflow, InMemoryCatalog, InMemoryPaymentGateway,
    InMemoryPaymentLedger, InMemorySeatInventory, InMemoryTicketRepository,
    InMemoryUserDirectory, PaymentGateway, RandomPaymentGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, GatewayMode};
use demo::DemoData;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub workflow: BookingWorkflow,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route("/bookings", post(routes::bookings::create))
        .route("/bookings/{id}", get(routes::bookings::get))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel))
        .route("/users/{id}/bookings", get(routes::bookings::list_for_user))
        .route("/shows/{id}/seats", get(routes::shows::seats))
        .route("/payments/{txn}", get(routes::payments::get))
        .route("/payments/{txn}/verify", post(routes::payments::verify))
        .route("/payments/{txn}/cancel", post(routes::payments::cancel))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds application state over in-memory stores and seeds the demo catalog.
pub async fn create_state(
    config: BookingConfig,
    gateway: Arc<dyn PaymentGateway>,
) -> (Arc<AppState>, DemoData) {
    let catalog = InMemoryCatalog::new();
    let users = InMemoryUserDirectory::new();
    let demo = demo::seed(&catalog, &users).await;

    let services = BookingServices {
        inventory: Arc::new(InMemorySeatInventory::new()),
        gateway,
        ledger: Arc::new(InMemoryPaymentLedger::new()),
        tickets: Arc::new(InMemoryTicketRepository::new()),
        catalog: Arc::new(catalog),
        users: Arc::new(users),
    };
    let workflow = BookingWorkflow::new(config, services);

    (Arc::new(AppState { workflow }), demo)
}

/// Creates the application state described by `config`.
pub async fn create_default_state(config: &Config) -> (Arc<AppState>, DemoData) {
    let gateway: Arc<dyn PaymentGateway> = match config.gateway {
        GatewayMode::Random => Arc::new(RandomPaymentGateway::default()),
        GatewayMode::Approve => Arc::new(InMemoryPaymentGateway::new()),
    };
    create_state(config.booking.clone(), gateway).await
}
