//! HTTP transport — the webhook endpoint.
//!
//! The platform fires-and-forgets deliveries: once a batch parses, the
//! response is `200` no matter what happened per event (failures are
//! surfaced to senders as chat notices, not HTTP errors). Only a body
//! that fails to parse yields a `500`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::event::WebhookDelivery;
use crate::relay::Relay;

/// Build the app router.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(relay)
}

async fn webhook(State(relay): State<Arc<Relay>>, body: String) -> Response {
    let delivery: WebhookDelivery = match serde_json::from_str(&body) {
        Ok(delivery) => delivery,
        Err(e) => {
            error!(error = %e, "Malformed webhook body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal server error" })),
            )
                .into_response();
        }
    };

    info!(events = delivery.events.len(), "Webhook delivery received");
    relay.process_delivery(&delivery.events).await;
    StatusCode::OK.into_response()
}

async fn health() -> StatusCode {
    StatusCode::OK
}
