//! REST API for bookings.
//!
//! Endpoints:
//! - `GET /bookings`: all bookings
//! - `PUT /bookings/:id`: set a booking's status, body `{"status": "pending" | "finished"}`
//! - `GET /health`: liveness
//!
//! Status changes made here reach observers through the change feed, not
//! directly.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::booking::{Booking, BookingStatus};

/// Body of a status update request.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: BookingStatus,
}

/// JSON body for status and error replies.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

type ApiError = (StatusCode, Json<MessageResponse>);

fn internal_error(context: &str, err: impl std::fmt::Display) -> ApiError {
    error!(error = %err, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        MessageResponse::new(err.to_string()),
    )
}

/// Booking routes. State is supplied by the parent router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings))
        .route("/bookings/:id", put(update_booking))
        .route("/health", get(health))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, ApiError> {
    let bookings = state
        .store
        .list()
        .await
        .map_err(|e| internal_error("failed to list bookings", e))?;
    Ok(Json(bookings))
}

async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .update_status(&id, update.status)
        .await
        .map_err(|e| internal_error("failed to update booking", e))?;

    info!(booking = %id, status = %update.status, "Booking status updated");
    Ok(MessageResponse::new("Booking updated successfully"))
}
