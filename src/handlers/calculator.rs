//! Reference GST calculation service.
//!
//! Stand-in for the external tax service in local runs and tests:
//! CGST and SGST at 9% each on the booking amount.
//!
//! Routes:
//! - `POST /calculate_gst` `{ "total_booking_amount": f64 }`
//! - `GET /health`

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

/// Central GST rate.
pub const CGST_RATE: f64 = 0.09;
/// State GST rate.
pub const SGST_RATE: f64 = 0.09;

/// Request from the relay's GST client.
#[derive(Debug, Deserialize)]
pub struct GstRequest {
    pub total_booking_amount: f64,
}

/// GST breakdown for a booking amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstBreakdown {
    pub base_amount: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub total_gst: f64,
    pub total_amount: f64,
}

impl GstBreakdown {
    pub fn for_amount(amount: f64) -> Self {
        let cgst = amount * CGST_RATE;
        let sgst = amount * SGST_RATE;
        let total_gst = cgst + sgst;
        Self {
            base_amount: amount,
            cgst,
            sgst,
            total_gst,
            total_amount: amount + total_gst,
        }
    }
}

async fn calculate_gst(Json(req): Json<GstRequest>) -> Json<GstBreakdown> {
    let breakdown = GstBreakdown::for_amount(req.total_booking_amount);
    info!(
        amount = req.total_booking_amount,
        total_gst = breakdown.total_gst,
        "gst calculated"
    );
    Json(breakdown)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Build the calculator router.
pub fn router() -> Router {
    Router::new()
        .route("/calculate_gst", post(calculate_gst))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
}
