use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::router::Dispatcher;

/// Shown to callers whenever the session aborts. Raw errors never leave the
/// server, and neither do HTTP error codes: failures answer 200 with this
/// fixed string.
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong while planning your trip.";

#[derive(Debug, Deserialize)]
pub struct PlanTripRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PlanTripResponse {
    pub response: String,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn plan_trip(
    State(dispatcher): State<Arc<Dispatcher>>,
    Json(request): Json<PlanTripRequest>,
) -> Json<PlanTripResponse> {
    match dispatcher.run(&request.message).await {
        Ok(outcome) => Json(PlanTripResponse {
            response: outcome.answer,
        }),
        Err(e) => {
            log::error!("plan-trip request failed: {e}");
            Json(PlanTripResponse {
                response: GENERIC_FAILURE.to_string(),
            })
        }
    }
}
