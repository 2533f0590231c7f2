use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::api::rest::extract::ApiJson;
use crate::auth::Authenticated;
use crate::engine::arrival::detect_arrivals;
use crate::error::AppError;
use crate::models::location::{GeoPoint, LocationSample, TrackReceipt};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/location/track", post(track_location))
}

async fn track_location(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    ApiJson(position): ApiJson<GeoPoint>,
) -> Result<Json<TrackReceipt>, AppError> {
    if !position.is_valid() {
        return Err(AppError::BadRequest("coordinates are out of range".to_string()));
    }

    let now = Utc::now().timestamp();
    let sample = LocationSample {
        id: Uuid::new_v4(),
        delivery_person_id: auth.delivery_person_id,
        position,
        timestamp: now,
    };
    state.location_samples.insert(sample.id, sample);
    state.metrics.location_samples_total.inc();

    let arrived = detect_arrivals(&state, auth.delivery_person_id, &position, now);

    debug!(
        delivery_person_id = %auth.delivery_person_id,
        latitude = position.latitude,
        longitude = position.longitude,
        updated_orders = arrived.len(),
        "location tracked"
    );

    Ok(Json(TrackReceipt {
        message: "Location tracked successfully".to_string(),
        timestamp: now,
        updated_orders: arrived.len(),
    }))
}
