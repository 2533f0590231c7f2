use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password_blocking, verify_password_blocking};
use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::auth::Authenticated;
use crate::error::AppError;
use crate::models::delivery_person::{
    is_valid_phone, normalize_email, AvailabilityStatus, DeliveryPerson, DeliveryPersonView,
    LoginResponse,
};
use crate::models::event::DeliveryEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/delivery-person/status", patch(update_availability))
        .route("/delivery-person/location-status", patch(update_location_status))
        .route("/admin/delivery-persons", get(list_delivery_persons))
        .route("/admin/delivery-persons/:id", get(get_delivery_person))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: u64,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub status: AvailabilityStatus,
}

#[derive(Deserialize)]
pub struct LocationStatusRequest {
    pub is_location_on: bool,
}

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<DeliveryPersonView>, AppError> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);

    if name.is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }
    if payload.password.is_empty() {
        return Err(AppError::BadRequest("password cannot be empty".to_string()));
    }
    if !is_valid_phone(payload.phone) {
        return Err(AppError::BadRequest(
            "Phone number must be exactly 12 digits".to_string(),
        ));
    }

    let password_hash = hash_password_blocking(payload.password).await?;
    let id = Uuid::new_v4();

    match state.email_index.entry(email.clone()) {
        Entry::Occupied(_) => {
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }
        Entry::Vacant(slot) => {
            slot.insert(id);
        }
    }

    let phone_taken = match state.phone_index.entry(payload.phone) {
        Entry::Occupied(_) => true,
        Entry::Vacant(slot) => {
            slot.insert(id);
            false
        }
    };
    if phone_taken {
        state.email_index.remove(&email);
        return Err(AppError::BadRequest(
            "Phone number already registered".to_string(),
        ));
    }

    let person = DeliveryPerson {
        id,
        name,
        email,
        password_hash,
        phone: payload.phone,
        status: AvailabilityStatus::Inactive,
        is_location_on: false,
        created_at: Utc::now().timestamp(),
    };

    let view = DeliveryPersonView::from(&person);
    state.delivery_persons.insert(id, person);

    info!(delivery_person_id = %id, "delivery person registered");
    Ok(Json(view))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let id = state
        .email_index
        .get(&normalize_email(&payload.email))
        .map(|entry| *entry.value())
        .ok_or_else(invalid)?;

    let (password_hash, view) = {
        let person = state.delivery_persons.get(&id).ok_or_else(invalid)?;
        (person.password_hash.clone(), DeliveryPersonView::from(person.value()))
    };

    if !verify_password_blocking(payload.password, password_hash).await? {
        return Err(invalid());
    }

    let token = state.tokens.issue(id, Utc::now())?;

    info!(delivery_person_id = %id, "delivery person logged in");
    Ok(Json(LoginResponse {
        token,
        delivery_person: view,
    }))
}

async fn logout(State(state): State<Arc<AppState>>, auth: Authenticated) -> Json<Value> {
    state.revoke_token(auth.token, auth.expires_at);

    info!(delivery_person_id = %auth.delivery_person_id, "token revoked");
    Json(json!({ "message": "Successfully logged out" }))
}

async fn profile(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
) -> Result<Json<DeliveryPersonView>, AppError> {
    let person = state
        .delivery_persons
        .get(&auth.delivery_person_id)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(DeliveryPersonView::from(person.value())))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    ApiJson(payload): ApiJson<AvailabilityRequest>,
) -> Result<Json<DeliveryPersonView>, AppError> {
    let view = update_person(&state, auth.delivery_person_id, |person| {
        person.status = payload.status;
    })?;
    state.refresh_active_gauge();

    info!(
        delivery_person_id = %view.id,
        status = %view.status,
        "availability updated"
    );
    Ok(Json(view))
}

async fn update_location_status(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    ApiJson(payload): ApiJson<LocationStatusRequest>,
) -> Result<Json<DeliveryPersonView>, AppError> {
    let view = update_person(&state, auth.delivery_person_id, |person| {
        person.is_location_on = payload.is_location_on;
    })?;

    Ok(Json(view))
}

fn update_person(
    state: &AppState,
    id: Uuid,
    change: impl FnOnce(&mut DeliveryPerson),
) -> Result<DeliveryPersonView, AppError> {
    let view = {
        let mut person = state
            .delivery_persons
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        change(person.value_mut());
        DeliveryPersonView::from(person.value())
    };

    state.publish(DeliveryEvent::AvailabilityChanged {
        delivery_person_id: view.id,
        status: view.status,
        is_location_on: view.is_location_on,
        at: Utc::now().timestamp(),
    });

    Ok(view)
}

async fn list_delivery_persons(State(state): State<Arc<AppState>>) -> Json<Vec<DeliveryPersonView>> {
    let mut persons: Vec<DeliveryPersonView> = state
        .delivery_persons
        .iter()
        .map(|entry| DeliveryPersonView::from(entry.value()))
        .collect();
    persons.sort_by_key(|person| person.created_at);

    Json(persons)
}

async fn get_delivery_person(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeliveryPersonView>, AppError> {
    let person = state
        .delivery_persons
        .get(&id)
        .ok_or_else(|| AppError::NotFound("Delivery person not found".to_string()))?;

    Ok(Json(DeliveryPersonView::from(person.value())))
}
