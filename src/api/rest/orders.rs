use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::auth::Authenticated;
use crate::engine::lifecycle::{apply_transition, check_transition};
use crate::engine::stats::delivered_counts;
use crate::error::AppError;
use crate::models::delivery_person::is_valid_phone;
use crate::models::event::DeliveryEvent;
use crate::models::location::GeoPoint;
use crate::models::order::{
    one_or_many, CompletionReceipt, Order, OrderStats, OrderStatus, OrderView, StatusUpdateReceipt,
};
use crate::state::AppState;

const CURRENT_ORDERS_LIMIT: usize = 100;
const RECENT_WINDOW_SECS: i64 = 24 * 60 * 60;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders/current", get(current_orders))
        .route("/orders/recent", get(recent_orders))
        .route("/orders/:id/status", patch(update_order_status))
        .route("/orders/:id/complete", post(complete_order))
        .route("/stats/orders", get(order_stats))
        .route("/admin/orders", post(create_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_phone: u64,
    pub delivery_address: String,
    #[serde(deserialize_with = "one_or_many")]
    pub items: Vec<String>,
    #[serde(default)]
    pub delivery_person_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: OrderStatus,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> Result<Json<OrderView>, AppError> {
    if payload.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest("customer_name cannot be empty".to_string()));
    }
    if payload.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest("delivery_address cannot be empty".to_string()));
    }
    if !is_valid_phone(payload.customer_phone) {
        return Err(AppError::BadRequest(
            "Phone number must be exactly 12 digits".to_string(),
        ));
    }

    let destination = GeoPoint::new(payload.latitude, payload.longitude);
    if !destination.is_valid() {
        return Err(AppError::BadRequest("coordinates are out of range".to_string()));
    }

    if let Some(delivery_person_id) = payload.delivery_person_id {
        let person = state
            .delivery_persons
            .get(&delivery_person_id)
            .ok_or_else(|| AppError::NotFound("Delivery person not found".to_string()))?;

        if !person.status.is_active() {
            return Err(AppError::BadRequest(
                "Delivery person is inactive and cannot be assigned orders".to_string(),
            ));
        }
    }

    let order = Order {
        id: Uuid::new_v4(),
        customer_name: payload.customer_name,
        customer_phone: payload.customer_phone,
        delivery_address: payload.delivery_address,
        items: payload.items,
        status: OrderStatus::Pending,
        delivery_person_id: payload.delivery_person_id,
        destination,
        proof_image: None,
        created_at: Utc::now().timestamp(),
        delivered_at: None,
    };

    let view = OrderView::from(&order);
    state.orders.insert(order.id, order);

    info!(order_id = %view.id, delivery_person_id = ?view.delivery_person_id, "order created");
    Ok(Json(view))
}

async fn current_orders(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
) -> Json<Vec<OrderView>> {
    let mut orders = orders_of(&state, auth.delivery_person_id, |order| order.status.is_current());
    orders.truncate(CURRENT_ORDERS_LIMIT);

    Json(orders)
}

async fn recent_orders(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
) -> Json<Vec<OrderView>> {
    let cutoff = Utc::now().timestamp() - RECENT_WINDOW_SECS;
    let orders = orders_of(&state, auth.delivery_person_id, |order| {
        order.status == OrderStatus::Delivered
            && order.delivered_at.is_some_and(|delivered_at| delivered_at >= cutoff)
    });

    Json(orders)
}

/// Orders assigned to `delivery_person_id` matching `keep`, oldest first.
fn orders_of(
    state: &AppState,
    delivery_person_id: Uuid,
    keep: impl Fn(&Order) -> bool,
) -> Vec<OrderView> {
    let mut orders: Vec<OrderView> = state
        .orders
        .iter()
        .filter(|entry| entry.value().is_assigned_to(delivery_person_id) && keep(entry.value()))
        .map(|entry| OrderView::from(entry.value()))
        .collect();
    orders.sort_by_key(|order| (order.created_at, order.id));
    orders
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<StatusUpdateReceipt>, AppError> {
    let now = Utc::now().timestamp();

    let view = {
        let mut order = owned_order_mut(&state, id, auth.delivery_person_id)?;
        apply_transition(order.value_mut(), query.status, now)?;
        OrderView::from(order.value())
    };

    record_transition(&state, &view, now);
    Ok(Json(StatusUpdateReceipt {
        message: "Order status updated successfully".to_string(),
        order: view,
    }))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    auth: Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<CompletionReceipt>, AppError> {
    {
        let order = owned_order_mut(&state, id, auth.delivery_person_id)?;
        check_transition(order.status, OrderStatus::Delivered).map_err(|_| {
            AppError::BadRequest("Order must be 'reached' before completion".to_string())
        })?;
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(format!("failed to read file: {err}")))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("file field is required".to_string()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("uploaded file is empty".to_string()));
    }

    let now = Utc::now().timestamp();
    let stored_name = format!("{id}_{now}.{}", file_extension(file_name.as_deref()));
    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|err| AppError::Internal(format!("failed to prepare upload dir: {err}")))?;
    let stored_path = state.upload_dir.join(&stored_name);
    tokio::fs::write(&stored_path, &bytes)
        .await
        .map_err(|err| AppError::Internal(format!("failed to store proof image: {err}")))?;

    let proof_image = format!("/uploads/{stored_name}");
    let view = deliver_with_proof(
        &state,
        id,
        auth.delivery_person_id,
        &stored_path,
        &proof_image,
        now,
    )
    .await?;

    record_transition(&state, &view, now);
    Ok(Json(CompletionReceipt {
        message: "Order completed successfully".to_string(),
        proof_image,
    }))
}

/// Marks the order delivered with the stored proof attached. The order may
/// have moved since the upload started; the stored file is removed when the
/// transition is refused.
async fn deliver_with_proof(
    state: &AppState,
    id: Uuid,
    delivery_person_id: Uuid,
    stored_path: &FsPath,
    proof_image: &str,
    now: i64,
) -> Result<OrderView, AppError> {
    let delivered = owned_order_mut(state, id, delivery_person_id).and_then(|mut order| {
        apply_transition(order.value_mut(), OrderStatus::Delivered, now)?;
        order.proof_image = Some(proof_image.to_string());
        Ok(OrderView::from(order.value()))
    });

    if delivered.is_err() {
        if let Err(err) = tokio::fs::remove_file(stored_path).await {
            warn!(error = %err, path = %stored_path.display(), "failed to remove orphaned proof image");
        }
    }

    delivered
}

async fn order_stats(State(state): State<Arc<AppState>>, auth: Authenticated) -> Json<OrderStats> {
    Json(delivered_counts(&state, auth.delivery_person_id, Utc::now()))
}

/// Looks up an order the caller is assigned to. Orders of other delivery
/// persons are reported as missing.
fn owned_order_mut(
    state: &AppState,
    id: Uuid,
    delivery_person_id: Uuid,
) -> Result<dashmap::mapref::one::RefMut<'_, Uuid, Order>, AppError> {
    state
        .orders
        .get_mut(&id)
        .filter(|order| order.is_assigned_to(delivery_person_id))
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

fn record_transition(state: &AppState, order: &OrderView, now: i64) {
    state
        .metrics
        .order_transitions_total
        .with_label_values(&[order.status.as_str()])
        .inc();
    state.publish(DeliveryEvent::OrderStatusChanged {
        order_id: order.id,
        delivery_person_id: order.delivery_person_id,
        status: order.status,
        at: now,
    });

    info!(order_id = %order.id, status = %order.status, "order status updated");
}

fn file_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}
