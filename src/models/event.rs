use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::delivery_person::AvailabilityStatus;
use crate::models::order::OrderStatus;

/// Pushed to `/ws` subscribers whenever an order or an account changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryEvent {
    OrderStatusChanged {
        order_id: Uuid,
        delivery_person_id: Option<Uuid>,
        status: OrderStatus,
        at: i64,
    },
    AvailabilityChanged {
        delivery_person_id: Uuid,
        status: AvailabilityStatus,
        is_location_on: bool,
        at: i64,
    },
}

impl DeliveryEvent {
    pub fn delivery_person_id(&self) -> Option<Uuid> {
        match self {
            DeliveryEvent::OrderStatusChanged {
                delivery_person_id, ..
            } => *delivery_person_id,
            DeliveryEvent::AvailabilityChanged {
                delivery_person_id, ..
            } => Some(*delivery_person_id),
        }
    }
}
