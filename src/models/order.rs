use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InTransit,
    Reached,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::InTransit,
        OrderStatus::Reached,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Reached => "reached",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Still on a delivery person's plate: listed by `/orders/current`.
    pub fn is_current(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::InTransit | OrderStatus::Reached
        )
    }

    /// Position on the happy path. `Cancelled` sits outside it.
    pub fn happy_path_rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::InTransit => Some(1),
            OrderStatus::Reached => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| format!("unknown order status '{raw}'"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: u64,
    pub delivery_address: String,
    pub items: Vec<String>,
    pub status: OrderStatus,
    pub delivery_person_id: Option<Uuid>,
    pub destination: GeoPoint,
    pub proof_image: Option<String>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
}

impl Order {
    pub fn is_assigned_to(&self, delivery_person_id: Uuid) -> bool {
        self.delivery_person_id == Some(delivery_person_id)
    }
}

/// Wire form of an order: coordinates are flattened into `latitude` and
/// `longitude`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: u64,
    pub delivery_address: String,
    pub items: Vec<String>,
    pub status: OrderStatus,
    pub delivery_person_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub proof_image: Option<String>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone,
            delivery_address: order.delivery_address.clone(),
            items: order.items.clone(),
            status: order.status,
            delivery_person_id: order.delivery_person_id,
            latitude: order.destination.latitude,
            longitude: order.destination.longitude,
            proof_image: order.proof_image.clone(),
            created_at: order.created_at,
            delivered_at: order.delivered_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub today: usize,
    pub this_week: usize,
    pub this_month: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateReceipt {
    pub message: String,
    pub order: OrderView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub message: String,
    pub proof_image: String,
}

/// Accepts either a JSON list of strings or a single bare string.
pub fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Items {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Items::deserialize(deserializer)? {
        Items::One(item) => vec![item],
        Items::Many(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn in_transit_serializes_as_snake_case() {
        let json = serde_json::to_string(&OrderStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
    }

    #[test]
    fn only_delivered_and_cancelled_are_terminal() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Delivered, OrderStatus::Cancelled]);
    }

    #[test]
    fn single_item_string_becomes_a_list() {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(deserialize_with = "one_or_many")]
            items: Vec<String>,
        }

        let single: Payload = serde_json::from_str(r#"{"items":"Pizza"}"#).unwrap();
        assert_eq!(single.items, vec!["Pizza".to_string()]);

        let many: Payload = serde_json::from_str(r#"{"items":["Pizza","Coke"]}"#).unwrap();
        assert_eq!(many.items.len(), 2);
    }
}
