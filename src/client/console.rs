//! Order console: the client's view of the assigned orders and the single
//! forward action offered for each of them.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::client::api::ProofImage;
use crate::client::error::ClientError;
use crate::client::session::Session;
use crate::models::order::{CompletionReceipt, OrderStats, OrderStatus, OrderView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(&self, order: &OrderView) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => order.status == *status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "all" {
            return Ok(StatusFilter::All);
        }
        raw.parse().map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => status.fmt(f),
        }
    }
}

/// The one forward step a delivery person can take on an order. `in_transit`
/// has no action: it moves to `reached` when the server detects arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    StartDelivery,
    CompleteDelivery,
}

impl OrderAction {
    pub fn for_status(status: OrderStatus) -> Option<Self> {
        match status {
            OrderStatus::Pending => Some(OrderAction::StartDelivery),
            OrderStatus::Reached => Some(OrderAction::CompleteDelivery),
            _ => None,
        }
    }

    pub fn target(self) -> OrderStatus {
        match self {
            OrderAction::StartDelivery => OrderStatus::InTransit,
            OrderAction::CompleteDelivery => OrderStatus::Delivered,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderAction::StartDelivery => "Start Delivery",
            OrderAction::CompleteDelivery => "Complete Delivery",
        }
    }

    /// Completion goes through the proof upload, not the status endpoint.
    pub fn needs_proof(self) -> bool {
        matches!(self, OrderAction::CompleteDelivery)
    }
}

pub fn next_action(order: &OrderView) -> Option<OrderAction> {
    OrderAction::for_status(order.status)
}

pub struct OrderConsole {
    session: Arc<Session>,
    orders: RwLock<Vec<OrderView>>,
}

impl OrderConsole {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            orders: RwLock::new(Vec::new()),
        }
    }

    /// Refetches the current orders, replacing the cached list wholesale.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let fetched = self
            .session
            .api()
            .current_orders(self.session.token())
            .await?;
        let count = fetched.len();
        *self.orders.write().await = fetched;

        Ok(count)
    }

    pub async fn orders(&self) -> Vec<OrderView> {
        self.orders.read().await.clone()
    }

    pub async fn filtered(&self, filter: StatusFilter) -> Vec<OrderView> {
        self.orders
            .read()
            .await
            .iter()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect()
    }

    /// Orders paired with their next action. An inactive account gets none.
    pub async fn actionable(&self) -> Vec<(OrderView, OrderAction)> {
        if !self.session.is_active() {
            return Vec::new();
        }

        self.orders
            .read()
            .await
            .iter()
            .filter_map(|order| next_action(order).map(|action| (order.clone(), action)))
            .collect()
    }

    /// Sends the transition as asked; the server decides whether it is legal.
    /// The list is refetched only after a successful update.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, ClientError> {
        let order = self
            .session
            .api()
            .update_order_status(self.session.token(), order_id, status)
            .await?;
        info!(%order_id, status = %order.status, "order status updated");

        self.refresh().await?;
        Ok(order)
    }

    pub async fn complete_delivery(
        &self,
        order_id: Uuid,
        proof: ProofImage,
    ) -> Result<CompletionReceipt, ClientError> {
        let receipt = self
            .session
            .api()
            .complete_order(self.session.token(), order_id, proof)
            .await?;
        info!(%order_id, proof_image = %receipt.proof_image, "delivery completed");

        self.refresh().await?;
        Ok(receipt)
    }

    pub async fn stats(&self) -> Result<OrderStats, ClientError> {
        self.session.api().order_stats(self.session.token()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> OrderView {
        OrderView {
            id: Uuid::new_v4(),
            customer_name: "Asha".to_string(),
            customer_phone: 919_876_543_210,
            delivery_address: "12 MG Road".to_string(),
            items: vec!["Biryani".to_string()],
            status,
            delivery_person_id: None,
            latitude: 12.9716,
            longitude: 77.5946,
            proof_image: None,
            created_at: 1_700_000_000,
            delivered_at: None,
        }
    }

    #[test]
    fn all_filter_keeps_every_order() {
        let orders: Vec<_> = OrderStatus::ALL.into_iter().map(order).collect();
        let kept = orders
            .iter()
            .filter(|order| StatusFilter::All.matches(order))
            .count();
        assert_eq!(kept, orders.len());
    }

    #[test]
    fn status_filter_is_an_exact_match() {
        let filter: StatusFilter = "in_transit".parse().unwrap();
        assert_eq!(filter, StatusFilter::Only(OrderStatus::InTransit));
        assert!(filter.matches(&order(OrderStatus::InTransit)));
        assert!(!filter.matches(&order(OrderStatus::Pending)));
        assert!(!filter.matches(&order(OrderStatus::Reached)));
    }

    #[test]
    fn unknown_filter_is_rejected() {
        assert!("In Transit".parse::<StatusFilter>().is_err());
        assert_eq!("all".parse::<StatusFilter>(), Ok(StatusFilter::All));
    }

    #[test]
    fn only_pending_and_reached_offer_an_action() {
        assert_eq!(
            next_action(&order(OrderStatus::Pending)),
            Some(OrderAction::StartDelivery)
        );
        assert_eq!(
            next_action(&order(OrderStatus::Reached)),
            Some(OrderAction::CompleteDelivery)
        );
        assert_eq!(next_action(&order(OrderStatus::InTransit)), None);
        assert_eq!(next_action(&order(OrderStatus::Delivered)), None);
        assert_eq!(next_action(&order(OrderStatus::Cancelled)), None);
    }

    #[test]
    fn actions_move_one_step_forward() {
        assert_eq!(OrderAction::StartDelivery.target(), OrderStatus::InTransit);
        assert_eq!(OrderAction::CompleteDelivery.target(), OrderStatus::Delivered);
        assert!(OrderAction::CompleteDelivery.needs_proof());
        assert!(!OrderAction::StartDelivery.needs_proof());
    }
}
