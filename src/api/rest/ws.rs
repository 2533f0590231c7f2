use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::rest::extract::ApiQuery;
use crate::models::event::DeliveryEvent;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct FeedFilter {
    pub delivery_person_id: Option<Uuid>,
}

impl FeedFilter {
    pub fn accepts(&self, event: &DeliveryEvent) -> bool {
        match self.delivery_person_id {
            Some(wanted) => event.delivery_person_id() == Some(wanted),
            None => true,
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ApiQuery(filter): ApiQuery<FeedFilter>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, filter: FeedFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.events_tx.subscribe());

    info!(delivery_person_id = ?filter.delivery_person_id, "websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(item) = events.next().await {
            let event = match item {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging; events dropped");
                    continue;
                }
            };

            if !filter.accepts(&event) {
                continue;
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::FeedFilter;
    use crate::models::delivery_person::AvailabilityStatus;
    use crate::models::event::DeliveryEvent;
    use crate::models::order::OrderStatus;

    fn order_event(delivery_person_id: Option<Uuid>) -> DeliveryEvent {
        DeliveryEvent::OrderStatusChanged {
            order_id: Uuid::new_v4(),
            delivery_person_id,
            status: OrderStatus::InTransit,
            at: 1_700_000_000,
        }
    }

    #[test]
    fn unfiltered_feed_accepts_everything() {
        let filter = FeedFilter::default();
        assert!(filter.accepts(&order_event(None)));
        assert!(filter.accepts(&order_event(Some(Uuid::new_v4()))));
    }

    #[test]
    fn filtered_feed_drops_other_delivery_persons() {
        let mine = Uuid::new_v4();
        let filter = FeedFilter {
            delivery_person_id: Some(mine),
        };

        assert!(filter.accepts(&order_event(Some(mine))));
        assert!(filter.accepts(&DeliveryEvent::AvailabilityChanged {
            delivery_person_id: mine,
            status: AvailabilityStatus::Active,
            is_location_on: true,
            at: 1_700_000_000,
        }));
        assert!(!filter.accepts(&order_event(Some(Uuid::new_v4()))));
        assert!(!filter.accepts(&order_event(None)));
    }
}
