use tracing::info;
use uuid::Uuid;

use crate::engine::lifecycle::apply_transition;
use crate::geo::haversine_m;
use crate::models::event::DeliveryEvent;
use crate::models::location::GeoPoint;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Marks every open order of `delivery_person_id` whose destination lies
/// within the arrival radius of `position` as `reached`. Returns the orders
/// that moved.
pub fn detect_arrivals(
    state: &AppState,
    delivery_person_id: Uuid,
    position: &GeoPoint,
    now: i64,
) -> Vec<Order> {
    let mut arrived = Vec::new();

    for mut entry in state.orders.iter_mut() {
        let order = entry.value_mut();
        let awaiting_arrival = matches!(order.status, OrderStatus::Pending | OrderStatus::InTransit);
        if !order.is_assigned_to(delivery_person_id) || !awaiting_arrival {
            continue;
        }

        let distance_m = haversine_m(position, &order.destination);
        if distance_m > state.arrival_radius_meters {
            continue;
        }

        if apply_transition(order, OrderStatus::Reached, now).is_ok() {
            info!(
                order_id = %order.id,
                delivery_person_id = %delivery_person_id,
                distance_m,
                "order reached"
            );
            arrived.push(order.clone());
        }
    }

    for order in &arrived {
        state.metrics.arrivals_detected_total.inc();
        state
            .metrics
            .order_transitions_total
            .with_label_values(&[OrderStatus::Reached.as_str()])
            .inc();
        state.publish(DeliveryEvent::OrderStatusChanged {
            order_id: order.id,
            delivery_person_id: order.delivery_person_id,
            status: order.status,
            at: now,
        });
    }

    arrived
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::detect_arrivals;
    use crate::config::Config;
    use crate::models::location::GeoPoint;
    use crate::models::order::{Order, OrderStatus};
    use crate::state::AppState;

    const DESTINATION: GeoPoint = GeoPoint {
        latitude: 12.9716,
        longitude: 77.5946,
    };

    fn order(delivery_person_id: Option<Uuid>, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_name: "John Doe".to_string(),
            customer_phone: 919988776655,
            delivery_address: "MG Road, Bangalore".to_string(),
            items: vec!["Pizza".to_string(), "Coke".to_string()],
            status,
            delivery_person_id,
            destination: DESTINATION,
            proof_image: None,
            created_at: 1_700_000_000,
            delivered_at: None,
        }
    }

    fn state_with(orders: Vec<Order>) -> AppState {
        let state = AppState::new(&Config::default());
        for order in orders {
            state.orders.insert(order.id, order);
        }
        state
    }

    #[test]
    fn nearby_in_transit_order_is_reached() {
        let courier = Uuid::new_v4();
        let in_transit = order(Some(courier), OrderStatus::InTransit);
        let id = in_transit.id;
        let state = state_with(vec![in_transit]);

        let arrived = detect_arrivals(&state, courier, &GeoPoint::new(12.97165, 77.59465), 42);

        assert_eq!(arrived.len(), 1);
        assert_eq!(state.orders.get(&id).unwrap().status, OrderStatus::Reached);
    }

    #[test]
    fn far_away_sample_changes_nothing() {
        let courier = Uuid::new_v4();
        let in_transit = order(Some(courier), OrderStatus::InTransit);
        let id = in_transit.id;
        let state = state_with(vec![in_transit]);

        let arrived = detect_arrivals(&state, courier, &GeoPoint::new(12.9800, 77.6000), 42);

        assert!(arrived.is_empty());
        assert_eq!(state.orders.get(&id).unwrap().status, OrderStatus::InTransit);
    }

    #[test]
    fn other_couriers_and_finished_orders_are_ignored() {
        let courier = Uuid::new_v4();
        let someone_else = order(Some(Uuid::new_v4()), OrderStatus::InTransit);
        let delivered = order(Some(courier), OrderStatus::Delivered);
        let unassigned = order(None, OrderStatus::Pending);
        let state = state_with(vec![someone_else, delivered, unassigned]);

        let arrived = detect_arrivals(&state, courier, &DESTINATION, 42);

        assert!(arrived.is_empty());
    }

    #[test]
    fn pending_order_can_be_reached_directly() {
        let courier = Uuid::new_v4();
        let pending = order(Some(courier), OrderStatus::Pending);
        let state = state_with(vec![pending]);

        let arrived = detect_arrivals(&state, courier, &DESTINATION, 42);

        assert_eq!(arrived.len(), 1);
        assert_eq!(arrived[0].status, OrderStatus::Reached);
    }
}
