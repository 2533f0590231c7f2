use crate::error::TransitionError;
use crate::models::order::{Order, OrderStatus};

/// Server-side legality of `from -> to`.
///
/// Statuses only move forward along `pending -> in_transit -> reached ->
/// delivered`, or sideways into `cancelled` from any non-terminal status.
/// `delivered` additionally requires `reached`, so a proof upload can never
/// skip arrival.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), TransitionError> {
    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }

    if from == to {
        return Err(TransitionError::Duplicate(from));
    }

    match to {
        OrderStatus::Cancelled => Ok(()),
        OrderStatus::Delivered if from != OrderStatus::Reached => Err(TransitionError::NotReached),
        _ => match (from.happy_path_rank(), to.happy_path_rank()) {
            (Some(current), Some(next)) if next > current => Ok(()),
            _ => Err(TransitionError::Backwards { from, to }),
        },
    }
}

/// Moves `order` to `to`, stamping `delivered_at` when it is delivered.
pub fn apply_transition(order: &mut Order, to: OrderStatus, now: i64) -> Result<(), TransitionError> {
    check_transition(order.status, to)?;

    order.status = to;
    if to == OrderStatus::Delivered {
        order.delivered_at = Some(now);
    }

    Ok(())
}
