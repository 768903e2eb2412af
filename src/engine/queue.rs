use crate::error::DispatchError;
use crate::models::order::Order;
use crate::state::AppState;

pub async fn enqueue_order(state: &AppState, order: &Order) -> Result<(), DispatchError> {
    state
        .dispatch_tx
        .send(order.id)
        .await
        .map_err(|err| DispatchError::Internal(format!("order queue send failed: {err}")))?;

    state.metrics.orders_in_queue.inc();
    Ok(())
}
