pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::models::trip::Trip;

/// Read access to the courier pool, plus the one field the dispatch engine
/// is allowed to write: availability.
#[async_trait]
pub trait CourierDirectory: Send + Sync {
    /// Couriers with `approved && available`.
    async fn find_eligible(&self) -> Result<Vec<Courier>, DispatchError>;
    async fn get(&self, id: Uuid) -> Result<Option<Courier>, DispatchError>;
    async fn set_availability(&self, id: Uuid, available: bool) -> Result<(), DispatchError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, DispatchError>;
    async fn save(&self, order: &Order) -> Result<(), DispatchError>;
}

#[async_trait]
pub trait TripStore: Send + Sync {
    async fn create(&self, trip: &Trip) -> Result<(), DispatchError>;
    async fn cancel(&self, trip_id: Uuid) -> Result<(), DispatchError>;
}

/// Outbound notification channel. Delivery is fire-and-forget; the courier's
/// answer comes back out of band through the decision signal, never through
/// these calls.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn offer_delivery(&self, courier_id: Uuid, order: &Order) -> Result<(), DispatchError>;
    async fn order_confirmed(&self, order_id: Uuid, courier_id: Uuid)
        -> Result<(), DispatchError>;
    async fn order_canceled(&self, order_id: Uuid) -> Result<(), DispatchError>;
    async fn courier_removed(&self, courier_id: Uuid, order_id: Uuid)
        -> Result<(), DispatchError>;
}
