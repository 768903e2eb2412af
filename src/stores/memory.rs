use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::courier::Courier;
use crate::models::event::DispatchEvent;
use crate::models::order::Order;
use crate::models::trip::{Trip, TripStatus};
use crate::stores::{CourierDirectory, Notifier, OrderStore, TripStore};

/// In-memory courier directory backing the HTTP surface and the tests.
#[derive(Default)]
pub struct InMemoryDirectory {
    couriers: DashMap<Uuid, Courier>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    pub fn list(&self) -> Vec<Courier> {
        self.couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn update<F>(&self, id: Uuid, apply: F) -> Option<Courier>
    where
        F: FnOnce(&mut Courier),
    {
        let mut courier = self.couriers.get_mut(&id)?;
        apply(&mut courier);
        courier.last_seen_at = Utc::now();
        Some(courier.clone())
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }
}

#[async_trait]
impl CourierDirectory for InMemoryDirectory {
    async fn find_eligible(&self) -> Result<Vec<Courier>, DispatchError> {
        Ok(self
            .couriers
            .iter()
            .filter(|entry| entry.value().approved && entry.value().available)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Courier>, DispatchError> {
        Ok(self.couriers.get(&id).map(|entry| entry.value().clone()))
    }

    async fn set_availability(&self, id: Uuid, available: bool) -> Result<(), DispatchError> {
        let mut courier = self
            .couriers
            .get_mut(&id)
            .ok_or_else(|| DispatchError::NotFound(format!("courier {id} not found")))?;
        courier.available = available;
        courier.last_seen_at = Utc::now();
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    orders: DashMap<Uuid, Order>,
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get_cloned(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrders {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, DispatchError> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, order: &Order) -> Result<(), DispatchError> {
        self.orders.insert(order.id, order.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTrips {
    trips: DashMap<Uuid, Trip>,
}

impl InMemoryTrips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_cloned(&self, id: Uuid) -> Option<Trip> {
        self.trips.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

#[async_trait]
impl TripStore for InMemoryTrips {
    async fn create(&self, trip: &Trip) -> Result<(), DispatchError> {
        self.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn cancel(&self, trip_id: Uuid) -> Result<(), DispatchError> {
        let mut trip = self
            .trips
            .get_mut(&trip_id)
            .ok_or_else(|| DispatchError::NotFound(format!("trip {trip_id} not found")))?;
        trip.status = TripStatus::Canceled;
        Ok(())
    }
}

/// Notifier that fans dispatch events out over the broadcast channel the
/// websocket handler subscribes to. Having no connected receiver is not a
/// delivery failure.
pub struct BroadcastNotifier {
    events_tx: broadcast::Sender<DispatchEvent>,
    offer_timeout: Duration,
}

impl BroadcastNotifier {
    pub fn new(events_tx: broadcast::Sender<DispatchEvent>, offer_timeout: Duration) -> Self {
        Self {
            events_tx,
            offer_timeout,
        }
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn offer_delivery(&self, courier_id: Uuid, order: &Order) -> Result<(), DispatchError> {
        let _ = self.events_tx.send(DispatchEvent::OfferSent {
            order_id: order.id,
            courier_id,
            expires_in_secs: self.offer_timeout.as_secs(),
        });
        Ok(())
    }

    async fn order_confirmed(
        &self,
        order_id: Uuid,
        courier_id: Uuid,
    ) -> Result<(), DispatchError> {
        let _ = self.events_tx.send(DispatchEvent::OrderConfirmed {
            order_id,
            courier_id,
        });
        Ok(())
    }

    async fn order_canceled(&self, order_id: Uuid) -> Result<(), DispatchError> {
        let _ = self.events_tx.send(DispatchEvent::OrderCanceled { order_id });
        Ok(())
    }

    async fn courier_removed(
        &self,
        courier_id: Uuid,
        order_id: Uuid,
    ) -> Result<(), DispatchError> {
        let _ = self.events_tx.send(DispatchEvent::CourierRemoved {
            order_id,
            courier_id,
        });
        Ok(())
    }
}
