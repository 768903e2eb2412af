use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::dispatch::DispatchEngine;
use crate::models::event::DispatchEvent;
use crate::observability::metrics::Metrics;
use crate::stores::memory::{BroadcastNotifier, InMemoryDirectory, InMemoryOrders, InMemoryTrips};

pub struct AppState {
    pub directory: Arc<InMemoryDirectory>,
    pub orders: Arc<InMemoryOrders>,
    pub trips: Arc<InMemoryTrips>,
    pub engine: Arc<DispatchEngine>,
    pub dispatch_tx: mpsc::Sender<Uuid>,
    pub events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<Uuid>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.order_queue_size);
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        let metrics = Metrics::new();
        let directory = Arc::new(InMemoryDirectory::new());
        let orders = Arc::new(InMemoryOrders::new());
        let trips = Arc::new(InMemoryTrips::new());
        let notifier = Arc::new(BroadcastNotifier::new(
            events_tx.clone(),
            config.dispatch.offer_timeout,
        ));

        let engine = DispatchEngine::new(
            directory.clone(),
            orders.clone(),
            trips.clone(),
            notifier,
            config.dispatch.clone(),
            metrics.clone(),
        );

        (
            Self {
                directory,
                orders,
                trips,
                engine,
                dispatch_tx,
                events_tx,
                metrics,
            },
            dispatch_rx,
        )
    }
}
