use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events fanned out to connected courier devices and dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    OfferSent {
        order_id: Uuid,
        courier_id: Uuid,
        expires_in_secs: u64,
    },
    OrderConfirmed {
        order_id: Uuid,
        courier_id: Uuid,
    },
    OrderCanceled {
        order_id: Uuid,
    },
    CourierRemoved {
        order_id: Uuid,
        courier_id: Uuid,
    },
}

/// Signals pushed by a courier device over the persistent connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceSignal {
    Decision {
        order_id: Uuid,
        courier_id: Uuid,
        accepted: bool,
    },
    Arrived {
        order_id: Uuid,
    },
}
