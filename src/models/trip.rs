use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TripStatus {
    Active,
    Canceled,
    Completed,
}

/// Transport-level association created when an order is confirmed. The
/// watchdog cancels it best-effort when a courier is removed for a no-show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(order_id: Uuid, courier_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            courier_id,
            status: TripStatus::Active,
            created_at: Utc::now(),
        }
    }
}
