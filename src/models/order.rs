use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DispatchStatus {
    Searching,
    Confirmed,
    Canceled,
}

/// Assignment-progress sub-record. The dispatch engine owns and mutates
/// this exclusively; the rest of the order (items, pricing) lives with the
/// order-management side of the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRecord {
    /// Remaining candidate courier ids, ranked, consumed head-first.
    pub candidates: Vec<Uuid>,
    /// Couriers permanently excluded from this order.
    pub blacklist: Vec<Uuid>,
    pub status: DispatchStatus,
    pub courier_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Default for DispatchRecord {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            blacklist: Vec::new(),
            status: DispatchStatus::Searching,
            courier_id: None,
            assigned_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub destination: GeoPoint,
    /// Set by the external arrival signal once the courier reaches pickup.
    pub arrived: bool,
    pub trip_id: Option<Uuid>,
    pub dispatch: DispatchRecord,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(destination: GeoPoint) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination,
            arrived: false,
            trip_id: None,
            dispatch: DispatchRecord::default(),
            created_at: Utc::now(),
        }
    }
}
