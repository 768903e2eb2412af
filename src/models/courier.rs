use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A delivery worker as seen by the dispatch engine. The courier directory
/// owns the record; the engine only reads it, apart from clearing
/// `available` when an order is bound and restoring it when a no-show
/// courier is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub available: bool,
    pub approved: bool,
    pub score: f64,
    pub last_seen_at: DateTime<Utc>,
}
