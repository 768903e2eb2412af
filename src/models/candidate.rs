use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Selector output: one eligible courier with its computed placement
/// against the order destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub courier_id: Uuid,
    pub available: bool,
    pub score: f64,
    pub distance_m: f64,
    pub eta_minutes: u64,
}
