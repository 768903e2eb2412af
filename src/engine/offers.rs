use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Accepted,
    Rejected,
    Expired,
}

impl OfferOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferOutcome::Accepted => "accepted",
            OfferOutcome::Rejected => "rejected",
            OfferOutcome::Expired => "expired",
        }
    }
}

struct PendingOffer {
    tx: oneshot::Sender<OfferOutcome>,
    opened_at: Instant,
}

/// Correlation table for outstanding offers, keyed by (order, courier).
/// The only shared mutable state crossed by the asynchronous decision
/// boundary; existence checks and inserts go through the map's entry API so
/// they are atomic.
#[derive(Default)]
pub struct PendingOffers {
    entries: DashMap<(Uuid, Uuid), PendingOffer>,
}

impl PendingOffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outstanding offer and hand back the receiver the dispatch
    /// run awaits. Fails if an offer for the same pair is already open.
    pub fn open(
        &self,
        order_id: Uuid,
        courier_id: Uuid,
    ) -> Result<oneshot::Receiver<OfferOutcome>, DispatchError> {
        match self.entries.entry((order_id, courier_id)) {
            Entry::Occupied(_) => Err(DispatchError::DuplicateOffer {
                order_id,
                courier_id,
            }),
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(PendingOffer {
                    tx,
                    opened_at: Instant::now(),
                });
                Ok(rx)
            }
        }
    }

    /// Complete an outstanding offer. Returns `false` when no entry matches,
    /// which makes late or duplicate decision signals safe no-ops.
    pub fn resolve(&self, order_id: Uuid, courier_id: Uuid, outcome: OfferOutcome) -> bool {
        match self.entries.remove(&(order_id, courier_id)) {
            Some((_, offer)) => {
                let _ = offer.tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop an entry without completing it. Used by the waiter itself when
    /// its timeout elapses or its notification send fails.
    pub fn abandon(&self, order_id: Uuid, courier_id: Uuid) {
        self.entries.remove(&(order_id, courier_id));
    }

    /// Force-resolve every entry older than `max_age` as rejected and return
    /// the reclaimed keys.
    pub fn reclaim_older_than(&self, max_age: Duration) -> Vec<(Uuid, Uuid)> {
        let stale: Vec<(Uuid, Uuid)> = self
            .entries
            .iter()
            .filter(|entry| entry.value().opened_at.elapsed() > max_age)
            .map(|entry| *entry.key())
            .collect();

        stale
            .into_iter()
            .filter(|(order_id, courier_id)| {
                self.resolve(*order_id, *courier_id, OfferOutcome::Rejected)
            })
            .collect()
    }

    pub fn contains(&self, order_id: Uuid, courier_id: Uuid) -> bool {
        self.entries.contains_key(&(order_id, courier_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::{OfferOutcome, PendingOffers};
    use crate::error::DispatchError;

    #[test]
    fn open_twice_for_same_pair_fails() {
        let offers = PendingOffers::new();
        let order_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();

        let _rx = offers.open(order_id, courier_id).unwrap();
        let second = offers.open(order_id, courier_id);

        assert!(matches!(
            second,
            Err(DispatchError::DuplicateOffer { .. })
        ));
        assert_eq!(offers.len(), 1);
    }

    #[tokio::test]
    async fn resolve_completes_the_receiver_once() {
        let offers = PendingOffers::new();
        let order_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();

        let rx = offers.open(order_id, courier_id).unwrap();
        assert!(offers.resolve(order_id, courier_id, OfferOutcome::Accepted));
        assert_eq!(rx.await.unwrap(), OfferOutcome::Accepted);

        // Second resolution finds nothing.
        assert!(!offers.resolve(order_id, courier_id, OfferOutcome::Rejected));
        assert!(offers.is_empty());
    }

    #[test]
    fn resolve_unknown_pair_is_a_noop() {
        let offers = PendingOffers::new();
        assert!(!offers.resolve(Uuid::new_v4(), Uuid::new_v4(), OfferOutcome::Accepted));
    }

    #[tokio::test]
    async fn reclaim_rejects_only_stale_entries() {
        let offers = PendingOffers::new();
        let stale_order = Uuid::new_v4();
        let stale_courier = Uuid::new_v4();
        let rx = offers.open(stale_order, stale_courier).unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let fresh_order = Uuid::new_v4();
        let _fresh_rx = offers.open(fresh_order, Uuid::new_v4()).unwrap();

        let reclaimed = offers.reclaim_older_than(Duration::from_millis(20));

        assert_eq!(reclaimed, vec![(stale_order, stale_courier)]);
        assert_eq!(rx.await.unwrap(), OfferOutcome::Rejected);
        assert_eq!(offers.len(), 1);
    }
}
