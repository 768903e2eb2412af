use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use crate::engine::dispatch::DispatchEngine;

/// Periodic sweep over the pending-offer table. The offer timeout normally
/// resolves every entry; the janitor is the backstop that reclaims anything
/// whose waiter is gone, so no entry can leak forever.
pub fn spawn_janitor(engine: Arc<DispatchEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(engine.settings.janitor_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let reclaimed = engine
                .offers
                .reclaim_older_than(engine.settings.stale_offer_max_age);
            for (order_id, courier_id) in &reclaimed {
                warn!(%order_id, %courier_id, "reclaimed stale pending offer");
            }
            if !reclaimed.is_empty() {
                engine
                    .metrics
                    .stale_offers_reclaimed
                    .inc_by(reclaimed.len() as u64);
            }
        }
    })
}
