use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

struct Watchdog {
    handle: JoinHandle<()>,
    armed_at: Instant,
    deadline: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchdogStatus {
    pub order_id: Uuid,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
}

/// One arrival timer per order. Arming for an order that already has a
/// watchdog supersedes the old one.
#[derive(Default)]
pub struct Watchdogs {
    entries: DashMap<Uuid, Watchdog>,
}

impl Watchdogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, order_id: Uuid, deadline: Duration, handle: JoinHandle<()>) {
        let prior = self.entries.insert(
            order_id,
            Watchdog {
                handle,
                armed_at: Instant::now(),
                deadline,
            },
        );
        if let Some(prior) = prior {
            prior.handle.abort();
        }
    }

    /// Cancel the timer, e.g. because the courier confirmed arrival.
    pub fn disarm(&self, order_id: Uuid) -> bool {
        match self.entries.remove(&order_id) {
            Some((_, watchdog)) => {
                watchdog.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop the entry without aborting. Called by the timer task itself when
    /// it fires.
    pub fn complete(&self, order_id: Uuid) {
        self.entries.remove(&order_id);
    }

    pub fn list_active(&self) -> Vec<WatchdogStatus> {
        self.entries
            .iter()
            .map(|entry| {
                let elapsed = entry.value().armed_at.elapsed();
                WatchdogStatus {
                    order_id: *entry.key(),
                    elapsed_secs: elapsed.as_secs(),
                    remaining_secs: entry.value().deadline.saturating_sub(elapsed).as_secs(),
                }
            })
            .collect()
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

    use super::Watchdogs;

    #[tokio::test]
    async fn arming_twice_supersedes_the_first_timer() {
        let watchdogs = Watchdogs::new();
        let order_id = Uuid::new_v4();

        let first = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        watchdogs.arm(order_id, Duration::from_secs(60), first);

        let second = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        watchdogs.arm(order_id, Duration::from_secs(60), second);

        assert_eq!(watchdogs.len(), 1);
    }

    #[tokio::test]
    async fn disarm_aborts_and_removes() {
        let watchdogs = Watchdogs::new();
        let order_id = Uuid::new_v4();

        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        watchdogs.arm(order_id, Duration::from_secs(60), handle);

        assert!(watchdogs.disarm(order_id));
        assert!(!watchdogs.disarm(order_id));
        assert!(watchdogs.is_empty());
    }

    #[tokio::test]
    async fn list_active_reports_elapsed_and_remaining() {
        let watchdogs = Watchdogs::new();
        let order_id = Uuid::new_v4();

        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        watchdogs.arm(order_id, Duration::from_secs(60), handle);

        let active = watchdogs.list_active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].order_id, order_id);
        assert!(active[0].remaining_secs <= 60);
    }
}
