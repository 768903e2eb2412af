use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::DispatchSettings;
use crate::engine::offers::{OfferOutcome, PendingOffers};
use crate::engine::selection::select_candidates;
use crate::engine::watchdog::{WatchdogStatus, Watchdogs};
use crate::error::DispatchError;
use crate::models::candidate::RankedCandidate;
use crate::models::order::{DispatchStatus, Order};
use crate::models::trip::Trip;
use crate::observability::metrics::Metrics;
use crate::state::AppState;
use crate::stores::{CourierDirectory, Notifier, OrderStore, TripStore};

/// The dispatch engine: selects candidates for an order, walks them with
/// sequential time-boxed offers, binds the accepting courier, and watches
/// the arrival deadline. Pending offers and watchdog timers are process
/// local; a restart loses them and leaves affected orders without a live
/// timer.
pub struct DispatchEngine {
    directory: Arc<dyn CourierDirectory>,
    orders: Arc<dyn OrderStore>,
    trips: Arc<dyn TripStore>,
    notifier: Arc<dyn Notifier>,
    pub offers: PendingOffers,
    pub watchdogs: Watchdogs,
    pub settings: DispatchSettings,
    pub metrics: Metrics,
    self_ref: Weak<DispatchEngine>,
}

impl DispatchEngine {
    pub fn new(
        directory: Arc<dyn CourierDirectory>,
        orders: Arc<dyn OrderStore>,
        trips: Arc<dyn TripStore>,
        notifier: Arc<dyn Notifier>,
        settings: DispatchSettings,
        metrics: Metrics,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            directory,
            orders,
            trips,
            notifier,
            offers: PendingOffers::new(),
            watchdogs: Watchdogs::new(),
            settings,
            metrics,
            self_ref: self_ref.clone(),
        })
    }

    /// Entry point for a freshly created (or re-dispatched) order: rank the
    /// pool and walk the queue.
    pub async fn dispatch(&self, order_id: Uuid) -> Result<(), DispatchError> {
        let order = self.require_order(order_id).await?;
        let ranked =
            select_candidates(self.directory.as_ref(), &order.destination, &self.settings).await?;
        self.process_queue(order_id, ranked).await
    }

    /// Walk the ranked candidates head-first. No re-sorting mid-run; a
    /// candidate skipped for unavailability does not come back within the
    /// run. Per-candidate failures advance the queue, systemic store
    /// failures abort it.
    pub async fn process_queue(
        &self,
        order_id: Uuid,
        ranked: Vec<RankedCandidate>,
    ) -> Result<(), DispatchError> {
        let mut order = self.require_order(order_id).await?;
        if order.dispatch.status == DispatchStatus::Confirmed {
            debug!(%order_id, "order already confirmed; nothing to dispatch");
            return Ok(());
        }

        let mut queue: VecDeque<Uuid> = ranked.iter().map(|c| c.courier_id).collect();
        order.dispatch.status = DispatchStatus::Searching;
        order.dispatch.candidates = queue.iter().copied().collect();
        self.orders.save(&order).await?;

        while let Some(courier_id) = queue.pop_front() {
            let mut order = self.require_order(order_id).await?;
            if order.dispatch.status == DispatchStatus::Confirmed {
                return Ok(());
            }
            order.dispatch.candidates = queue.iter().copied().collect();
            self.orders.save(&order).await?;

            if order.dispatch.blacklist.contains(&courier_id) {
                debug!(%order_id, %courier_id, "skipping blacklisted courier");
                continue;
            }

            match self.try_candidate(&order, courier_id).await {
                Ok(true) => return Ok(()),
                Ok(false) => continue,
                Err(err) if err.is_systemic() => return Err(err),
                Err(DispatchError::DuplicateOffer { .. }) => {
                    // Should be unreachable while offers are opened only here.
                    error!(%order_id, %courier_id, "duplicate pending offer");
                    continue;
                }
                Err(err) => {
                    warn!(%order_id, %courier_id, error = %err, "candidate failed; moving on");
                    continue;
                }
            }
        }

        let mut order = self.require_order(order_id).await?;
        if order.dispatch.status == DispatchStatus::Confirmed {
            return Ok(());
        }
        order.dispatch.status = DispatchStatus::Canceled;
        order.dispatch.candidates.clear();
        self.orders.save(&order).await?;

        if let Err(err) = self.notifier.order_canceled(order_id).await {
            warn!(%order_id, error = %err, "failed to emit cancellation");
        }

        info!(%order_id, "dispatch exhausted all candidates");
        Err(DispatchError::NoCandidateAccepted)
    }

    /// Offer the order to one candidate and wait for the decision. Returns
    /// `Ok(true)` when the order ends up confirmed.
    async fn try_candidate(&self, order: &Order, courier_id: Uuid) -> Result<bool, DispatchError> {
        let order_id = order.id;

        // Availability may have changed since selection.
        let Some(courier) = self.directory.get(courier_id).await? else {
            debug!(%order_id, %courier_id, "candidate vanished from directory");
            return Ok(false);
        };
        if !(courier.approved && courier.available) {
            debug!(%order_id, %courier_id, "candidate no longer eligible");
            return Ok(false);
        }

        // Second guard: a racing run may have confirmed between the loop
        // head and here.
        let order = self.require_order(order_id).await?;
        if order.dispatch.status == DispatchStatus::Confirmed {
            return Ok(true);
        }

        let rx = self.offers.open(order_id, courier_id)?;

        if let Err(err) = self.notifier.offer_delivery(courier_id, &order).await {
            self.offers.abandon(order_id, courier_id);
            warn!(%order_id, %courier_id, error = %err, "offer notification failed; treating as rejection");
            return Ok(false);
        }

        info!(%order_id, %courier_id, "offer sent");
        self.metrics.offers_in_flight.inc();
        let opened = Instant::now();

        let outcome = match timeout(self.settings.offer_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without an answer; treat like a rejection.
            Ok(Err(_)) => OfferOutcome::Rejected,
            Err(_) => {
                self.offers.abandon(order_id, courier_id);
                OfferOutcome::Expired
            }
        };

        self.metrics.offers_in_flight.dec();
        self.metrics
            .offer_resolution_seconds
            .with_label_values(&[outcome.as_str()])
            .observe(opened.elapsed().as_secs_f64());
        info!(%order_id, %courier_id, outcome = outcome.as_str(), "offer resolved");

        match outcome {
            OfferOutcome::Accepted => self.confirm(order_id, courier_id).await,
            OfferOutcome::Rejected | OfferOutcome::Expired => Ok(false),
        }
    }

    /// Bind the accepting courier: one `searching -> confirmed` transition,
    /// re-checked against the store immediately before committing.
    async fn confirm(&self, order_id: Uuid, courier_id: Uuid) -> Result<bool, DispatchError> {
        let mut order = self.require_order(order_id).await?;
        if order.dispatch.status == DispatchStatus::Confirmed {
            return Ok(true);
        }

        let trip = Trip::new(order_id, courier_id);
        order.dispatch.status = DispatchStatus::Confirmed;
        order.dispatch.courier_id = Some(courier_id);
        order.dispatch.assigned_at = Some(Utc::now());
        order.dispatch.candidates.clear();
        order.trip_id = Some(trip.id);
        self.orders.save(&order).await?;

        self.directory.set_availability(courier_id, false).await?;
        self.trips.create(&trip).await?;
        self.arm_watchdog(order_id);

        if let Err(err) = self.notifier.order_confirmed(order_id, courier_id).await {
            warn!(%order_id, error = %err, "failed to emit confirmation");
        }

        info!(%order_id, %courier_id, trip_id = %trip.id, "order confirmed");
        Ok(true)
    }

    fn arm_watchdog(&self, order_id: Uuid) {
        let Some(engine) = self.self_ref.upgrade() else {
            return;
        };
        let deadline = self.settings.arrival_deadline;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            engine.watchdogs.complete(order_id);
            engine.on_arrival_deadline(order_id).await;
        });
        self.watchdogs.arm(order_id, deadline, handle);
        self.metrics
            .active_watchdogs
            .set(self.watchdogs.len() as i64);
    }

    /// Timer body. Everything here is swallowed after logging so a single
    /// bad order cannot take the timer subsystem down.
    async fn on_arrival_deadline(&self, order_id: Uuid) {
        self.metrics
            .active_watchdogs
            .set(self.watchdogs.len() as i64);
        if let Err(err) = self.reassign_after_no_show(order_id).await {
            error!(%order_id, error = %err, "arrival deadline handling failed");
        }
    }

    async fn reassign_after_no_show(&self, order_id: Uuid) -> Result<(), DispatchError> {
        let Some(mut order) = self.orders.get(order_id).await? else {
            return Ok(());
        };
        let Some(courier_id) = order.dispatch.courier_id else {
            return Ok(());
        };
        if order.arrived {
            return Ok(());
        }

        warn!(%order_id, %courier_id, "courier missed the arrival deadline; reassigning");

        if let Some(trip_id) = order.trip_id.take() {
            // Best-effort release of the transport record.
            if let Err(err) = self.trips.cancel(trip_id).await {
                warn!(%order_id, %trip_id, error = %err, "failed to cancel trip");
            }
        }

        if let Err(err) = self.directory.set_availability(courier_id, true).await {
            warn!(%order_id, %courier_id, error = %err, "failed to restore courier availability");
        }

        order.dispatch.blacklist.push(courier_id);
        order.dispatch.courier_id = None;
        order.dispatch.assigned_at = None;
        order.dispatch.status = DispatchStatus::Canceled;
        self.orders.save(&order).await?;

        if let Err(err) = self.notifier.courier_removed(courier_id, order_id).await {
            warn!(%order_id, %courier_id, error = %err, "failed to notify removed courier");
        }
        self.metrics.reassignments_total.inc();

        // Full reassignment cycle, now excluding the blacklisted courier.
        match self.dispatch(order_id).await {
            Ok(()) => info!(%order_id, "order reassigned after no-show"),
            Err(err) => warn!(%order_id, error = %err, "reassignment found no replacement"),
        }
        Ok(())
    }

    /// Handler for accept/reject signals from the real-time transport.
    /// Returns whether a pending offer matched; a stray signal is a no-op.
    pub fn on_decision(&self, order_id: Uuid, courier_id: Uuid, accepted: bool) -> bool {
        let outcome = if accepted {
            OfferOutcome::Accepted
        } else {
            OfferOutcome::Rejected
        };
        let resolved = self.offers.resolve(order_id, courier_id, outcome);
        if !resolved {
            debug!(%order_id, %courier_id, "decision without a matching pending offer; ignored");
        }
        resolved
    }

    /// The courier reached the pickup; stop the arrival watchdog.
    pub async fn on_arrival_confirmed(&self, order_id: Uuid) -> Result<(), DispatchError> {
        let mut order = self.require_order(order_id).await?;
        order.arrived = true;
        self.orders.save(&order).await?;

        if self.watchdogs.disarm(order_id) {
            info!(%order_id, "arrival confirmed; watchdog canceled");
        }
        self.metrics
            .active_watchdogs
            .set(self.watchdogs.len() as i64);
        Ok(())
    }

    pub fn list_active_watchdogs(&self) -> Vec<WatchdogStatus> {
        self.watchdogs.list_active()
    }

    async fn require_order(&self, order_id: Uuid) -> Result<Order, DispatchError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("order {order_id} not found")))
    }
}

/// Drain the order queue, running each order's dispatch cycle as its own
/// task so one order's offer window never blocks another's.
pub async fn run_dispatch_loop(state: Arc<AppState>, mut order_rx: mpsc::Receiver<Uuid>) {
    info!("dispatch loop started");

    while let Some(order_id) = order_rx.recv().await {
        state.metrics.orders_in_queue.dec();

        let engine = state.engine.clone();
        let metrics = state.metrics.clone();
        tokio::spawn(async move {
            let start = Instant::now();
            match engine.dispatch(order_id).await {
                Ok(()) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    metrics
                        .dispatch_latency_seconds
                        .with_label_values(&["success"])
                        .observe(elapsed);
                    metrics
                        .dispatch_runs_total
                        .with_label_values(&["success"])
                        .inc();
                }
                Err(err) => {
                    let elapsed = start.elapsed().as_secs_f64();
                    metrics
                        .dispatch_latency_seconds
                        .with_label_values(&["failure"])
                        .observe(elapsed);
                    metrics
                        .dispatch_runs_total
                        .with_label_values(&["failure"])
                        .inc();
                    warn!(%order_id, error = %err, "dispatch run failed");
                }
            }
        });
    }

    warn!("dispatch loop stopped: queue channel closed");
}
