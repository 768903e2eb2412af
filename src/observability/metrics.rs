use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatch_runs_total: IntCounterVec,
    pub dispatch_latency_seconds: HistogramVec,
    pub orders_in_queue: IntGauge,
    pub offers_in_flight: IntGauge,
    pub offer_resolution_seconds: HistogramVec,
    pub active_watchdogs: IntGauge,
    pub stale_offers_reclaimed: IntCounter,
    pub reassignments_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatch_runs_total = IntCounterVec::new(
            Opts::new("dispatch_runs_total", "Completed dispatch runs by outcome"),
            &["outcome"],
        )
        .expect("valid dispatch_runs_total metric");

        let dispatch_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "dispatch_latency_seconds",
                "Wall time of a full dispatch run in seconds",
            ),
            &["outcome"],
        )
        .expect("valid dispatch_latency_seconds metric");

        let orders_in_queue = IntGauge::new("orders_in_queue", "Current number of orders in queue")
            .expect("valid orders_in_queue metric");

        let offers_in_flight = IntGauge::new(
            "offers_in_flight",
            "Pending offers currently awaiting a courier decision",
        )
        .expect("valid offers_in_flight metric");

        let offer_resolution_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "offer_resolution_seconds",
                "Time from offer sent to resolution in seconds",
            ),
            &["outcome"],
        )
        .expect("valid offer_resolution_seconds metric");

        let active_watchdogs = IntGauge::new(
            "active_watchdogs",
            "Arrival watchdog timers currently armed",
        )
        .expect("valid active_watchdogs metric");

        let stale_offers_reclaimed = IntCounter::new(
            "stale_offers_reclaimed_total",
            "Pending offers force-reclaimed by the janitor",
        )
        .expect("valid stale_offers_reclaimed metric");

        let reassignments_total = IntCounter::new(
            "reassignments_total",
            "Orders reassigned after an arrival deadline miss",
        )
        .expect("valid reassignments_total metric");

        registry
            .register(Box::new(dispatch_runs_total.clone()))
            .expect("register dispatch_runs_total");
        registry
            .register(Box::new(dispatch_latency_seconds.clone()))
            .expect("register dispatch_latency_seconds");
        registry
            .register(Box::new(orders_in_queue.clone()))
            .expect("register orders_in_queue");
        registry
            .register(Box::new(offers_in_flight.clone()))
            .expect("register offers_in_flight");
        registry
            .register(Box::new(offer_resolution_seconds.clone()))
            .expect("register offer_resolution_seconds");
        registry
            .register(Box::new(active_watchdogs.clone()))
            .expect("register active_watchdogs");
        registry
            .register(Box::new(stale_offers_reclaimed.clone()))
            .expect("register stale_offers_reclaimed");
        registry
            .register(Box::new(reassignments_total.clone()))
            .expect("register reassignments_total");

        Self {
            registry,
            dispatch_runs_total,
            dispatch_latency_seconds,
            orders_in_queue,
            offers_in_flight,
            offer_resolution_seconds,
            active_watchdogs,
            stale_offers_reclaimed,
            reassignments_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
