use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatches_total: IntCounterVec,
    pub accepts_total: IntCounterVec,
    pub deliveries_total: IntCounter,
    pub broadcasts_expired: IntCounter,
    pub active_assignments: IntGauge,
    pub connected_clients: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatches_total = IntCounterVec::new(
            Opts::new("dispatches_total", "Dispatch attempts by outcome"),
            &["outcome"],
        )
        .expect("valid dispatches_total metric");

        let accepts_total = IntCounterVec::new(
            Opts::new("accepts_total", "Assignment accept attempts by outcome"),
            &["outcome"],
        )
        .expect("valid accepts_total metric");

        let deliveries_total = IntCounter::new("deliveries_total", "Confirmed deliveries")
            .expect("valid deliveries_total metric");

        let broadcasts_expired = IntCounter::new(
            "broadcasts_expired",
            "Broadcast assignments removed by the expiry sweeper",
        )
        .expect("valid broadcasts_expired metric");

        let active_assignments = IntGauge::new(
            "active_assignments",
            "Assignments currently in the ledger",
        )
        .expect("valid active_assignments metric");

        let connected_clients = IntGauge::new(
            "connected_clients",
            "Principals with a live notification channel",
        )
        .expect("valid connected_clients metric");

        registry
            .register(Box::new(dispatches_total.clone()))
            .expect("register dispatches_total");
        registry
            .register(Box::new(accepts_total.clone()))
            .expect("register accepts_total");
        registry
            .register(Box::new(deliveries_total.clone()))
            .expect("register deliveries_total");
        registry
            .register(Box::new(broadcasts_expired.clone()))
            .expect("register broadcasts_expired");
        registry
            .register(Box::new(active_assignments.clone()))
            .expect("register active_assignments");
        registry
            .register(Box::new(connected_clients.clone()))
            .expect("register connected_clients");

        Self {
            registry,
            dispatches_total,
            accepts_total,
            deliveries_total,
            broadcasts_expired,
            active_assignments,
            connected_clients,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
