use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub order_transitions_total: IntCounterVec,
    pub location_samples_total: IntCounter,
    pub arrivals_detected_total: IntCounter,
    pub active_delivery_persons: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let order_transitions_total = IntCounterVec::new(
            Opts::new("order_transitions_total", "Order status transitions by target status"),
            &["status"],
        )
        .expect("valid order_transitions_total metric");

        let location_samples_total =
            IntCounter::new("location_samples_total", "Location samples received")
                .expect("valid location_samples_total metric");

        let arrivals_detected_total = IntCounter::new(
            "arrivals_detected_total",
            "Orders moved to reached by proximity to their destination",
        )
        .expect("valid arrivals_detected_total metric");

        let active_delivery_persons = IntGauge::new(
            "active_delivery_persons",
            "Delivery persons currently marked active",
        )
        .expect("valid active_delivery_persons metric");

        registry
            .register(Box::new(order_transitions_total.clone()))
            .expect("register order_transitions_total");
        registry
            .register(Box::new(location_samples_total.clone()))
            .expect("register location_samples_total");
        registry
            .register(Box::new(arrivals_detected_total.clone()))
            .expect("register arrivals_detected_total");
        registry
            .register(Box::new(active_delivery_persons.clone()))
            .expect("register active_delivery_persons");

        Self {
            registry,
            order_transitions_total,
            location_samples_total,
            arrivals_detected_total,
            active_delivery_persons,
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
