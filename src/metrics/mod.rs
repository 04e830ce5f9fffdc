mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Instant;

use crate::domain::order::OrderStatus;

pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the order lifecycle
// ============================================================================
//
// - Orders created and order codes allocated
// - Status transitions (accepted, by edge) and rejections (by reason)
// - Post-commit hook failures (by hook)
// - Lifecycle operation latency
//
// Scraped via /metrics on the metrics server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_created: IntCounter,
    pub order_codes_allocated: IntCounter,

    pub transitions: IntCounterVec,
    pub transition_rejections: IntCounterVec,

    pub hook_failures: IntCounterVec,

    pub operation_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_codes_allocated = IntCounter::new(
            "order_codes_allocated_total",
            "Total order codes issued by the daily sequence",
        )?;
        registry.register(Box::new(order_codes_allocated.clone()))?;

        let transitions = IntCounterVec::new(
            Opts::new("order_transitions_total", "Accepted order status transitions"),
            &["from", "to"],
        )?;
        registry.register(Box::new(transitions.clone()))?;

        let transition_rejections = IntCounterVec::new(
            Opts::new("order_transition_rejections_total", "Rejected lifecycle operations"),
            &["reason"],
        )?;
        registry.register(Box::new(transition_rejections.clone()))?;

        let hook_failures = IntCounterVec::new(
            Opts::new("lifecycle_hook_failures_total", "Post-commit hook failures"),
            &["hook"],
        )?;
        registry.register(Box::new(hook_failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("lifecycle_operation_duration_seconds", "Lifecycle operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_codes_allocated,
            transitions,
            transition_rejections,
            hook_failures,
            operation_duration,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_transition(&self, from: OrderStatus, to: OrderStatus) {
        self.transitions.with_label_values(&[from.as_str(), to.as_str()]).inc();
    }

    pub fn record_rejection(&self, reason: &str) {
        self.transition_rejections.with_label_values(&[reason]).inc();
    }

    pub fn record_hook_failure(&self, hook: &str) {
        self.hook_failures.with_label_values(&[hook]).inc();
    }

    pub fn observe_duration(&self, operation: &str, started: Instant) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }
}
