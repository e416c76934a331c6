use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Request counters
pub static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("bridge_requests_total", "Total number of forwarded requests"),
        &["route", "outcome"],
    )
    .unwrap()
});

// Upstream latency, including signing
pub static UPSTREAM_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "bridge_upstream_latency_seconds",
            "Gateway round-trip latency",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

// Rejections by translated code
pub static GATEWAY_REJECTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bridge_gateway_rejections_total",
            "Gateway rejections by canonical error code",
        ),
        &["code"],
    )
    .unwrap()
});

/// Register all metrics with the registry
pub fn register_metrics() {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(UPSTREAM_LATENCY.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(GATEWAY_REJECTIONS.clone()))
        .unwrap();
}
