// Prometheus metrics for the tracked accounts service
//
// Exposed on the /metrics HTTP endpoint:
// - Add attempts by outcome (counter)
// - Deleted accounts (counter)
// - Entitlement lookup latency (histogram) and failures (counter)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, Histogram, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref ACCOUNT_ADD_ATTEMPTS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("account_add_attempts_total", "Add account attempts by outcome"),
        &["outcome"]
    ).expect("Failed to create add attempts metric");

    pub static ref ACCOUNTS_DELETED_TOTAL: IntCounter = IntCounter::new(
        "accounts_deleted_total",
        "Total number of tracked accounts deleted"
    ).expect("Failed to create accounts deleted metric");

    pub static ref ENTITLEMENT_LOOKUP_DURATION_SECONDS: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "entitlement_lookup_duration_seconds",
            "Round trip time of entitlement lookups"
        ),
    ).expect("Failed to create entitlement lookup duration metric");

    pub static ref ENTITLEMENT_LOOKUP_ERRORS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("entitlement_lookup_errors_total", "Failed entitlement lookups by kind"),
        &["kind"]
    ).expect("Failed to create entitlement errors metric");
}

/// Register all collectors with [`REGISTRY`]
///
/// Safe to call more than once; collectors that are already registered are
/// left alone.
pub fn init() -> prometheus::Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACCOUNT_ADD_ATTEMPTS_TOTAL.clone()),
        Box::new(ACCOUNTS_DELETED_TOTAL.clone()),
        Box::new(ENTITLEMENT_LOOKUP_DURATION_SECONDS.clone()),
        Box::new(ENTITLEMENT_LOOKUP_ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Count one add attempt
pub fn record_add_outcome(outcome: &str) {
    ACCOUNT_ADD_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
