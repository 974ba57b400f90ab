use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()
    }).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Exchange metrics
    pub exchange_requests: IntCounterVec,
    pub exchange_failures: IntCounterVec,
    pub exchange_duration: HistogramVec,

    // Workflow metrics
    pub bind_attempts: IntCounterVec,
    pub renewal_outcomes: IntCounterVec,
    pub renewal_cycles: IntCounter,
    pub renewal_cycle_duration: Histogram,
    pub stored_bindings: IntGauge,
    pub last_cycle_unix: IntGauge,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokenkeeper".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Exchange
            exchange_requests: IntCounterVec::new(Opts::new("exchange_requests_total", "Outbound provider exchanges by kind"),&["kind"],).unwrap(),
            exchange_failures: IntCounterVec::new(Opts::new("exchange_failures_total", "Failed provider exchanges by kind and reason"),&["kind", "reason"],).unwrap(),
            exchange_duration: HistogramVec::new(HistogramOpts::new("exchange_duration_seconds", "Provider exchange duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]),&["kind"],).unwrap(),

            // Workflows
            bind_attempts: IntCounterVec::new(Opts::new("bind_attempts_total", "Bind attempts by result"),&["result"],).unwrap(),
            renewal_outcomes: IntCounterVec::new(Opts::new("renewal_outcomes_total", "Per-binding renewal results"),&["result"],).unwrap(),
            renewal_cycles: IntCounter::new("renewal_cycles_total", "Completed renewal cycles").unwrap(),
            renewal_cycle_duration: Histogram::with_opts(HistogramOpts::new("renewal_cycle_duration_seconds", "Renewal cycle duration seconds").buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0])).unwrap(),
            stored_bindings: IntGauge::new("stored_bindings", "Bindings seen by the last renewal cycle").unwrap(),
            last_cycle_unix: IntGauge::new("last_cycle_unix_seconds", "Finish time of the last renewal cycle").unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during startup",).unwrap(),
            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.exchange_requests.clone())).unwrap();
        reg.register(Box::new(metrics.exchange_failures.clone())).unwrap();
        reg.register(Box::new(metrics.exchange_duration.clone())).unwrap();
        reg.register(Box::new(metrics.bind_attempts.clone())).unwrap();
        reg.register(Box::new(metrics.renewal_outcomes.clone())).unwrap();
        reg.register(Box::new(metrics.renewal_cycles.clone())).unwrap();
        reg.register(Box::new(metrics.renewal_cycle_duration.clone())).unwrap();
        reg.register(Box::new(metrics.stored_bindings.clone())).unwrap();
        reg.register(Box::new(metrics.last_cycle_unix.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
