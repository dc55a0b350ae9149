// Prometheus metrics definitions for the bot.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Chat commands handled, by command name and outcome.
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ratbot_commands_total", "Chat commands handled"),
        &["command", "outcome"],
    )
    .unwrap();

    /// Teamkills written to the store.
    pub static ref TEAMKILLS_RECORDED_TOTAL: IntCounter = IntCounter::new(
        "ratbot_teamkills_recorded_total",
        "Teamkills written to the store",
    )
    .unwrap();

    /// Keep-alive pings that failed.
    pub static ref KEEPALIVE_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "ratbot_keepalive_failures_total",
        "Keep-alive pings that failed",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Command handling time in seconds, by command name.
    pub static ref COMMAND_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ratbot_command_duration_seconds",
            "Command handling time in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["command"],
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_TOTAL.clone()),
        Box::new(TEAMKILLS_RECORDED_TOTAL.clone()),
        Box::new(KEEPALIVE_FAILURES_TOTAL.clone()),
        Box::new(COMMAND_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::warn!("Metric registration skipped: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
