//! Prometheus metrics collection for raffled.
//!
//! - `raffle_commands_total{command}` - Gateway commands processed by verb
//! - `raffle_command_duration_seconds{command}` - Command latency histogram
//! - `raffle_command_errors_total{command,error}` - Command errors by kind
//! - `raffle_entries_admitted_total` - Successful joins
//! - `raffle_entries_denied_total{kind}` - Denied joins by denial kind
//! - `raffle_validation_failures_total{kind}` - Rejected definitions by error kind
//! - `raffle_draws_total{disposition}` - Completed draws by end action

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Gateway
// ========================================================================

pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Currently connected gateway sessions.
pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Raffle engine
// ========================================================================

pub static ENTRIES_ADMITTED: OnceLock<IntCounter> = OnceLock::new();

pub static ENTRIES_DENIED: OnceLock<IntCounterVec> = OnceLock::new();

pub static VALIDATION_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

pub static DRAWS: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before any metrics are recorded.
/// Recording before `init` is a no-op.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            let m = $init.expect(concat!(stringify!($metric), " creation failed"));
            if let Err(e) = r.register(Box::new(m.clone())) {
                tracing::warn!(
                    error = %e,
                    concat!("Failed to register metric ", stringify!($metric))
                );
            }
            let _ = $metric.set(m);
        };
    }

    register!(
        COMMAND_COUNTER,
        IntCounterVec::new(
            Opts::new("raffle_commands_total", "Gateway commands processed by verb"),
            &["command"]
        )
    );
    register!(
        COMMAND_LATENCY,
        HistogramVec::new(
            HistogramOpts::new(
                "raffle_command_duration_seconds",
                "Gateway command latency by verb"
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
            &["command"]
        )
    );
    register!(
        COMMAND_ERRORS,
        IntCounterVec::new(
            Opts::new(
                "raffle_command_errors_total",
                "Gateway command errors by verb and kind"
            ),
            &["command", "error"]
        )
    );
    register!(
        CONNECTED_SESSIONS,
        IntGauge::new("raffle_connected_sessions", "Currently connected gateway sessions")
    );

    register!(
        ENTRIES_ADMITTED,
        IntCounter::new("raffle_entries_admitted_total", "Entrants admitted to raffles")
    );
    register!(
        ENTRIES_DENIED,
        IntCounterVec::new(
            Opts::new("raffle_entries_denied_total", "Join attempts denied by kind"),
            &["kind"]
        )
    );
    register!(
        VALIDATION_FAILURES,
        IntCounterVec::new(
            Opts::new(
                "raffle_validation_failures_total",
                "Rejected raffle definitions by kind"
            ),
            &["kind"]
        )
    );
    register!(
        DRAWS,
        IntCounterVec::new(
            Opts::new("raffle_draws_total", "Completed draws by end action"),
            &["disposition"]
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

fn inc_labeled(metric: &OnceLock<IntCounterVec>, labels: &[&str]) {
    if let Some(c) = metric.get() {
        c.with_label_values(labels).inc();
    }
}

/// Record a command execution with latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    inc_labeled(&COMMAND_COUNTER, &[command]);
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a command error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    inc_labeled(&COMMAND_ERRORS, &[command, error]);
}

#[inline]
pub fn record_entry_admitted() {
    if let Some(c) = ENTRIES_ADMITTED.get() {
        c.inc();
    }
}

#[inline]
pub fn record_entry_denied(kind: &str) {
    inc_labeled(&ENTRIES_DENIED, &[kind]);
}

#[inline]
pub fn record_validation_failure(kind: &str) {
    inc_labeled(&VALIDATION_FAILURES, &[kind]);
}

#[inline]
pub fn record_draw(disposition: &str) {
    inc_labeled(&DRAWS, &[disposition]);
}

pub fn session_opened() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.inc();
    }
}

pub fn session_closed() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.dec();
    }
}
