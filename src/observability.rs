use std::net::SocketAddr;

use crate::model::Outcome;

// ── Reconciliation ──────────────────────────────────────────────

/// Counter: lists reconciled. Labels: locked.
pub const LISTS_RECONCILED_TOTAL: &str = "listwise_lists_reconciled_total";

/// Counter: item/category/list references that did not resolve. Labels: kind.
pub const DANGLING_REFERENCES_TOTAL: &str = "listwise_dangling_references_total";

// ── Action lifecycle ────────────────────────────────────────────

/// Counter: transitions applied. Labels: outcome.
pub const TRANSITIONS_TOTAL: &str = "listwise_transitions_total";

/// Counter: activate/deactivate calls that failed. Labels: kind.
pub const EFFECT_FAILURES_TOTAL: &str = "listwise_effect_failures_total";

/// Histogram: wall time of one sweep in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "listwise_sweep_duration_seconds";

/// Histogram: candidate actions per sweep.
pub const SWEEP_CANDIDATES: &str = "listwise_sweep_candidates";

// ── Journal ─────────────────────────────────────────────────────

/// Histogram: journal group-commit flush duration in seconds.
pub const JOURNAL_FLUSH_DURATION_SECONDS: &str = "listwise_journal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (records per flush).
pub const JOURNAL_FLUSH_BATCH_SIZE: &str = "listwise_journal_flush_batch_size";

/// Counter: journal compactions. Labels: status.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "listwise_journal_compactions_total";

/// Install the Prometheus exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Short label for an outcome.
pub fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::NoChange => "no_change",
        Outcome::Started => "started",
        Outcome::Stopped => "stopped",
        Outcome::Reapplied => "reapplied",
    }
}
