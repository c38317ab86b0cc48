use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::model::Ms;
use crate::observability::JOURNAL_COMPACTIONS_TOTAL;
use crate::sweep::SweepScheduler;

/// Wall-clock unix millis. `None` if the clock reads before the epoch.
pub fn now_ms() -> Option<Ms> {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .and_then(|d| Ms::try_from(d.as_millis()).ok())
}

/// Background task that sweeps scheduled actions every `interval`.
pub async fn run_sweeper(scheduler: Arc<SweepScheduler>, interval: Duration) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(now) = now_ms() else {
            error!("system clock is before the unix epoch, skipping sweep");
            continue;
        };
        match scheduler.sweep_once(now).await {
            Ok(entries) => {
                for entry in entries.iter().filter(|e| e.is_change()) {
                    if entry.result.is_err() {
                        warn!("{}", entry.message);
                    } else {
                        info!("{}", entry.message);
                    }
                }
            }
            Err(e) => error!("sweep failed: {e}"),
        }
    }
}

/// Background task that rewrites the journal as a snapshot once `threshold`
/// appends have piled up since the last compaction.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64, interval: Duration) {
    let mut interval = tokio::time::interval(interval);
    loop {
        interval.tick().await;
        if let Err(e) = compact_if_due(&engine, threshold).await {
            metrics::counter!(JOURNAL_COMPACTIONS_TOTAL, "status" => "error").increment(1);
            error!("journal compaction failed: {e}");
        }
    }
}

/// Returns whether a compaction ran.
pub async fn compact_if_due(engine: &Engine, threshold: u64) -> Result<bool, crate::engine::EngineError> {
    let appends = engine.appends_since_compact().await?;
    if appends < threshold.max(1) {
        debug!("compactor: {appends} appends since last compaction, below {threshold}");
        return Ok(false);
    }
    engine.compact().await?;
    metrics::counter!(JOURNAL_COMPACTIONS_TOTAL, "status" => "ok").increment(1);
    info!("compacted journal after {appends} appends");
    Ok(true)
}
