use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::datastore::Datastore;
use crate::engine::EngineError;
use crate::model::*;
use crate::observability::{SWEEP_CANDIDATES, SWEEP_DURATION_SECONDS};
use crate::runner::ActionRunner;

/// One line of a sweep report.
#[derive(Debug)]
pub struct SweepEntry {
    pub action_id: Ulid,
    pub title: String,
    pub result: Result<Outcome, EngineError>,
    pub message: String,
}

impl SweepEntry {
    fn new(action_id: Ulid, title: String, result: Result<Outcome, EngineError>) -> Self {
        let message = match &result {
            Ok(outcome) => format!("{title} ... {outcome} COMPLETED"),
            Err(e) => format!("{title} ... FAILED: {e}"),
        };
        Self {
            action_id,
            title,
            result,
            message,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self.result, Ok(Outcome::NoChange))
    }
}

/// Periodic driver: finds actions that may need a transition and runs them.
pub struct SweepScheduler {
    runner: Arc<ActionRunner>,
    store: Arc<dyn Datastore>,
    concurrency: usize,
}

impl SweepScheduler {
    pub fn new(runner: Arc<ActionRunner>, store: Arc<dyn Datastore>, concurrency: usize) -> Self {
        Self {
            runner,
            store,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every candidate action once. A failing action is reported in its entry
    /// and never stops the sweep; only a failed candidate query does.
    ///
    /// Entries are ordered by action id.
    pub async fn sweep_once(&self, now: Ms) -> Result<Vec<SweepEntry>, EngineError> {
        let started = Instant::now();

        // The stores' filters are coarse; the runner re-derives the real decision.
        let mut candidates: BTreeMap<Ulid, String> = BTreeMap::new();
        for action in self.store.actions_startable_at(now).await? {
            candidates.insert(action.id, action.title);
        }
        for action in self.store.actions_stoppable_at(now).await? {
            candidates.insert(action.id, action.title);
        }
        metrics::histogram!(SWEEP_CANDIDATES).record(candidates.len() as f64);
        if candidates.is_empty() {
            debug!("sweep at {now}: nothing to do");
            return Ok(Vec::new());
        }

        let runner = &self.runner;
        let store = &self.store;
        let mut entries: Vec<SweepEntry> = futures::stream::iter(candidates)
            .map(|(id, stale_title)| async move {
                let result = runner.run(id, now).await;
                // Prefer the title the run just wrote.
                let title = match store.load_action(id).await {
                    Ok(Some(action)) => action.title,
                    _ => stale_title,
                };
                SweepEntry::new(id, title, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        entries.sort_by_key(|e| e.action_id);

        let failed = entries.iter().filter(|e| e.result.is_err()).count();
        let changed = entries.iter().filter(|e| e.is_change()).count() - failed;
        metrics::histogram!(SWEEP_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        if failed > 0 {
            warn!("sweep at {now}: {} candidates, {changed} changed, {failed} failed", entries.len());
        } else {
            info!("sweep at {now}: {} candidates, {changed} changed", entries.len());
        }
        Ok(entries)
    }
}
