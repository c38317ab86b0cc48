mod error;
mod mutations;
mod queries;
#[cfg(test)]
mod tests;

pub use error::EngineError;

use std::io;
use std::path::PathBuf;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::journal::Journal;
use crate::model::*;

// ── Group-commit journal channel ─────────────────────────

pub(super) enum JournalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        snapshot: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

/// Background task that owns the journal. Appends that arrive while a batch is
/// being collected share a single fsync.
async fn journal_writer_loop(mut journal: Journal, mut rx: mpsc::Receiver<JournalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            JournalCommand::Append { event, response } => (event, response),
            other => {
                handle_control(&mut journal, other);
                continue;
            }
        };
        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(JournalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        metrics::histogram!(crate::observability::JOURNAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = flush_batch(&mut journal, &batch);
        metrics::histogram!(crate::observability::JOURNAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        for (_, tx) in batch {
            let r = match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            };
            let _ = tx.send(r);
        }

        if let Some(cmd) = deferred {
            handle_control(&mut journal, cmd);
        }
    }
}

fn flush_batch(journal: &mut Journal, batch: &[PendingAppend]) -> io::Result<()> {
    let appended = batch
        .iter()
        .try_for_each(|(event, _)| journal.append_buffered(event));
    // Flush even after a failed append so a half-written batch never leaks into the next one.
    let flushed = journal.flush_sync();
    appended.and(flushed)
}

fn handle_control(journal: &mut Journal, cmd: JournalCommand) {
    match cmd {
        JournalCommand::Compact { snapshot, response } => {
            let _ = response.send(journal.compact(&snapshot));
        }
        JournalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(journal.appends_since_compact());
        }
        JournalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

/// The bundled datastore: lists and actions held in memory, every change journaled.
pub struct Engine {
    pub(super) lists: DashMap<Ulid, ProductList>,
    pub(super) actions: DashMap<Ulid, ScheduledAction>,
    /// Title → list id. Titles are unique across lists.
    pub(super) titles: DashMap<String, Ulid>,
    pub(super) journal_tx: mpsc::Sender<JournalCommand>,
    /// Held shared by every commit and exclusively while a snapshot is compacted,
    /// so no journaled change can fall between a snapshot and its rewrite.
    commit_gate: RwLock<()>,
}

impl Engine {
    /// Replay the journal at `path` and start its writer task. Must run inside a tokio runtime.
    pub fn new(path: PathBuf) -> io::Result<Self> {
        let events = Journal::replay(&path)?;
        let journal = Journal::open(&path)?;
        let (journal_tx, journal_rx) = mpsc::channel(4096);
        tokio::spawn(journal_writer_loop(journal, journal_rx));

        let engine = Self {
            lists: DashMap::new(),
            actions: DashMap::new(),
            titles: DashMap::new(),
            journal_tx,
            commit_gate: RwLock::new(()),
        };
        for event in &events {
            engine.apply(event);
        }
        tracing::debug!(
            "replayed {} journal records: {} lists, {} actions",
            events.len(),
            engine.lists.len(),
            engine.actions.len()
        );
        Ok(engine)
    }

    /// Apply a journaled change to the in-memory indexes.
    pub(super) fn apply(&self, event: &Event) {
        match event {
            Event::ListSaved(list) => {
                if let Some(previous) = self.lists.insert(list.id, list.clone())
                    && previous.title != list.title
                {
                    self.titles.remove_if(&previous.title, |_, owner| *owner == list.id);
                }
                self.titles.insert(list.title.clone(), list.id);
            }
            Event::ListDeleted { id } => {
                if let Some((_, previous)) = self.lists.remove(id) {
                    self.titles.remove_if(&previous.title, |_, owner| owner == id);
                }
            }
            Event::ActionSaved(action) => {
                self.actions.insert(action.id, action.clone());
            }
            Event::ActionDeleted { id } => {
                self.actions.remove(id);
            }
        }
    }

    async fn journal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    /// Journal the change, then make it visible.
    pub(super) async fn persist_and_apply(&self, event: Event) -> Result<(), EngineError> {
        let _gate = self.commit_gate.read().await;
        self.journal_append(&event).await?;
        self.apply(&event);
        Ok(())
    }

    /// The minimal set of records that recreates the current state.
    pub fn snapshot(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self
            .lists
            .iter()
            .map(|e| Event::ListSaved(e.value().clone()))
            .collect();
        events.extend(self.actions.iter().map(|e| Event::ActionSaved(e.value().clone())));
        events
    }

    pub async fn compact(&self) -> Result<(), EngineError> {
        let _gate = self.commit_gate.write().await;
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::Compact {
                snapshot: self.snapshot(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))?
            .map_err(|e| EngineError::JournalError(e.to_string()))
    }

    pub async fn appends_since_compact(&self) -> Result<u64, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.journal_tx
            .send(JournalCommand::AppendsSinceCompact { response: tx })
            .await
            .map_err(|_| EngineError::JournalError("journal writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::JournalError("journal writer dropped response".into()))
    }
}
