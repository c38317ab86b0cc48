//! Runs one scheduled action through its lifecycle.
//!
//! A run is two phases: [`compute_transition`] decides from the stored flags and
//! `now`, then the effect fires and the new flags are written once. Saving an
//! action never triggers a nested run of itself, so there is no loop guard.

use std::sync::Arc;

use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::codec::ItemSet;
use crate::datastore::Datastore;
use crate::effect::{ActionKind, KindRegistry};
use crate::engine::EngineError;
use crate::inflight::InFlight;
use crate::model::*;
use crate::observability::{outcome_label, EFFECT_FAILURES_TOTAL, TRANSITIONS_TOTAL};
use crate::resolver::ListMembershipResolver;
use crate::window::{compute_transition, format_day, next_month_window, Transition};

pub struct ActionRunner {
    store: Arc<dyn Datastore>,
    registry: Arc<KindRegistry>,
    resolver: Arc<ListMembershipResolver>,
    inflight: InFlight,
}

impl ActionRunner {
    pub fn new(
        store: Arc<dyn Datastore>,
        registry: Arc<KindRegistry>,
        resolver: Arc<ListMembershipResolver>,
    ) -> Self {
        Self {
            store,
            registry,
            resolver,
            inflight: InFlight::new(),
        }
    }

    /// Evaluate and apply the action's transition at `now`.
    ///
    /// Force flags are consumed and the title recomputed on every run, and that
    /// write happens even when the effect fails. A failed effect leaves
    /// `started`/`stopped` as they were and returns [`EngineError::EffectFailure`].
    pub async fn run(&self, id: Ulid, now: Ms) -> Result<Outcome, EngineError> {
        let _guard = self.inflight.try_enter(id)?;
        self.run_locked(id, now).await
    }

    /// Caller holds the in-flight guard for `id`.
    async fn run_locked(&self, id: Ulid, now: Ms) -> Result<Outcome, EngineError> {
        let mut action = self
            .store
            .load_action(id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        let kind = self.registry.get(&action.kind)?;

        let transition = compute_transition(&action.window(), now, kind.repeatable);
        let items = self.effective_items(&action).await?;

        action.force_start_now = false;
        action.force_run_now = false;
        action.title = derived_title(kind, &action, items.len());

        let result = apply_transition(kind, transition, &mut action, &items).await;
        self.store.save_action(action).await?;

        match &result {
            Ok(Outcome::NoChange) => debug!("action {id}: no change"),
            Ok(outcome) => {
                info!("action {id}: {outcome} on {} items", items.len());
                metrics::counter!(TRANSITIONS_TOTAL, "outcome" => outcome_label(*outcome)).increment(1);
            }
            Err(e) => warn!("action {id}: {e}"),
        }
        result
    }

    /// The save hook for actions.
    ///
    /// An action saved with no window gets next month's. The lifecycle flags are
    /// owned by the runner: whatever the caller sends, the stored ones are kept.
    /// Runs the action once if a force flag is set. Returns
    /// [`EngineError::Busy`] while a run of the same action is in flight.
    pub async fn save(&self, mut action: ScheduledAction, now: Ms) -> Result<Outcome, EngineError> {
        let _guard = self.inflight.try_enter(action.id)?;
        if action.start_at.is_none()
            && action.stop_at.is_none()
            && let Some((start, stop)) = next_month_window(now)
        {
            action.start_at = Some(start);
            action.stop_at = Some(stop);
        }
        if !action.window().is_ready() {
            return Err(EngineError::Configuration(format!(
                "action {}: start must be set and before stop",
                action.id
            )));
        }

        match self.store.load_action(action.id).await? {
            Some(existing) if !existing.can_edit() => {
                return Err(EngineError::Configuration(format!(
                    "action {} has stopped and can no longer be edited",
                    action.id
                )));
            }
            Some(existing) => {
                action.started = existing.started;
                action.stopped = existing.stopped;
            }
            None => {
                action.started = false;
                action.stopped = false;
            }
        }

        let kind = self.registry.get(&action.kind)?;
        for list_id in &action.affected_lists {
            if self.store.load_list(*list_id).await?.is_none() {
                return Err(EngineError::NotFound(*list_id));
            }
        }

        let items = self.effective_items(&action).await?;
        action.title = derived_title(kind, &action, items.len());
        let id = action.id;
        let force = action.has_force_flag();
        self.store.save_action(action).await?;

        if force {
            self.run_locked(id, now).await
        } else {
            Ok(Outcome::NoChange)
        }
    }

    /// Union of the resolved membership of every affected list.
    pub async fn effective_items(&self, action: &ScheduledAction) -> Result<ItemSet, EngineError> {
        let mut items = ItemSet::new();
        for list_id in &action.affected_lists {
            items.union_with(&self.resolver.membership(*list_id).await?);
        }
        Ok(items)
    }

    /// Titles of the affected lists, joined by `", "`. Missing lists are skipped.
    pub async fn list_names(&self, action: &ScheduledAction) -> Result<String, EngineError> {
        let mut names = Vec::with_capacity(action.affected_lists.len());
        for list_id in &action.affected_lists {
            if let Some(list) = self.store.load_list(*list_id).await? {
                names.push(list.title);
            }
        }
        Ok(names.join(", "))
    }
}

async fn apply_transition(
    kind: &ActionKind,
    transition: Transition,
    action: &mut ScheduledAction,
    items: &ItemSet,
) -> Result<Outcome, EngineError> {
    let action_id = action.id;
    let failed = move |message: String| {
        metrics::counter!(EFFECT_FAILURES_TOTAL, "kind" => kind.tag.clone()).increment(1);
        EngineError::EffectFailure { action_id, message }
    };

    match transition {
        Transition::None => Ok(Outcome::NoChange),
        Transition::Start => {
            kind.handler
                .activate(action, items)
                .await
                .map_err(|e| failed(e.0))?;
            action.started = true;
            Ok(Outcome::Started)
        }
        Transition::Stop => {
            kind.handler
                .deactivate(action, items)
                .await
                .map_err(|e| failed(e.0))?;
            action.stopped = true;
            Ok(Outcome::Stopped)
        }
        Transition::StartThenStop => {
            kind.handler
                .activate(action, items)
                .await
                .map_err(|e| failed(e.0))?;
            action.started = true;
            kind.handler
                .deactivate(action, items)
                .await
                .map_err(|e| failed(e.0))?;
            action.stopped = true;
            Ok(Outcome::Stopped)
        }
        Transition::Reapply => {
            kind.handler
                .activate(action, items)
                .await
                .map_err(|e| failed(e.0))?;
            Ok(Outcome::Reapplied)
        }
    }
}

fn derived_title(kind: &ActionKind, action: &ScheduledAction, count: usize) -> String {
    format!(
        "{}, from {}, until {}, on {} products",
        kind.label,
        format_day(action.start_at),
        format_day(action.stop_at),
        count
    )
}
