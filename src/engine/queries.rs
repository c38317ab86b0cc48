use ulid::Ulid;

use crate::model::*;

use super::Engine;

impl Engine {
    pub fn get_list(&self, id: &Ulid) -> Option<ProductList> {
        self.lists.get(id).map(|e| e.value().clone())
    }

    pub fn find_list_by_title(&self, title: &str) -> Option<ProductList> {
        let id = self.titles.get(title).map(|e| *e.value())?;
        self.get_list(&id)
    }

    /// List ids, oldest first (ULIDs sort by creation time).
    pub fn list_ids(&self) -> Vec<Ulid> {
        let mut ids: Vec<Ulid> = self.lists.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    pub fn get_action(&self, id: &Ulid) -> Option<ScheduledAction> {
        self.actions.get(id).map(|e| e.value().clone())
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Coarse pre-filter for the sweep: ready, inside its window, never started.
    pub fn actions_startable_at(&self, now: Ms) -> Vec<ScheduledAction> {
        self.collect_actions(|a| {
            let w = a.window();
            w.is_ready() && w.is_in_now(now) && !a.started && !a.stopped
        })
    }

    /// Coarse pre-filter for the sweep: window closed, not yet stopped.
    pub fn actions_stoppable_at(&self, now: Ms) -> Vec<ScheduledAction> {
        self.collect_actions(|a| a.window().is_ready() && a.window().is_in_past(now) && !a.stopped)
    }

    pub fn actions_for_list(&self, list_id: &Ulid) -> Vec<ScheduledAction> {
        self.collect_actions(|a| a.affected_lists.contains(list_id))
    }

    fn collect_actions(&self, keep: impl Fn(&ScheduledAction) -> bool) -> Vec<ScheduledAction> {
        let mut found: Vec<ScheduledAction> = self
            .actions
            .iter()
            .filter(|e| keep(e.value()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|a| a.id);
        found
    }
}
