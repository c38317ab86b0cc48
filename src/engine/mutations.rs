use dashmap::mapref::entry::Entry;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::{Engine, EngineError};

impl Engine {
    /// Persist a list as given. Reconciliation happens before this, in the resolver.
    pub async fn save_list(&self, list: ProductList) -> Result<(), EngineError> {
        if list.title.trim().is_empty() {
            return Err(EngineError::Configuration("list title must not be blank".into()));
        }
        if list.title.len() > MAX_TITLE_LEN {
            return Err(EngineError::LimitExceeded("list title too long"));
        }
        if !self.lists.contains_key(&list.id) && self.lists.len() >= MAX_LISTS {
            return Err(EngineError::LimitExceeded("too many lists"));
        }

        // Claim the title before journaling so two lists can never commit the same one.
        let newly_claimed = match self.titles.entry(list.title.clone()) {
            Entry::Occupied(owner) if *owner.get() != list.id => {
                return Err(EngineError::TitleTaken(list.title));
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(list.id);
                true
            }
        };

        let title = list.title.clone();
        let id = list.id;
        if let Err(e) = self.persist_and_apply(Event::ListSaved(list)).await {
            if newly_claimed {
                self.titles.remove_if(&title, |_, owner| *owner == id);
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn delete_list(&self, id: Ulid) -> Result<(), EngineError> {
        let locked = self
            .lists
            .get(&id)
            .map(|l| l.locked)
            .ok_or(EngineError::NotFound(id))?;
        if locked {
            return Err(EngineError::Configuration(format!(
                "list {id} is locked and cannot be deleted"
            )));
        }
        self.persist_and_apply(Event::ListDeleted { id }).await
    }

    pub async fn save_action(&self, action: ScheduledAction) -> Result<(), EngineError> {
        if action.kind.is_empty() || action.kind.len() > MAX_KIND_TAG_LEN {
            return Err(EngineError::LimitExceeded("action kind tag length"));
        }
        if action.title.len() > MAX_TITLE_LEN {
            return Err(EngineError::LimitExceeded("action title too long"));
        }
        if action.affected_lists.len() > MAX_AFFECTED_LISTS {
            return Err(EngineError::LimitExceeded("too many affected lists"));
        }
        if !self.actions.contains_key(&action.id) && self.actions.len() >= MAX_ACTIONS {
            return Err(EngineError::LimitExceeded("too many actions"));
        }
        for at in [action.start_at, action.stop_at].into_iter().flatten() {
            if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&at) {
                return Err(EngineError::LimitExceeded("timestamp out of range"));
            }
        }
        if action.stopped && !action.started {
            return Err(EngineError::Configuration(format!(
                "action {} cannot be stopped without having started",
                action.id
            )));
        }
        self.persist_and_apply(Event::ActionSaved(action)).await
    }

    pub async fn delete_action(&self, id: Ulid) -> Result<(), EngineError> {
        if !self.actions.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        self.persist_and_apply(Event::ActionDeleted { id }).await
    }
}
