use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::window::ActionWindow;

/// Unix milliseconds.
pub type Ms = i64;

/// A catalog item (product) reference. Its identifier string comes from the catalog.
pub type ItemRef = Ulid;

/// A catalog category reference.
pub type CategoryRef = Ulid;

/// A named, curated list of catalog items.
///
/// `canonical_codes` is the only durable statement of membership. Every other
/// membership field is an input that reconciliation folds into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductList {
    pub id: Ulid,
    pub title: String,
    pub locked: bool,
    /// Free-text codes to merge in on the next save.
    pub manual_codes: String,
    /// Delimited, deduplicated item identifiers.
    pub canonical_codes: String,
    pub pending_add: BTreeSet<ItemRef>,
    pub pending_remove: BTreeSet<ItemRef>,
    pub categories_to_add: BTreeSet<CategoryRef>,
    /// When non-empty, category fold-in only keeps items also found here.
    pub must_also_be_in_categories: BTreeSet<CategoryRef>,
    pub keep_adding_from_categories: bool,
    pub lists_to_add: BTreeSet<Ulid>,
    pub keep_adding_from_lists: bool,
}

impl ProductList {
    pub fn new(id: Ulid) -> Self {
        Self {
            id,
            title: String::new(),
            locked: false,
            manual_codes: String::new(),
            canonical_codes: String::new(),
            pending_add: BTreeSet::new(),
            pending_remove: BTreeSet::new(),
            categories_to_add: BTreeSet::new(),
            must_also_be_in_categories: BTreeSet::new(),
            keep_adding_from_categories: false,
            lists_to_add: BTreeSet::new(),
            keep_adding_from_lists: false,
        }
    }

    pub fn can_delete(&self) -> bool {
        !self.locked
    }
}

/// A time-boxed effect applied to every item of one or more lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub id: Ulid,
    /// Tag into the kind registry.
    pub kind: String,
    /// Derived on every save and run; never user-entered.
    pub title: String,
    pub start_at: Option<Ms>,
    pub stop_at: Option<Ms>,
    pub started: bool,
    pub stopped: bool,
    pub force_start_now: bool,
    pub force_run_now: bool,
    pub affected_lists: BTreeSet<Ulid>,
}

impl ScheduledAction {
    pub fn new(id: Ulid, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            title: String::new(),
            start_at: None,
            stop_at: None,
            started: false,
            stopped: false,
            force_start_now: false,
            force_run_now: false,
            affected_lists: BTreeSet::new(),
        }
    }

    pub fn window(&self) -> ActionWindow {
        ActionWindow {
            start_at: self.start_at,
            stop_at: self.stop_at,
            started: self.started,
            stopped: self.stopped,
            force_start_now: self.force_start_now,
            force_run_now: self.force_run_now,
        }
    }

    /// Stopped actions are terminal and no longer editable.
    pub fn can_edit(&self) -> bool {
        !self.stopped
    }

    pub fn has_force_flag(&self) -> bool {
        self.force_start_now || self.force_run_now
    }
}

/// Result of running one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    NoChange,
    Started,
    Stopped,
    /// A repeatable kind re-applied its effect while already active.
    Reapplied,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoChange => write!(f, "No change"),
            Outcome::Started => write!(f, "Started"),
            Outcome::Stopped => write!(f, "Stopped"),
            Outcome::Reapplied => write!(f, "Reapplied"),
        }
    }
}

/// Journal record. One per persisted change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ListSaved(ProductList),
    ListDeleted { id: Ulid },
    ActionSaved(ScheduledAction),
    ActionDeleted { id: Ulid },
}
