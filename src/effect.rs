use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::codec::ItemSet;
use crate::engine::EngineError;
use crate::limits::{MAX_KIND_LABEL_LEN, MAX_KIND_TAG_LEN};
use crate::model::ScheduledAction;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EffectError(pub String);

/// The domain effect of an action kind, applied to the action's effective item set.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    async fn activate(&self, action: &ScheduledAction, items: &ItemSet) -> Result<(), EffectError>;
    async fn deactivate(&self, action: &ScheduledAction, items: &ItemSet) -> Result<(), EffectError>;
}

/// Behavior bundle for one action kind.
#[derive(Clone)]
pub struct ActionKind {
    pub tag: String,
    /// Singular display name, used in derived action titles.
    pub label: String,
    /// Repeatable kinds re-apply their effect when force-run while active.
    pub repeatable: bool,
    pub handler: Arc<dyn EffectHandler>,
}

impl std::fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionKind")
            .field("tag", &self.tag)
            .field("label", &self.label)
            .field("repeatable", &self.repeatable)
            .finish_non_exhaustive()
    }
}

impl ActionKind {
    pub fn new(tag: impl Into<String>, label: impl Into<String>, handler: Arc<dyn EffectHandler>) -> Self {
        Self {
            tag: tag.into(),
            label: label.into(),
            repeatable: false,
            handler,
        }
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

/// Explicit kind table, filled at startup and injected into the runner.
#[derive(Debug, Default, Clone)]
pub struct KindRegistry {
    kinds: BTreeMap<String, ActionKind>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ActionKind) -> Result<(), EngineError> {
        if kind.tag.is_empty() || kind.tag.len() > MAX_KIND_TAG_LEN {
            return Err(EngineError::Configuration(format!(
                "action kind tag {:?} must be 1..={MAX_KIND_TAG_LEN} bytes",
                kind.tag
            )));
        }
        if kind.label.trim().is_empty() || kind.label.len() > MAX_KIND_LABEL_LEN {
            return Err(EngineError::Configuration(format!(
                "action kind {:?} label must be 1..={MAX_KIND_LABEL_LEN} bytes",
                kind.tag
            )));
        }
        if self.kinds.contains_key(&kind.tag) {
            return Err(EngineError::Configuration(format!(
                "action kind {:?} registered twice",
                kind.tag
            )));
        }
        self.kinds.insert(kind.tag.clone(), kind);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Result<&ActionKind, EngineError> {
        self.kinds
            .get(tag)
            .ok_or_else(|| EngineError::Configuration(format!("unknown action kind {tag:?}")))
    }

    /// `(tag, label)` pairs in tag order.
    pub fn kinds(&self) -> Vec<(&str, &str)> {
        self.kinds
            .values()
            .map(|k| (k.tag.as_str(), k.label.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Effect that only records the transition in the log. Registered as the `log` kind
/// by the daemon so schedules can be exercised before a real effect is wired in.
#[derive(Debug, Default)]
pub struct LogEffect;

#[async_trait]
impl EffectHandler for LogEffect {
    async fn activate(&self, action: &ScheduledAction, items: &ItemSet) -> Result<(), EffectError> {
        info!("activate {} on {} items: {}", action.id, items.len(), action.title);
        Ok(())
    }

    async fn deactivate(&self, action: &ScheduledAction, items: &ItemSet) -> Result<(), EffectError> {
        info!("deactivate {} on {} items: {}", action.id, items.len(), action.title);
        Ok(())
    }
}
