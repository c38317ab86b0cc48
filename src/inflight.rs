use std::sync::Arc;

use dashmap::DashMap;
use ulid::Ulid;

use crate::engine::EngineError;

/// Ids currently being reconciled or run. At most one holder per id.
#[derive(Debug, Default, Clone)]
pub struct InFlight {
    active: Arc<DashMap<Ulid, ()>>,
}

/// Releases its id on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    id: Ulid,
    active: Arc<DashMap<Ulid, ()>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_enter(&self, id: Ulid) -> Result<InFlightGuard, EngineError> {
        match self.active.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(EngineError::Busy(id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    id,
                    active: Arc::clone(&self.active),
                })
            }
        }
    }

    pub fn is_active(&self, id: &Ulid) -> bool {
        self.active.contains_key(id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_busy_until_release() {
        let inflight = InFlight::new();
        let id = Ulid::new();
        let guard = inflight.try_enter(id).unwrap();
        assert!(inflight.is_active(&id));
        assert!(matches!(inflight.try_enter(id), Err(EngineError::Busy(b)) if b == id));
        drop(guard);
        assert!(!inflight.is_active(&id));
        assert!(inflight.try_enter(id).is_ok());
    }

    #[test]
    fn distinct_ids_do_not_block() {
        let inflight = InFlight::new();
        let _a = inflight.try_enter(Ulid::new()).unwrap();
        let _b = inflight.try_enter(Ulid::new()).unwrap();
    }
}
