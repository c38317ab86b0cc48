use async_trait::async_trait;
use ulid::Ulid;

use crate::engine::{Engine, EngineError};
use crate::model::*;

/// Persistence seam consumed by the resolver, runner and sweep.
///
/// Implementations must serialize writes per entity; the bundled [`Engine`]
/// does, and callers additionally guard in-flight work with
/// [`InFlight`](crate::inflight::InFlight).
#[async_trait]
pub trait Datastore: Send + Sync {
    async fn load_list(&self, id: Ulid) -> Result<Option<ProductList>, EngineError>;
    async fn save_list(&self, list: ProductList) -> Result<(), EngineError>;
    async fn delete_list(&self, id: Ulid) -> Result<(), EngineError>;
    async fn find_list_by_title(&self, title: &str) -> Result<Option<ProductList>, EngineError>;
    async fn list_ids(&self) -> Result<Vec<Ulid>, EngineError>;

    async fn load_action(&self, id: Ulid) -> Result<Option<ScheduledAction>, EngineError>;
    async fn save_action(&self, action: ScheduledAction) -> Result<(), EngineError>;
    async fn delete_action(&self, id: Ulid) -> Result<(), EngineError>;
    async fn actions_startable_at(&self, now: Ms) -> Result<Vec<ScheduledAction>, EngineError>;
    async fn actions_stoppable_at(&self, now: Ms) -> Result<Vec<ScheduledAction>, EngineError>;
    async fn actions_for_list(&self, list_id: Ulid) -> Result<Vec<ScheduledAction>, EngineError>;
}

#[async_trait]
impl Datastore for Engine {
    async fn load_list(&self, id: Ulid) -> Result<Option<ProductList>, EngineError> {
        Ok(self.get_list(&id))
    }

    async fn save_list(&self, list: ProductList) -> Result<(), EngineError> {
        Engine::save_list(self, list).await
    }

    async fn delete_list(&self, id: Ulid) -> Result<(), EngineError> {
        Engine::delete_list(self, id).await
    }

    async fn find_list_by_title(&self, title: &str) -> Result<Option<ProductList>, EngineError> {
        Ok(Engine::find_list_by_title(self, title))
    }

    async fn list_ids(&self) -> Result<Vec<Ulid>, EngineError> {
        Ok(Engine::list_ids(self))
    }

    async fn load_action(&self, id: Ulid) -> Result<Option<ScheduledAction>, EngineError> {
        Ok(self.get_action(&id))
    }

    async fn save_action(&self, action: ScheduledAction) -> Result<(), EngineError> {
        Engine::save_action(self, action).await
    }

    async fn delete_action(&self, id: Ulid) -> Result<(), EngineError> {
        Engine::delete_action(self, id).await
    }

    async fn actions_startable_at(&self, now: Ms) -> Result<Vec<ScheduledAction>, EngineError> {
        Ok(Engine::actions_startable_at(self, now))
    }

    async fn actions_stoppable_at(&self, now: Ms) -> Result<Vec<ScheduledAction>, EngineError> {
        Ok(Engine::actions_stoppable_at(self, now))
    }

    async fn actions_for_list(&self, list_id: Ulid) -> Result<Vec<ScheduledAction>, EngineError> {
        Ok(Engine::actions_for_list(self, &list_id))
    }
}
