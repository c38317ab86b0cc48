use ulid::Ulid;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid input that must block the save (bad window, unknown kind, …).
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("not found: {0}")]
    NotFound(Ulid),
    #[error("effect failed for action {action_id}: {message}")]
    EffectFailure { action_id: Ulid, message: String },
    #[error("could not find a free title for {0:?}")]
    TitleCollisionExhausted(String),
    #[error("title already taken: {0:?}")]
    TitleTaken(String),
    #[error("already being processed: {0}")]
    Busy(Ulid),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("journal error: {0}")]
    JournalError(String),
}
