use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};
use state_kernel::StateManager;

/// Rule set driven by a [`Session`](crate::Session).
///
/// The game owns its cells, built against the session's [`StateManager`],
/// and mutates them only while processing an action. Processing must be
/// deterministic: the same configuration and action sequence always yields
/// the same snapshot, which is what makes saved sessions replayable.
pub trait Game: Sized {
    /// Initial configuration, persisted in the save header.
    type Config: Clone + Debug + Serialize + DeserializeOwned;
    /// One player-facing action, persisted in the action log.
    type Action: Clone + Debug + Serialize + DeserializeOwned;
    /// Serializable view of the whole game state, hashed for verification.
    type Snapshot: Serialize;
    type Error: std::error::Error + Send + Sync + 'static;

    fn build(config: &Self::Config, manager: &StateManager) -> Result<Self, Self::Error>;

    /// Applies `action`. On error the session cancels everything it changed.
    fn process(&mut self, action: &Self::Action) -> Result<(), Self::Error>;

    /// Label of the change set recording `action`.
    fn label(action: &Self::Action) -> String {
        format!("{action:?}")
    }

    fn snapshot(&self) -> Self::Snapshot;
}
