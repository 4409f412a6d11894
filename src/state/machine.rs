use super::error::{StateError, StateResult};
use super::{event::StateTransition, SyncEvent, SyncState};

#[derive(Debug)]
pub struct StateMachine {
    state: SyncState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::resume(SyncState::default())
    }

    /// Starts from a state recovered from slot existence, e.g. `Previewed`
    /// when a preview document is on disk.
    pub fn resume(state: SyncState) -> Self {
        Self {
            state,
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn can_transition(&self, event: SyncEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SyncEvent) -> Option<SyncState> {
        use SyncEvent::*;
        match (self.state, event) {
            (SyncState::Idle, Backup) => Some(SyncState::BackedUp),
            (SyncState::BackedUp, Convert) => Some(SyncState::Converted),
            (SyncState::Converted, Preview) => Some(SyncState::Previewed),
            (SyncState::Previewed, Apply) => Some(SyncState::Applied),
            (_, Restore) => Some(SyncState::Restored),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SyncEvent) -> StateResult<SyncState> {
        tracing::debug!(from = ?self.state, event = ?event, "request sync transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid sync transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        let record = StateTransition::new(Some(self.state), event, next);
        self.state = next;
        self.transition_history.push(record);

        Ok(self.state)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyncState::{:?}", self.state)
    }
}
