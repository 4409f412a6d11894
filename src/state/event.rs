use super::model::SyncState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    Backup,
    Convert,
    Preview,
    Apply,
    Restore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: Option<SyncState>,
    pub event: SyncEvent,
    pub to: SyncState,
}

impl StateTransition {
    pub const fn new(from: Option<SyncState>, event: SyncEvent, to: SyncState) -> Self {
        Self { from, event, to }
    }
}
