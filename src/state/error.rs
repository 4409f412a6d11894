use super::event::SyncEvent;
use super::model::SyncState;
use thiserror::Error;

pub type StateResult<T> = std::result::Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid sync transition: from {from:?} using event {event:?}")]
    InvalidStateTransition { from: SyncState, event: SyncEvent },
}
