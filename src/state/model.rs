/// Where a sync cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    BackedUp,
    Converted,
    Previewed,
    Applied,
    Restored,
}

