use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::color::{is_valid_color, ColorService, ColorVariations};
use crate::convert::{convert, ConvertError, ConvertOptions};
use crate::merge::{diff, Changes};
use crate::state::{StateError, StateMachine, StateTransition, SyncEvent, SyncState};
use crate::storage::{DocumentStore, Slot, StoreError};
use crate::store::{self, DEFAULT_BLOCK};
use crate::tokens::{TokenTree, TokenTreeError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(
        "token tree not found: {path}\n\
         Export the tokens from the design tool as JSON, save the file at that path, \
         then run `tokensync preview` again"
    )]
    MissingInput { path: PathBuf },
    #[error("failed to read token tree: {path}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no {slot} document to work from; {}", missing_slot_hint(.slot))]
    MissingSlot { slot: Slot },
    #[error("not a valid color: {color}")]
    InvalidColor { color: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tree(#[from] TokenTreeError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    State(#[from] StateError),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

fn missing_slot_hint(slot: &Slot) -> &'static str {
    match slot {
        Slot::Preview => "run `tokensync preview` first",
        Slot::Backup => "a backup is only taken by `tokensync preview`",
        Slot::Live => "create it, or run `tokensync preview` and `tokensync apply` first",
    }
}

/// Reads and validates the token tree at `path`.
pub fn load_token_tree(path: &Path) -> SyncResult<TokenTree> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SyncError::MissingInput {
                path: path.to_path_buf(),
            }
        } else {
            SyncError::ReadInput {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let tree = TokenTree::from_json(&contents)?;
    tracing::info!(path = %path.display(), tokens = tree.token_count(), "loaded token tree");
    Ok(tree)
}

/// Outcome of a preview run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub changes: Changes,
    pub token_count: usize,
    pub preserved_count: usize,
    pub backup_created: bool,
    pub categories: Vec<String>,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Found token categories: {}", self.categories.join(", "))?;
        if !self.backup_created {
            writeln!(f, "No live document yet; nothing was backed up.")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.changes)?;
        writeln!(f, "SUMMARY:")?;
        writeln!(f, "  * {} tokens from source", self.token_count)?;
        writeln!(f, "  * {} new tokens", self.changes.added.len())?;
        writeln!(f, "  * {} updated tokens", self.changes.updated.len())?;
        writeln!(f, "  * {} custom tokens preserved", self.preserved_count)?;
        writeln!(f)?;
        writeln!(f, "To apply changes, run: tokensync apply")?;
        if self.backup_created {
            writeln!(f, "To restore the backup, run: tokensync restore")?;
        }
        Ok(())
    }
}

/// Which slots currently hold a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStatus {
    pub live: bool,
    pub backup: bool,
    pub preview: bool,
}

impl SlotStatus {
    /// The furthest point a previous run left the cycle at.
    pub fn pending_state(self) -> SyncState {
        if self.preview {
            SyncState::Previewed
        } else if self.backup {
            SyncState::BackedUp
        } else {
            SyncState::Idle
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |present: bool| if present { "present" } else { "missing" };
        writeln!(f, "live:    {}", mark(self.live))?;
        writeln!(f, "backup:  {}", mark(self.backup))?;
        write!(f, "preview: {}", mark(self.preview))
    }
}

/// Drives preview, apply and restore over a [`DocumentStore`].
#[derive(Debug)]
pub struct SyncWorkflow<S: DocumentStore> {
    store: S,
    machine: StateMachine,
    options: ConvertOptions,
}

impl<S: DocumentStore> SyncWorkflow<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            machine: StateMachine::new(),
            options: ConvertOptions::default(),
        }
    }

    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.options.block = block.into();
        self
    }

    pub fn with_timestamp(mut self, generated_at: impl Into<String>) -> Self {
        self.options.generated_at = Some(generated_at.into());
        self
    }

    pub fn state(&self) -> SyncState {
        self.machine.state()
    }

    pub fn history(&self) -> &[StateTransition] {
        self.machine.history()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn block(&self) -> &str {
        if self.options.block.is_empty() {
            DEFAULT_BLOCK
        } else {
            &self.options.block
        }
    }

    /// Backs up the live document, converts `tree` against it and writes the
    /// result to the preview slot. The live document is left untouched.
    pub fn preview(&mut self, tree: &TokenTree) -> SyncResult<SyncReport> {
        self.machine = StateMachine::new();

        let backup_created = self.store.copy(Slot::Live, Slot::Backup)?;
        if backup_created {
            tracing::info!("backed up live document");
        } else {
            tracing::info!("no live document; continuing without backup");
        }
        self.machine.transition(SyncEvent::Backup)?;

        let live = self.store.read(Slot::Live)?.unwrap_or_default();
        let existing = store::parse(&live, self.block());
        let conversion = convert(tree, &existing, &self.options)?;
        let changes = diff(tree, &existing);
        self.machine.transition(SyncEvent::Convert)?;

        self.store.write(Slot::Preview, &conversion.document)?;
        self.machine.transition(SyncEvent::Preview)?;
        tracing::info!(
            added = changes.added.len(),
            updated = changes.updated.len(),
            preserved = conversion.preserved.len(),
            "wrote preview document"
        );

        Ok(SyncReport {
            token_count: conversion.token_count,
            preserved_count: conversion.preserved.len(),
            backup_created,
            categories: tree.keys().map(str::to_string).collect(),
            changes,
        })
    }

    /// Promotes the preview document to live and consumes it.
    pub fn apply(&mut self) -> SyncResult<()> {
        let Some(preview) = self.store.read(Slot::Preview)? else {
            return Err(SyncError::MissingSlot {
                slot: Slot::Preview,
            });
        };
        if self.machine.state() != SyncState::Previewed {
            self.machine = StateMachine::resume(SyncState::Previewed);
        }

        self.store.write(Slot::Live, &preview)?;
        self.store.remove(Slot::Preview)?;
        self.machine.transition(SyncEvent::Apply)?;
        tracing::info!(state = %self.machine, "applied preview to live document");
        Ok(())
    }

    /// Puts the backup back in place of the live document and consumes it.
    pub fn restore(&mut self) -> SyncResult<()> {
        let Some(backup) = self.store.read(Slot::Backup)? else {
            return Err(SyncError::MissingSlot { slot: Slot::Backup });
        };

        self.store.write(Slot::Live, &backup)?;
        self.store.remove(Slot::Backup)?;
        self.machine.transition(SyncEvent::Restore)?;
        tracing::info!(state = %self.machine, "restored live document from backup");
        Ok(())
    }

    /// Derives the primary palette from `color` and writes it into the live
    /// document, leaving every other declaration as it was.
    pub fn set_primary(&mut self, color: &str) -> SyncResult<ColorVariations> {
        let color = color.trim();
        if !is_valid_color(color) {
            return Err(SyncError::InvalidColor {
                color: color.to_string(),
            });
        }
        let Some(live) = self.store.read(Slot::Live)? else {
            return Err(SyncError::MissingSlot { slot: Slot::Live });
        };

        let mut service = ColorService::new(store::parse(&live, self.block()));
        let variations = service.set_primary_color(color);
        let document = store::rewrite_document(&live, self.block(), &service.primary_variables());
        self.store.write(Slot::Live, &document)?;
        tracing::info!(
            primary = %variations.primary,
            light = %variations.light,
            dark = %variations.dark,
            "updated primary colors in live document"
        );
        Ok(variations)
    }

    pub fn status(&self) -> SlotStatus {
        SlotStatus {
            live: self.store.exists(Slot::Live),
            backup: self.store.exists(Slot::Backup),
            preview: self.store.exists(Slot::Preview),
        }
    }
}
