use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

const TEMP_SUFFIX: &str = ".tmp";

/// The three documents a sync cycle works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Live,
    Backup,
    Preview,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Live, Slot::Backup, Slot::Preview];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Backup => "backup",
            Self::Preview => "preview",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {slot} document: {path}")]
    Read {
        slot: Slot,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {slot} document: {path}")]
    Write {
        slot: Slot,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {slot} document: {path}")]
    Remove {
        slot: Slot,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Whole-document access to the live, backup and preview slots.
///
/// A slot exists exactly when `read` returns `Some`. Writes replace the whole
/// document.
pub trait DocumentStore {
    fn read(&self, slot: Slot) -> StoreResult<Option<String>>;
    fn write(&mut self, slot: Slot, contents: &str) -> StoreResult<()>;
    /// Returns whether there was anything to remove.
    fn remove(&mut self, slot: Slot) -> StoreResult<bool>;
    fn exists(&self, slot: Slot) -> bool;

    /// Copies `from` over `to`; `false` when `from` does not exist.
    fn copy(&mut self, from: Slot, to: Slot) -> StoreResult<bool> {
        match self.read(from)? {
            Some(contents) => {
                self.write(to, &contents)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Slots backed by three files.
#[derive(Debug, Clone)]
pub struct FileStore {
    live: PathBuf,
    backup: PathBuf,
    preview: PathBuf,
}

impl FileStore {
    pub const fn with_paths(live: PathBuf, backup: PathBuf, preview: PathBuf) -> Self {
        Self {
            live,
            backup,
            preview,
        }
    }

    pub fn path(&self, slot: Slot) -> &Path {
        match slot {
            Slot::Live => &self.live,
            Slot::Backup => &self.backup,
            Slot::Preview => &self.preview,
        }
    }
}

impl DocumentStore for FileStore {
    fn read(&self, slot: Slot) -> StoreResult<Option<String>> {
        let path = self.path(slot);
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                slot,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write(&mut self, slot: Slot, contents: &str) -> StoreResult<()> {
        let path = self.path(slot);
        write_replace(path, contents).map_err(|source| StoreError::Write {
            slot,
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(%slot, path = %path.display(), bytes = contents.len(), "wrote document");
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> StoreResult<bool> {
        let path = self.path(slot);
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Remove {
                slot,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn exists(&self, slot: Slot) -> bool {
        self.path(slot).is_file()
    }
}

/// Writes next to `destination` and renames over it, so readers never see a
/// half-written document.
fn write_replace(destination: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut temp = destination.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents)?;
    if let Err(err) = fs::rename(&temp, destination) {
        let _ = fs::remove_file(&temp);
        return Err(err);
    }
    Ok(())
}

/// Slots held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<Slot, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_live(contents: impl Into<String>) -> Self {
        let mut store = Self::new();
        store.slots.insert(Slot::Live, contents.into());
        store
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, slot: Slot) -> StoreResult<Option<String>> {
        Ok(self.slots.get(&slot).cloned())
    }

    fn write(&mut self, slot: Slot, contents: &str) -> StoreResult<()> {
        self.slots.insert(slot, contents.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> StoreResult<bool> {
        Ok(self.slots.remove(&slot).is_some())
    }

    fn exists(&self, slot: Slot) -> bool {
        self.slots.contains_key(&slot)
    }
}
