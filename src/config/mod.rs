use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::storage::FileStore;
use crate::store::DEFAULT_BLOCK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "tokensync";
const APP_CONFIG_FILE: &str = "config.json";
const PROJECT_CONFIG_FILE: &str = "tokensync.json";

const DEFAULT_TOKENS_PATH: &str = "src/styles/token-sync/tokens-tokenstudio.json";
const DEFAULT_LIVE_PATH: &str = "src/styles/design-tokens.css";

/// Sync settings from `tokensync.json`. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Token tree exported by the design tool.
    pub tokens: PathBuf,
    /// Live variable document.
    pub live: PathBuf,
    pub backup: Option<PathBuf>,
    pub preview: Option<PathBuf>,
    /// Selector of the declaration block inside the live document.
    pub block: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tokens: PathBuf::from(DEFAULT_TOKENS_PATH),
            live: PathBuf::from(DEFAULT_LIVE_PATH),
            backup: None,
            preview: None,
            block: DEFAULT_BLOCK.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn backup_path(&self) -> PathBuf {
        self.backup
            .clone()
            .unwrap_or_else(|| sibling_path(&self.live, "backup"))
    }

    pub fn preview_path(&self) -> PathBuf {
        self.preview
            .clone()
            .unwrap_or_else(|| sibling_path(&self.live, "preview"))
    }

    pub fn file_store(&self) -> FileStore {
        FileStore::with_paths(self.live.clone(), self.backup_path(), self.preview_path())
    }
}

/// `design-tokens.css` -> `design-tokens.<tag>.css`, in the same directory.
fn sibling_path(live: &Path, tag: &str) -> PathBuf {
    let stem = live
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match live.extension() {
        Some(ext) => format!("{stem}.{tag}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{tag}"),
    };
    live.with_file_name(file_name)
}

/// Loads the first config found: `explicit`, then `./tokensync.json`, then
/// the user config directory. Unreadable or invalid files fall back to
/// defaults with a warning.
pub fn load_sync_config(explicit: Option<&Path>) -> SyncConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_sync_config_with(
        explicit,
        Path::new("."),
        xdg_config_home.as_deref(),
        home.as_deref(),
    )
}

fn load_sync_config_with(
    explicit: Option<&Path>,
    project_dir: &Path,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> SyncConfig {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                tracing::warn!(path = %path.display(), "config file not found; using defaults");
                return SyncConfig::default();
            }
            path.to_path_buf()
        }
        None => {
            let project = project_dir.join(PROJECT_CONFIG_FILE);
            let user = app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home).ok();
            match std::iter::once(project)
                .chain(user)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return SyncConfig::default(),
            }
        }
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded sync config");
                config
            }
            Err(err) => {
                tracing::warn!(?err, ?path, "failed to parse sync config; using defaults");
                SyncConfig::default()
            }
        },
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read sync config; using defaults");
            SyncConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
