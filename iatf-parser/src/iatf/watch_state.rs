//! Shared watch registry
//!
//! Watch sessions from separate processes coordinate through one JSON file,
//! by default `~/.iatf/watch.json`. Each entry maps an absolute file path to
//! the session watching it, so `unwatch` can signal a running session to stop
//! and `rebuild` can warn when a watcher would double-rebuild the same file.
//!
//! Saves go through a temp file and rename, so a reader never observes a
//! half-written registry.

use crate::iatf::error::{IatfError, IatfResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One watch session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchInfo {
    /// RFC3339 timestamp of when the session started.
    pub started: String,
    /// Unix mtime of the file when last seen.
    pub last_modified: f64,
    /// Watching process, absent in records written by old builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// Absolute path to watch session, ordered for stable JSON output.
pub type WatchState = BTreeMap<String, WatchInfo>;

/// Handle on the registry file. All access goes through an explicit store so
/// tests can point it anywhere.
#[derive(Debug, Clone)]
pub struct WatchStateStore {
    state_file: PathBuf,
}

impl WatchStateStore {
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
        }
    }

    /// Store at the default location under the user's home directory.
    pub fn default_location() -> IatfResult<Self> {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| IatfError::Io("cannot determine home directory".to_string()))?;
        Ok(Self::new(
            PathBuf::from(home).join(".iatf").join("watch.json"),
        ))
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Load the registry; a missing file is an empty registry.
    pub fn load(&self) -> IatfResult<WatchState> {
        let data = match fs::read_to_string(&self.state_file) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(WatchState::new())
            }
            Err(err) => {
                return Err(IatfError::Io(format!(
                    "cannot read {}: {}",
                    self.state_file.display(),
                    err
                )))
            }
        };
        serde_json::from_str(&data).map_err(|err| {
            IatfError::Io(format!(
                "corrupt watch state {}: {}",
                self.state_file.display(),
                err
            ))
        })
    }

    /// Persist the registry via temp file and rename.
    pub fn save(&self, state: &WatchState) -> IatfResult<()> {
        if let Some(parent) = self.state_file.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                IatfError::Io(format!("cannot create {}: {}", parent.display(), err))
            })?;
        }
        let data = serde_json::to_string_pretty(state)
            .map_err(|err| IatfError::Io(format!("cannot encode watch state: {}", err)))?;
        let tmp = self.state_file.with_extension("json.tmp");
        fs::write(&tmp, data)
            .map_err(|err| IatfError::Io(format!("cannot write {}: {}", tmp.display(), err)))?;
        fs::rename(&tmp, &self.state_file).map_err(|err| {
            IatfError::Io(format!(
                "cannot replace {}: {}",
                self.state_file.display(),
                err
            ))
        })
    }

    /// Record a session for `path`, replacing any previous watcher.
    pub fn register(&self, path: &Path, info: WatchInfo) -> IatfResult<()> {
        let mut state = self.load()?;
        state.insert(path.display().to_string(), info);
        self.save(&state)
    }

    /// Drop the session for `path`. Returns whether a session was present.
    pub fn unregister(&self, path: &Path) -> IatfResult<bool> {
        let mut state = self.load()?;
        let removed = state.remove(&path.display().to_string()).is_some();
        if removed {
            self.save(&state)?;
        }
        Ok(removed)
    }

    /// Whether the registry still lists `path`. Watch loops poll this so that
    /// `unwatch` from another terminal stops them.
    pub fn is_watched(&self, path: &Path) -> IatfResult<bool> {
        Ok(self.load()?.contains_key(&path.display().to_string()))
    }
}
