//! Background service seam
//!
//! The daemon front end needs three things from the engine: a config record
//! naming which directories to watch, a PID file to tell whether a daemon is
//! alive, and a status snapshot for `daemon status`. [`ServiceManager`] is
//! the seam; [`LocalDaemon`] is the file-based implementation the CLI uses.
//! OS-level service registration (launchd, systemd) would be another
//! implementor and is deliberately outside the engine.

use crate::iatf::error::{IatfError, IatfResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Daemon configuration, stored as JSON next to the watch registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directories scanned for `.iatf` files.
    #[serde(default)]
    pub watch_paths: Vec<String>,
}

/// Snapshot returned by [`ServiceManager::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStatus {
    pub running: bool,
    pub pid: Option<u32>,
    pub watch_paths: Vec<String>,
}

/// Operations the daemon front end needs from a service backend.
pub trait ServiceManager {
    /// Record that a daemon with this PID is active.
    fn install(&self, pid: u32) -> IatfResult<()>;
    /// Remove the active-daemon record.
    fn uninstall(&self) -> IatfResult<()>;
    /// Current liveness and configuration.
    fn status(&self) -> IatfResult<ServiceStatus>;
}

/// File-based daemon bookkeeping rooted at a base directory, by default
/// `~/.iatf`.
#[derive(Debug, Clone)]
pub struct LocalDaemon {
    base: PathBuf,
}

impl LocalDaemon {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn default_location() -> IatfResult<Self> {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| IatfError::Io("cannot determine home directory".to_string()))?;
        Ok(Self::new(PathBuf::from(home).join(".iatf")))
    }

    pub fn config_path(&self) -> PathBuf {
        self.base.join("daemon.json")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.base.join("daemon.pid")
    }

    /// A missing config file is an empty config.
    pub fn load_config(&self) -> IatfResult<DaemonConfig> {
        let path = self.config_path();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(DaemonConfig::default())
            }
            Err(err) => {
                return Err(IatfError::Io(format!(
                    "cannot read {}: {}",
                    path.display(),
                    err
                )))
            }
        };
        serde_json::from_str(&data)
            .map_err(|err| IatfError::Io(format!("corrupt config {}: {}", path.display(), err)))
    }

    pub fn save_config(&self, config: &DaemonConfig) -> IatfResult<()> {
        fs::create_dir_all(&self.base)
            .map_err(|err| IatfError::Io(format!("cannot create {}: {}", self.base.display(), err)))?;
        let data = serde_json::to_string_pretty(config)
            .map_err(|err| IatfError::Io(format!("cannot encode config: {}", err)))?;
        fs::write(self.config_path(), data).map_err(|err| {
            IatfError::Io(format!("cannot write {}: {}", self.config_path().display(), err))
        })
    }

    fn load_pid(&self) -> Option<u32> {
        fs::read_to_string(self.pid_path())
            .ok()
            .and_then(|data| data.trim().parse().ok())
    }
}

impl ServiceManager for LocalDaemon {
    fn install(&self, pid: u32) -> IatfResult<()> {
        fs::create_dir_all(&self.base)
            .map_err(|err| IatfError::Io(format!("cannot create {}: {}", self.base.display(), err)))?;
        fs::write(self.pid_path(), pid.to_string()).map_err(|err| {
            IatfError::Io(format!("cannot write {}: {}", self.pid_path().display(), err))
        })
    }

    fn uninstall(&self) -> IatfResult<()> {
        match fs::remove_file(self.pid_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(IatfError::Io(format!(
                "cannot remove {}: {}",
                self.pid_path().display(),
                err
            ))),
        }
    }

    fn status(&self) -> IatfResult<ServiceStatus> {
        let config = self.load_config()?;
        let pid = self.load_pid();
        let running = pid.map(process_running).unwrap_or(false);
        Ok(ServiceStatus {
            running,
            pid,
            watch_paths: config.watch_paths,
        })
    }
}

fn process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}
