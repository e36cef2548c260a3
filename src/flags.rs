//! Durable per-user flags, such as whether the metadata panel has ever been opened.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::FlagStoreError;

/// Set once the user has seen the metadata panel; suppresses the intro animation.
pub const HAS_OPENED_METADATA: &str = "mmv.hasOpenedMetadata";

pub trait FlagStore: Send + Sync {
    /// Whether `name` is set. Unreadable stores read as unset.
    fn get_flag(&self, name: &str) -> bool;

    fn set_flag(&self, name: &str, value: bool) -> Result<(), FlagStoreError>;
}

/// Flags that last for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<BTreeMap<String, bool>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get_flag(&self, name: &str) -> bool {
        self.flags.lock().get(name).copied().unwrap_or(false)
    }

    fn set_flag(&self, name: &str, value: bool) -> Result<(), FlagStoreError> {
        self.flags.lock().insert(name.to_string(), value);
        Ok(())
    }
}

/// Flags persisted as a JSON object in a file.
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    flags: Mutex<BTreeMap<String, bool>>,
}

impl FileFlagStore {
    /// Opens the store at `XDG_CONFIG_HOME/mediaview/flags.json`.
    pub fn open_default() -> Result<Self, FlagStoreError> {
        let path = Self::default_path()?;
        Self::open(&path)
    }

    pub fn default_path() -> Result<PathBuf, FlagStoreError> {
        let proj_dirs = ProjectDirs::from("", "", "mediaview").ok_or_else(|| {
            FlagStoreError::Unavailable("no home directory to keep flags in".to_string())
        })?;
        Ok(proj_dirs.config_dir().join("flags.json"))
    }

    /// Opens the store at `path`. A missing file is an empty store; a corrupt
    /// one is logged and treated as empty.
    pub fn open(path: &Path) -> Result<Self, FlagStoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create flag directory: {:?}", parent))?;
        }

        let flags = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, bool>>(&text) {
                Ok(flags) => flags,
                Err(e) => {
                    warn!(?path, error = %e, "Ignoring unreadable flag file");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read flag file: {:?}", path))
                    .into())
            }
        };

        info!(?path, count = flags.len(), "Opened flag store");
        Ok(Self {
            path: path.to_path_buf(),
            flags: Mutex::new(flags),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, flags: &BTreeMap<String, bool>) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(flags).context("Failed to encode flags")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text).with_context(|| format!("Failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

impl FlagStore for FileFlagStore {
    fn get_flag(&self, name: &str) -> bool {
        self.flags.lock().get(name).copied().unwrap_or(false)
    }

    fn set_flag(&self, name: &str, value: bool) -> Result<(), FlagStoreError> {
        let mut flags = self.flags.lock();
        if flags.get(name).copied().unwrap_or(false) == value {
            return Ok(());
        }
        flags.insert(name.to_string(), value);
        self.persist(&flags)?;
        debug!(flag = name, value, "Flag stored");
        Ok(())
    }
}
