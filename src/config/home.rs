//! The per-user ceptra directory.
//!
//! One directory holds the global `ceptra.toml` and the session store's
//! credential and history files. `ceptra init` seeds the config file from
//! the compiled template.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ConfigError;

use super::defaults::{APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CONFIG_TEMPLATE};
use super::InitOutcome;

/// Highest numbered backup tried before the newest one is reused.
const MAX_BACKUPS: usize = 100;

/// Location of the per-user ceptra directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigHome {
    dir: PathBuf,
}

impl ConfigHome {
    /// `$XDG_CONFIG_HOME/ceptra`, falling back to `~/.config/ceptra`.
    pub fn locate() -> Option<Self> {
        config_base_dir().map(|base| Self::at(base.join(APP_DIR_NAME)))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Write the default config file.
    ///
    /// An existing file is left alone unless `force` is set, in which case it
    /// is moved to the first free `ceptra.toml.bak[.N]` name first. The new
    /// file is written to a temp name and renamed into place.
    pub fn init(&self, force: bool) -> Result<InitOutcome, ConfigError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.config_file();

        let backup_path = if path.exists() {
            if !force {
                return Ok(InitOutcome::AlreadyInitialized { path });
            }
            let backup = next_backup_path(&path);
            fs::rename(&path, &backup)?;
            Some(backup)
        } else {
            None
        };

        let staged = path.with_extension("toml.tmp");
        fs::write(&staged, DEFAULT_CONFIG_TEMPLATE)?;
        fs::rename(&staged, &path)?;
        info!(path = %path.display(), backup = ?backup_path, "config initialized");

        Ok(match backup_path {
            Some(backup_path) => InitOutcome::Overwritten { path, backup_path },
            None => InitOutcome::Created { path },
        })
    }
}

fn next_backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CONFIG_FILE_NAME.to_string());
    (0..MAX_BACKUPS)
        .map(|n| match n {
            0 => path.with_file_name(format!("{name}.bak")),
            n => path.with_file_name(format!("{name}.bak.{n}")),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.with_file_name(format!("{name}.bak.{MAX_BACKUPS}")))
}

/// Base directory the ceptra directory lives in.
pub(super) fn config_base_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .or_else(dirs::config_dir)
}
