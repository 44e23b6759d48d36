//! Credential and history persistence under the user config directory.
//!
//! Layout (default root `~/.config/ceptra/`):
//!
//! - `credentials.json`: the signed-in [`Credential`], owner-only on unix.
//! - `history.json`: the last [`HistorySnapshot`] so a restarted surface can
//!   restore its transcript.
//!
//! All writes go to a sibling temporary file first and are renamed into
//! place, so a crash never leaves a half-written file behind.

use super::Credential;
use crate::history::HistorySnapshot;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const CREDENTIALS_FILE: &str = "credentials.json";
const HISTORY_FILE: &str = "history.json";
/// On-disk schema version for both files.
const STORE_FILE_VERSION: u32 = 1;

/// Filesystem-backed store for one user's credential and transcript.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedCredential {
    version: u32,
    credential: Credential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedHistory {
    version: u32,
    updated_at_millis: u64,
    history: HistorySnapshot,
}

impl SessionStore {
    /// Open/create the default store under the platform config directory.
    pub fn open_default() -> Result<Self, String> {
        let home = crate::config::ConfigHome::locate()
            .ok_or_else(|| "could not determine the user config directory".to_string())?;
        Self::open(home.dir())
    }

    /// Open/create a store rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, String> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| format!("failed to create store directory {}: {e}", root.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&root, fs::Permissions::from_mode(0o700));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_credential(&self) -> Result<Option<Credential>, String> {
        let Some(payload) = self.read_json::<PersistedCredential>(CREDENTIALS_FILE)? else {
            return Ok(None);
        };
        check_version(payload.version, CREDENTIALS_FILE)?;
        Ok(Some(payload.credential))
    }

    pub fn save_credential(&self, credential: &Credential) -> Result<(), String> {
        let payload = PersistedCredential {
            version: STORE_FILE_VERSION,
            credential: credential.clone(),
        };
        self.write_json(CREDENTIALS_FILE, &payload, true)
    }

    /// Remove the stored credential; a missing file is not an error.
    pub fn clear_credential(&self) -> Result<(), String> {
        let path = self.root.join(CREDENTIALS_FILE);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("failed to remove {}: {e}", path.display())),
        }
    }

    pub fn load_history(&self) -> Result<Option<HistorySnapshot>, String> {
        let Some(payload) = self.read_json::<PersistedHistory>(HISTORY_FILE)? else {
            return Ok(None);
        };
        check_version(payload.version, HISTORY_FILE)?;
        Ok(Some(payload.history))
    }

    pub fn save_history(&self, history: &HistorySnapshot) -> Result<(), String> {
        let payload = PersistedHistory {
            version: STORE_FILE_VERSION,
            updated_at_millis: now_unix_millis(),
            history: history.clone(),
        };
        self.write_json(HISTORY_FILE, &payload, false)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<Option<T>, String> {
        let path = self.root.join(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))
    }

    fn write_json<T: Serialize>(&self, name: &str, payload: &T, private: bool) -> Result<(), String> {
        let json = serde_json::to_vec_pretty(payload)
            .map_err(|e| format!("failed to serialize {name}: {e}"))?;
        let path = self.root.join(name);
        let tmp_path = path.with_extension("json.tmp");

        let mut options = fs::OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            if private {
                options.mode(0o600);
            }
        }
        #[cfg(not(unix))]
        let _ = private;
        let mut file = options
            .open(&tmp_path)
            .map_err(|e| format!("failed to open {}: {e}", tmp_path.display()))?;
        file.write_all(&json)
            .and_then(|_| file.flush())
            .map_err(|e| format!("failed to write {}: {e}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &path)
            .map_err(|e| format!("failed to move {} into place: {e}", path.display()))
    }
}

fn check_version(version: u32, name: &str) -> Result<(), String> {
    if version != STORE_FILE_VERSION {
        return Err(format!("unsupported {name} version {version}"));
    }
    Ok(())
}

fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
