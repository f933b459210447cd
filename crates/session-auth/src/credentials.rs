//! Credential storage for the session's token pair
//!
//! The store holds exactly two secrets: the short-lived access credential and
//! the longer-lived refresh credential. They are written and cleared together,
//! so a reader sees either a full pair or nothing.
//!
//! Reads are synchronous and never fail. The outbound stage reads the store on
//! every request and must not block behind a slow disk, so every store keeps
//! the current pair in memory and only writes go to the backing medium.

use std::path::{Path, PathBuf};

use common::Secret;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// The access/refresh credential pair of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPair {
    /// Bearer credential sent on every request
    pub access: Secret<String>,
    /// Credential exchanged for a new pair when the access credential expires
    pub refresh: Secret<String>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: Secret::new(refresh.into()),
        }
    }
}

/// Get/set/clear contract over the session's credential pair.
///
/// `set` and `clear` may fail when the backing medium does; the in-memory view
/// is updated first so the session keeps working for the life of the process.
pub trait CredentialStore: Send + Sync {
    /// Current pair, or `None` when logged out.
    fn get(&self) -> Option<CredentialPair>;

    /// Replace the stored pair.
    fn set(&self, pair: CredentialPair) -> Result<()>;

    /// Remove both credentials.
    fn clear(&self) -> Result<()>;
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<Option<CredentialPair>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a pair (tests, or tokens handed over by another process).
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            state: RwLock::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Option<CredentialPair> {
        self.state.read().clone()
    }

    fn set(&self, pair: CredentialPair) -> Result<()> {
        *self.state.write() = Some(pair);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.state.write() = None;
        Ok(())
    }
}

/// On-disk representation, keyed like the browser storage entries.
#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    access_token: String,
    refresh_token: String,
}

/// JSON-file backed store.
///
/// All writes use atomic temp-file + rename so a crash never leaves a
/// half-written pair behind. The file is created with 0600 permissions.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<Option<CredentialPair>>,
}

impl FileStore {
    /// Load the pair from `path`.
    ///
    /// A missing file is a logged-out session, not an error. The file is not
    /// created until the first `set`.
    pub fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let stored: StoredCredentials = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), "loaded session credentials");
            Some(CredentialPair::new(stored.access_token, stored.refresh_token))
        } else {
            info!(path = %path.display(), "credential file not found, starting logged out");
            None
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Option<CredentialPair> {
        self.state.read().clone()
    }

    fn set(&self, pair: CredentialPair) -> Result<()> {
        let stored = StoredCredentials {
            access_token: pair.access.as_str().to_owned(),
            refresh_token: pair.refresh.as_str().to_owned(),
        };
        let mut state = self.state.write();
        *state = Some(pair);
        write_atomic(&self.path, &stored)
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state.write();
        *state = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(format!("removing credential file: {e}"))),
        }
    }
}

/// Write credentials to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Permissions are set to 0600 before the rename since the file
/// holds bearer tokens.
fn write_atomic(path: &Path, data: &StoredCredentials) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => return Err(Error::Io("credential path has no parent directory".into())),
    };

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    std::fs::write(&tmp_path, json.as_bytes())
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp_path, perms)
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
