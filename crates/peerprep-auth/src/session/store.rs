//! Session flag storage backed by a JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use peerprep_core::config::SessionConfig;
use peerprep_core::error::{AppError, ErrorKind};
use peerprep_core::types::Role;

use crate::guard::FlagSource;

use super::keys;
use super::profile::{LoginRecord, SessionProfile};

/// Key-value session flags, persisted after every mutation.
///
/// A file-backed store re-reads its file before every read, so flags
/// written or cleared by another process (the admin CLI) are seen by the
/// next guard evaluation. Mutations are built on a copy, written to disk,
/// and only then become visible in memory.
///
/// Flags have no expiry and no integrity check. Whatever is on disk is
/// trusted as-is by the role guard, which is fine because the guard only
/// decides what the client shows.
#[derive(Debug)]
pub struct SessionStore {
    /// In-memory view of the flags.
    flags: DashMap<String, String>,
    /// Backing file, `None` for an in-memory store.
    path: Option<PathBuf>,
    /// Serializes reloads and writes of the in-memory view.
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Creates a store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            flags: DashMap::new(),
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens a file-backed store.
    ///
    /// A missing file yields an empty store. A corrupt file is logged and
    /// treated as empty; it is overwritten on the next mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let flags = DashMap::new();
        for (key, value) in read_flags(&path)? {
            flags.insert(key, value);
        }

        Ok(Self {
            flags,
            path: Some(path),
            write_lock: Mutex::new(()),
        })
    }

    /// Opens the store described by the session configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self, AppError> {
        Self::open(&config.store_path)
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads a flag.
    pub fn get(&self, key: &str) -> Option<String> {
        self.read(|flags| flags.get(key).map(|v| v.value().clone()))
    }

    /// Writes a flag and persists.
    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), AppError> {
        let value = value.into();
        self.mutate(|flags| {
            flags.insert(key.to_string(), value);
        })
    }

    /// Deletes a flag and persists. Returns the previous value.
    pub fn remove(&self, key: &str) -> Result<Option<String>, AppError> {
        self.mutate(|flags| flags.remove(key))
    }

    /// Deletes every flag and persists.
    pub fn clear(&self) -> Result<(), AppError> {
        self.mutate(|flags| flags.clear())
    }

    /// Sorted copy of all flags.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read(collect)
    }

    /// Writes the flags a successful login produces.
    ///
    /// Any other role's marker is cleared first so at most one role is
    /// logged in at a time. On error nothing changes, in memory or on disk.
    pub fn record_login(&self, login: &LoginRecord) -> Result<(), AppError> {
        if login.name.trim().is_empty() {
            return Err(AppError::validation("Display name must not be empty"));
        }

        self.mutate(|flags| {
            for role in Role::ALL {
                flags.remove(role.flag_key());
            }
            for key in [keys::AVATAR, keys::TOKEN, keys::SESSION_COOKIE] {
                flags.remove(key);
            }

            flags.insert(
                login.role.flag_key().to_string(),
                keys::AUTHENTICATED_MARKER.to_string(),
            );
            flags.insert(keys::NAME.to_string(), login.name.clone());
            flags.insert(keys::EMAIL.to_string(), login.email.clone());
            if let Some(avatar) = &login.avatar {
                flags.insert(keys::AVATAR.to_string(), avatar.clone());
            }
            if let Some(token) = &login.token {
                flags.insert(keys::TOKEN.to_string(), token.clone());
            }
            if let Some(cookie) = &login.cookie {
                flags.insert(keys::SESSION_COOKIE.to_string(), cookie.clone());
            }
        })?;

        info!(role = %login.role, "Session flags recorded");
        Ok(())
    }

    /// Removes every flag written by login.
    pub fn logout(&self) -> Result<(), AppError> {
        self.clear()?;
        info!("Session flags cleared");
        Ok(())
    }

    /// Typed profile for navigation chrome.
    pub fn profile(&self) -> SessionProfile {
        let flags = self.snapshot();
        let role = Role::ALL.into_iter().find(|role| {
            flags.get(role.flag_key()).map(String::as_str) == Some(keys::AUTHENTICATED_MARKER)
        });

        SessionProfile {
            role,
            name: flags.get(keys::NAME).cloned(),
            email: flags.get(keys::EMAIL).cloned(),
            avatar: flags.get(keys::AVATAR).cloned(),
            has_token: flags.contains_key(keys::TOKEN),
            has_cookie: flags.contains_key(keys::SESSION_COOKIE),
        }
    }

    /// Cookie the realtime transports should present.
    pub fn session_cookie(&self) -> Option<String> {
        self.get(keys::SESSION_COOKIE).filter(|c| !c.is_empty())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` over the flags after picking up any change on disk.
    ///
    /// An unreadable file keeps the last view.
    fn read<R>(&self, f: impl FnOnce(&DashMap<String, String>) -> R) -> R {
        let _guard = self.lock();
        if let Some(path) = &self.path {
            match read_flags(path) {
                Ok(flags) => self.replace(flags),
                Err(e) => warn!(path = %path.display(), error = %e, "Session file unreadable, using last view"),
            }
        }
        f(&self.flags)
    }

    /// Applies `f` to a copy of the current flags, persists the copy, then
    /// swaps it in.
    fn mutate<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> Result<R, AppError> {
        let _guard = self.lock();
        let mut next = match &self.path {
            Some(path) => read_flags(path)?,
            None => collect(&self.flags),
        };

        let out = f(&mut next);
        if let Some(path) = &self.path {
            write_flags(path, &next)?;
        }
        self.replace(next);
        Ok(out)
    }

    fn replace(&self, flags: BTreeMap<String, String>) {
        self.flags.retain(|key, _| flags.contains_key(key));
        for (key, value) in flags {
            self.flags.insert(key, value);
        }
    }
}

impl FlagSource for SessionStore {
    fn flag(&self, key: &str) -> Option<String> {
        self.get(key)
    }
}

fn collect(flags: &DashMap<String, String>) -> BTreeMap<String, String> {
    flags
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}

/// Reads the flag file. Missing and corrupt files read as empty.
fn read_flags(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(flags) => Ok(flags),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt session file, treating as empty");
                Ok(BTreeMap::new())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No session file yet");
            Ok(BTreeMap::new())
        }
        Err(e) => Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to read session file '{}'", path.display()),
            e,
        )),
    }
}

/// Writes the flags to a temporary sibling, then renames it over `path`.
fn write_flags(path: &Path, flags: &BTreeMap<String, String>) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let body = serde_json::to_string_pretty(flags)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;

    debug!(path = %path.display(), "Session flags persisted");
    Ok(())
}
