//! Local session cache.
//!
//! A small string key/value store that survives between CLI invocations. Keys
//! are versioned so a future layout change can coexist with old files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use swipelabel_core::Image;
use tracing::warn;

use crate::session::SessionEvent;

pub const EMAIL_KEY: &str = "swipelabel.v1.userEmail";
pub const IMAGES_KEY: &str = "swipelabel.v1.images";
pub const INDEX_KEY: &str = "swipelabel.v1.currentImageIndex";

pub trait SessionCache {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

// =============================================================================
// File-backed cache
// =============================================================================

/// Cache stored as a JSON object in a single file.
///
/// Every write replaces the file through a temporary sibling and a rename, so a
/// crash leaves either the old or the new contents.
pub struct FileSessionCache {
    path: PathBuf,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file `session.json` inside `state_dir`.
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "Ignoring unreadable session cache {}: {}",
                    self.path.display(),
                    e
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string_pretty(entries).context("Failed to encode session")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

// =============================================================================
// In-memory cache
// =============================================================================

/// In-memory cache. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemorySessionCache {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("session cache lock poisoned"))
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// The persisted part of a session, as read back at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub email: Option<String>,
    pub images: Option<Vec<Image>>,
    pub index: Option<usize>,
}

impl SessionSnapshot {
    /// Read the snapshot. Entries that cannot be read or parsed count as absent.
    pub fn load(cache: &impl SessionCache) -> Self {
        let email = read(cache, EMAIL_KEY).filter(|e| !e.is_empty());

        let images = read(cache, IMAGES_KEY).and_then(|raw| {
            serde_json::from_str::<Vec<Image>>(&raw)
                .map_err(|e| warn!("Ignoring corrupt cached images: {}", e))
                .ok()
        });

        let index = read(cache, INDEX_KEY).and_then(|raw| {
            raw.trim()
                .parse::<usize>()
                .map_err(|e| warn!("Ignoring corrupt cached index {:?}: {}", raw, e))
                .ok()
        });

        Self {
            email,
            images,
            index,
        }
    }

    pub fn into_event(self) -> SessionEvent {
        SessionEvent::Restored {
            email: self.email,
            images: self.images,
            index: self.index,
        }
    }
}

fn read(cache: &impl SessionCache, key: &str) -> Option<String> {
    match cache.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to read {} from session cache: {:#}", key, e);
            None
        }
    }
}
