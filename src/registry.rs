// Local registry of uploaded image IDs. The registry is a JSON array of
// strings kept in a single file; it is read and rewritten in full on every
// mutation. There is no locking: two processes writing at once may lose an
// update, and a crash mid-write can leave a truncated file, which simply
// loads as an empty registry next time.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to the registry file. Construct once per process with the path
/// from `Config`.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Registry { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all IDs. A missing or unreadable file, or content that is not a
    /// JSON array, yields an empty list. Null, non-string and empty entries
    /// are dropped.
    pub fn load(&self) -> Vec<String> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!("Cannot read registry {}: {}", self.path.display(), e);
                }
                return Vec::new();
            }
        };
        let entries: Vec<Value> = match serde_json::from_str(&text) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring malformed registry {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        entries
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Overwrite the file with `ids`, creating parent directories as needed.
    pub fn save(&self, ids: &[String]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(ids)?;
        fs::write(&self.path, json)?;
        debug!("Saved {} id(s) to {}", ids.len(), self.path.display());
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.load().iter().any(|known| known == id)
    }

    /// Append `id` unless already present. Returns whether it was added.
    pub fn register(&self, id: &str) -> io::Result<bool> {
        let mut ids = self.load();
        if ids.iter().any(|known| known == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.save(&ids)?;
        Ok(true)
    }

    /// Remove `id` if present. Returns whether it was removed; the file is
    /// left untouched otherwise.
    pub fn remove(&self, id: &str) -> io::Result<bool> {
        let mut ids = self.load();
        let Some(pos) = ids.iter().position(|known| known == id) else {
            return Ok(false);
        };
        ids.remove(pos);
        self.save(&ids)?;
        Ok(true)
    }
}
