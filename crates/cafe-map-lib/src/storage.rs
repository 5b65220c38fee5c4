//! Map-state persistence
//!
//! The last viewport (center and zoom) survives a restart so the map reopens
//! where the user left it. Persistence goes through a `StorageBackend` trait
//! with string key/value primitives, so the engine does not care whether the
//! backing store is a JSON file, browser localStorage or an in-memory map in
//! tests. Saved state expires after 24 hours; stale or corrupt data reads as
//! absent rather than failing the startup path.

use geo::Point;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Storage key for the persisted viewport
pub const MAP_STATE_KEY: &str = "cafeMapState";

/// Saved map state older than this is ignored
const MAP_STATE_TTL_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Platform storage error: {0}")]
    Platform(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Simple generic storage backend trait.
///
/// Keys and values are UTF-8 strings. Structured data goes through the free
/// `save_json_backend` / `load_json_backend` helpers, which are kept out of
/// the trait so it stays object-safe.
pub trait StorageBackend: Send + Sync {
    /// Store a string value for a key.
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read a string value for a key. Returns Ok(None) when key is missing.
    fn get_string(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove a key (no-op if key does not exist).
    fn remove(&self, key: &str) -> StorageResult<()>;
}

pub fn save_json_backend<T: Serialize>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    match serde_json::to_string(value) {
        Ok(s) => backend.set_string(key, &s),
        Err(e) => Err(StorageError::Json(e.to_string())),
    }
}

pub fn load_json_backend<T: DeserializeOwned>(
    backend: &dyn StorageBackend,
    key: &str,
) -> StorageResult<Option<T>> {
    match backend.get_string(key)? {
        Some(s) => match serde_json::from_str::<T>(&s) {
            Ok(v) => Ok(Some(v)),
            Err(e) => Err(StorageError::Json(e.to_string())),
        },
        None => Ok(None),
    }
}

/// In-memory backend for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))?;
        Ok(guard.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))?;
        guard.remove(key);
        Ok(())
    }
}

/// File-based storage: stores a single JSON file which is a map of key -> string value.
///
/// On init, the file is read into memory; mutations update memory and flush
/// the file back to disk synchronously.
pub struct FileStorage {
    path: PathBuf,
    inner: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Default storage file path for the current user:
    /// - On Windows: %APPDATA%/CafeMapViewer/storage.json
    /// - Else: $HOME/.config/cafe-map-viewer/storage.json
    fn default_storage_path() -> PathBuf {
        if cfg!(windows)
            && let Ok(appdata) = std::env::var("APPDATA")
        {
            return Path::new(&appdata)
                .join("CafeMapViewer")
                .join("storage.json");
        }

        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home)
                .join(".config")
                .join("cafe-map-viewer")
                .join("storage.json");
        }

        Path::new(".").join("cafe-map-viewer-storage.json")
    }

    pub fn new_with_path(path: Option<PathBuf>) -> Result<Self, StorageError> {
        let path = path.unwrap_or_else(Self::default_storage_path);

        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            return Err(StorageError::Io(format!(
                "Failed to create storage parent directory: {}",
                e
            )));
        }

        let mut map: HashMap<String, String> = HashMap::new();
        if path.exists() {
            let mut file = fs::File::open(&path)
                .map_err(|e| StorageError::Io(format!("Failed to open storage file: {}", e)))?;
            let mut s = String::new();
            file.read_to_string(&mut s)
                .map_err(|e| StorageError::Io(format!("Failed to read storage file: {}", e)))?;
            if !s.trim().is_empty() {
                map = serde_json::from_str::<HashMap<String, String>>(&s).map_err(|e| {
                    StorageError::Json(format!("Failed to parse storage JSON: {}", e))
                })?;
            }
        } else {
            fs::File::create(&path)
                .map_err(|e| StorageError::Io(format!("Failed to create storage file: {}", e)))?;
        }

        Ok(FileStorage {
            path,
            inner: Mutex::new(map),
        })
    }

    fn flush_locked(&self, locked: &HashMap<String, String>) -> StorageResult<()> {
        let s = serde_json::to_string_pretty(locked)
            .map_err(|e| StorageError::Json(e.to_string()))?;
        fs::write(&self.path, s).map_err(|e| StorageError::Io(format!("write failed: {}", e)))
    }
}

impl StorageBackend for FileStorage {
    fn set_string(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))?;
        guard.insert(key.to_string(), value.to_string());
        self.flush_locked(&guard)
    }

    fn get_string(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))?;
        Ok(guard.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|e| StorageError::Platform(format!("mutex poisoned: {:?}", e)))?;
        guard.remove(key);
        self.flush_locked(&guard)
    }
}

/// Viewport snapshot persisted across sessions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavedMapState {
    pub lng: f64,
    pub lat: f64,
    pub zoom: f64,
    /// Wall-clock time of the save, milliseconds since the Unix epoch
    pub saved_at_ms: u64,
}

impl SavedMapState {
    pub fn center(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

/// Persist the current viewport under [`MAP_STATE_KEY`]
pub fn save_map_state(
    backend: &dyn StorageBackend,
    center: Point<f64>,
    zoom: f64,
    now_ms: u64,
) -> StorageResult<()> {
    let state = SavedMapState {
        lng: center.x(),
        lat: center.y(),
        zoom,
        saved_at_ms: now_ms,
    };
    save_json_backend(backend, MAP_STATE_KEY, &state)
}

/// Restore the persisted viewport, if present and fresh.
///
/// Missing, expired or unreadable state all yield `None`: a failed restore
/// must never block startup, the map just opens at its default position.
pub fn load_map_state(backend: &dyn StorageBackend, now_ms: u64) -> Option<SavedMapState> {
    let state: SavedMapState = match load_json_backend(backend, MAP_STATE_KEY) {
        Ok(Some(state)) => state,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!("Ignoring unreadable saved map state: {error}");
            return None;
        }
    };

    if now_ms.saturating_sub(state.saved_at_ms) > MAP_STATE_TTL_MS {
        tracing::debug!("Ignoring saved map state older than 24h");
        return None;
    }
    Some(state)
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
