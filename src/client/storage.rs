//! Durable key-value storage for the client, shaped like browser local storage.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::model::sample::Sample;

/// Key under which the sample list lives.
pub const SAMPLES_KEY: &str = "samples";

const STORE_DIR: &str = "essay-grader";
const STORE_FILE: &str = "storage.json";

pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> ClientResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> ClientResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> ClientResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten whole on every `set_item`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STORE_DIR)
            .join(STORE_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> ClientResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&self.path).map_err(|e| storage_err(&self.path, e))?;
        if data.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(data))
    }

    fn read_all(&self) -> ClientResult<BTreeMap<String, String>> {
        match self.read_raw()? {
            Some(data) => serde_json::from_str(&data).map_err(|e| storage_err(&self.path, e)),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Like `read_all`, but an unparseable file counts as empty so the next write replaces it.
    fn read_all_for_write(&self) -> ClientResult<BTreeMap<String, String>> {
        let Some(data) = self.read_raw()? else {
            return Ok(BTreeMap::new());
        };

        match serde_json::from_str(&data) {
            Ok(items) => Ok(items),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "storage file is corrupt, overwriting it");
                Ok(BTreeMap::new())
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> ClientResult<()> {
        let mut items = self.read_all_for_write()?;
        items.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&items).map_err(|e| storage_err(&self.path, e))?;
        write_atomic(&self.path, json.as_bytes())
    }
}

/// Reads the stored sample list. Missing or unreadable data yields an empty list.
pub fn load_samples<S: KeyValueStore + ?Sized>(store: &S) -> Vec<Sample> {
    let raw = match store.get_item(SAMPLES_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "failed to read stored samples");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Sample>>(&raw) {
        Ok(samples) => {
            debug!(count = samples.len(), "loaded stored samples");
            samples
        }
        Err(e) => {
            warn!(error = %e, "stored samples are not valid JSON, starting empty");
            Vec::new()
        }
    }
}

/// Overwrites the stored sample list.
pub fn save_samples<S: KeyValueStore + ?Sized>(store: &mut S, samples: &[Sample]) -> ClientResult<()> {
    let json = serde_json::to_string(samples).map_err(|e| ClientError::Storage {
        message: format!("failed to serialize samples: {e}"),
    })?;
    store.set_item(SAMPLES_KEY, &json)
}

fn storage_err(path: &Path, err: impl std::fmt::Display) -> ClientError {
    ClientError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> ClientResult<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).map_err(|e| storage_err(parent, e))?;
    }

    fs::write(&tmp, bytes).map_err(|e| storage_err(&tmp, e))?;

    if path.exists() {
        fs::remove_file(path).map_err(|e| storage_err(path, e))?;
    }

    fs::rename(&tmp, path).map_err(|e| storage_err(path, e))?;

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => STORE_FILE.to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}
