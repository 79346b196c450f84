//! Persisted client-side state, the local-storage mirror of the browser
//! frontend. One flat string map, written whole on every commit.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

pub const KEY_AUTH_TOKEN: &str = "authToken";
pub const KEY_TRADING_MODE: &str = "tradingMode";
pub const KEY_COMPETITION_ID: &str = "competitionId";
pub const KEY_COMPETITION_NAME: &str = "competitionName";

/// Key/value storage for session and trading-mode state. `apply` commits a
/// batch of writes and removals as one observable step, so related keys
/// never straddle a partially-written state.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Option<String>;
    fn apply(&mut self, changes: &[(&str, Option<&str>)]);

    fn set(&mut self, key: &str, value: &str) {
        self.apply(&[(key, Some(value))]);
    }

    fn remove(&mut self, key: &str) {
        self.apply(&[(key, None)]);
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn apply(&mut self, changes: &[(&str, Option<&str>)]) {
        for (key, value) in changes {
            match value {
                Some(value) => {
                    self.values.insert((*key).to_string(), (*value).to_string());
                }
                None => {
                    self.values.remove(*key);
                }
            }
        }
    }
}

/// JSON map on disk. Every commit rewrites the whole file, so the on-disk
/// state always matches one `apply` boundary.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(_) => HashMap::new(),
        };
        Ok(Self { path, values })
    }

    fn persist(&self) {
        match serde_json::to_string_pretty(&self.values) {
            Ok(contents) => {
                if let Err(err) = fs::write(&self.path, contents) {
                    log::error!("failed to persist credential store: {err}");
                }
            }
            Err(err) => log::error!("failed to serialize credential store: {err}"),
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn apply(&mut self, changes: &[(&str, Option<&str>)]) {
        for (key, value) in changes {
            match value {
                Some(value) => {
                    self.values.insert((*key).to_string(), (*value).to_string());
                }
                None => {
                    self.values.remove(*key);
                }
            }
        }
        self.persist();
    }
}
