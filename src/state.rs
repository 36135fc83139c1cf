//! Persisted security-state store
//!
//! The state file is a YAML mapping consumed downstream as a deployment
//! variable overlay (`-e @security.yml`). Keys are persisted sorted under an
//! explicit document-start marker so the file stays human-diffable.
//!
//! Access is single-threaded and single-instance by contract: no locking is
//! implemented, and the operator is responsible for not running two
//! invocations against the same path at once.

use anyhow::Context;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SetupError};

/// Top-level flag stamped on every successful transaction.
pub const SECURITY_ENABLED_KEY: &str = "security_enabled";

/// One principal/secret pair consumed by the scheduler's credential list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkCredential {
    pub principal: String,
    pub secret: String,
}

/// One private registry login collected from the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryLogin {
    pub username: String,
    pub password: String,
    pub email: String,
    pub registry: String,
}

/// In-memory security-state mapping.
///
/// A thin wrapper over a sorted map of setting name to YAML value; routines
/// mutate it in place inside a [`StateStore::with_state`] transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityState {
    map: BTreeMap<String, Value>,
}

impl SecurityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).and_then(Value::as_bool)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.map.insert(key.to_string(), value);
    }

    pub fn set_str(&mut self, key: &str, value: impl Into<String>) {
        self.set(key, Value::String(value.into()));
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, Value::Bool(value));
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Decode a typed list stored under `key`; absent means empty.
    pub fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.map.get(key) {
            None => Ok(Vec::new()),
            Some(value) => serde_yaml::from_value(value.clone()).map_err(|e| {
                SetupError::state(format!("setting '{key}' has an unexpected shape: {e}"))
            }),
        }
    }

    /// Encode a typed list under `key`.
    pub fn set_list<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<()> {
        let value = serde_yaml::to_value(items)?;
        self.set(key, value);
        Ok(())
    }

    /// Serialize to the persisted document form: sorted keys, `---` marker.
    pub fn to_document(&self) -> Result<String> {
        let body = serde_yaml::to_string(&self.map)?;
        Ok(format!("---\n{body}"))
    }

    fn from_document(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(content)?;
        match value {
            Value::Null => Ok(Self::new()),
            other => {
                let map: BTreeMap<String, Value> = serde_yaml::from_value(other)?;
                Ok(Self { map })
            }
        }
    }
}

/// Read-modify-write access to the persisted security state.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted mapping, or an empty mapping if the file is absent.
    ///
    /// Present-but-unparseable content is fatal: a corrupt state file is
    /// never silently reset.
    pub fn read(&self) -> Result<SecurityState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no state file at {:?}, starting empty", self.path);
                return Ok(SecurityState::new());
            }
            Err(e) => {
                return Err(SetupError::state(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        SecurityState::from_document(&content).map_err(|e| {
            SetupError::state(format!(
                "{} exists but is not a valid YAML mapping: {e}\n\
                 Fix the file by hand or move it aside; it will not be overwritten.",
                self.path.display()
            ))
        })
    }

    /// Scoped read-modify-write transaction.
    ///
    /// Reads the current mapping, hands it to `mutate`, and persists only if
    /// the mutator returns `Ok` - stamping [`SECURITY_ENABLED_KEY`] first. A
    /// failed mutator leaves the file exactly as it was.
    pub fn with_state<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut SecurityState) -> Result<()>,
    {
        let mut state = self.read()?;
        mutate(&mut state)?;
        state.set_bool(SECURITY_ENABLED_KEY, true);
        self.write(&state)
    }

    /// Persist the full mapping. A write failure is fatal but echoes the
    /// intended document to stderr so no generated secret is silently lost.
    fn write(&self, state: &SecurityState) -> Result<()> {
        let document = state.to_document()?;
        if let Err(e) = fs::write(&self.path, &document) {
            eprintln!(
                "Could not write {}; the unsaved settings were:\n{document}",
                self.path.display()
            );
            return Err(SetupError::state(format!(
                "cannot write {}: {e}",
                self.path.display()
            )));
        }
        debug!("persisted security settings to {:?}", self.path);
        Ok(())
    }
}

/// Load the persisted state for inspection without a transaction.
///
/// Used by tests and by callers that only need to display settings.
pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<SecurityState> {
    let store = StateStore::new(path);
    store
        .read()
        .with_context(|| format!("failed to load security state from {:?}", store.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_absent_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("security.yml"));
        let state = store.read().unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_read_corrupt_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("security.yml");
        fs::write(&path, "{ not yaml: [").unwrap();

        let err = StateStore::new(&path).read().unwrap_err();
        assert!(matches!(err, SetupError::State(_)));
        assert!(err.to_string().contains("not be overwritten"));
    }

    #[test]
    fn test_read_non_mapping_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("security.yml");
        fs::write(&path, "---\n- a\n- b\n").unwrap();

        let err = StateStore::new(&path).read().unwrap_err();
        assert!(matches!(err, SetupError::State(_)));
    }

    #[test]
    fn test_transaction_stamps_flag_and_sorts_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("security.yml");
        let store = StateStore::new(&path);

        store
            .with_state(|state| {
                state.set_str("zeta_secret", "z");
                state.set_str("alpha_secret", "a");
                Ok(())
            })
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("---\n"), "document marker expected: {content}");
        let alpha = content.find("alpha_secret").unwrap();
        let flag = content.find(SECURITY_ENABLED_KEY).unwrap();
        let zeta = content.find("zeta_secret").unwrap();
        assert!(alpha < flag && flag < zeta, "keys should be sorted: {content}");

        let state = store.read().unwrap();
        assert_eq!(state.get_bool(SECURITY_ENABLED_KEY), Some(true));
    }

    #[test]
    fn test_failed_mutator_does_not_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("security.yml");
        let store = StateStore::new(&path);

        let result = store.with_state(|state| {
            state.set_str("doomed", "value");
            Err(SetupError::state("mutator failed"))
        });

        assert!(result.is_err());
        assert!(!path.exists(), "a failed transaction must not persist");
    }

    #[test]
    fn test_existing_values_survive_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("security.yml");
        let store = StateStore::new(&path);

        store
            .with_state(|state| {
                state.set_str("gossip_key", "abc123==");
                Ok(())
            })
            .unwrap();
        store
            .with_state(|state| {
                assert_eq!(state.get_str("gossip_key"), Some("abc123=="));
                state.set_bool("do_discovery_auth", true);
                Ok(())
            })
            .unwrap();

        let state = store.read().unwrap();
        assert_eq!(state.get_str("gossip_key"), Some("abc123=="));
        assert_eq!(state.get_bool("do_discovery_auth"), Some(true));
    }

    #[test]
    fn test_typed_credential_list_roundtrip() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("security.yml"));

        let creds = vec![
            FrameworkCredential {
                principal: "app-framework".to_string(),
                secret: "s1".to_string(),
            },
            FrameworkCredential {
                principal: "job-framework".to_string(),
                secret: "s2".to_string(),
            },
        ];

        store
            .with_state(|state| state.set_list("scheduler_credentials", &creds))
            .unwrap();

        let state = store.read().unwrap();
        let loaded: Vec<FrameworkCredential> = state.get_list("scheduler_credentials").unwrap();
        assert_eq!(loaded, creds);
    }

    #[test]
    fn test_get_list_absent_is_empty() {
        let state = SecurityState::new();
        let creds: Vec<FrameworkCredential> = state.get_list("scheduler_credentials").unwrap();
        assert!(creds.is_empty());
    }

    #[test]
    fn test_get_list_wrong_shape_is_fatal() {
        let mut state = SecurityState::new();
        state.set_str("scheduler_credentials", "not a list");
        let result: Result<Vec<FrameworkCredential>> = state.get_list("scheduler_credentials");
        assert!(result.is_err());
    }
}
