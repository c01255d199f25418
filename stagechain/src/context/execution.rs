//! The mutable context carried through one run of the chain.

use super::{keys, ProjectTree};
use crate::errors::ChainError;
use crate::utils::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Owner recorded for keys written outside of any stage.
const DRIVER_OWNER: &str = "driver";

/// String-keyed mapping of artifacts and metadata shared by all stages of a run.
///
/// Keys can be added or overwritten but never removed. Each key remembers the
/// stage that first wrote it; an overwrite by a different stage is logged.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: HashMap<String, serde_json::Value>,
    owners: HashMap<String, String>,
    current_stage: Option<String>,
}

impl ExecutionContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Gets a value decoded into `T`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ChainError> {
        self.values
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(ChainError::from)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Sets a raw value, overwriting any previous one.
    pub fn set_value(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        let writer = self.current_stage.as_deref().unwrap_or(DRIVER_OWNER);

        match self.owners.get(&key) {
            Some(owner) if owner != writer => {
                warn!(key = %key, owner = %owner, writer = %writer, "Overwriting context key owned by another stage");
            }
            Some(_) => debug!(key = %key, writer = %writer, "Overwriting context key"),
            None => {
                debug!(key = %key, writer = %writer, "Setting context key");
                self.owners.insert(key.clone(), writer.to_string());
            }
        }

        self.values.insert(key, value);
    }

    /// Serializes and sets a value.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<(), ChainError> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value);
        Ok(())
    }

    /// Returns the stage that first wrote `key`.
    #[must_use]
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.owners.get(key).map(String::as_str)
    }

    /// Returns the run start time, if seeded.
    #[must_use]
    pub fn start_time(&self) -> Option<Timestamp> {
        self.get_as(keys::START_TIME).ok().flatten()
    }

    /// Returns the project tree, if seeded.
    #[must_use]
    pub fn tree(&self) -> Option<ProjectTree> {
        self.get_as(keys::TREE).ok().flatten()
    }

    /// Returns the stage currently executing, if any.
    #[must_use]
    pub fn current_stage(&self) -> Option<&str> {
        self.current_stage.as_deref()
    }

    pub(crate) fn enter_stage(&mut self, stage: &str) {
        self.current_stage = Some(stage.to_string());
    }

    pub(crate) fn leave_stage(&mut self) {
        self.current_stage = None;
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns all keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut ctx = ExecutionContext::new();
        ctx.set_value("mesh", json!("odm_meshing/odm_mesh.ply"));

        assert_eq!(ctx.get("mesh"), Some(&json!("odm_meshing/odm_mesh.ply")));
        assert!(ctx.contains_key("mesh"));
        assert!(!ctx.contains_key("dem"));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_overwrite_keeps_first_owner() {
        let mut ctx = ExecutionContext::new();
        ctx.enter_stage("dataset");
        ctx.set_value("photos", json!(3));
        ctx.leave_stage();

        ctx.enter_stage("split");
        ctx.set_value("photos", json!(4));
        ctx.leave_stage();

        assert_eq!(ctx.get("photos"), Some(&json!(4)));
        assert_eq!(ctx.owner("photos"), Some("dataset"));
    }

    #[test]
    fn test_driver_owns_keys_written_outside_stages() {
        let mut ctx = ExecutionContext::new();
        ctx.set("run_id", "abc").unwrap();
        assert_eq!(ctx.owner("run_id"), Some("driver"));
        assert_eq!(ctx.current_stage(), None);
    }

    #[test]
    fn test_get_as_typed() {
        let mut ctx = ExecutionContext::new();
        ctx.set("photos", &vec!["a.jpg", "b.jpg"]).unwrap();

        let photos: Vec<String> = ctx.get_as("photos").unwrap().unwrap();
        assert_eq!(photos, vec!["a.jpg".to_string(), "b.jpg".to_string()]);

        let missing: Option<Vec<String>> = ctx.get_as("missing").unwrap();
        assert!(missing.is_none());

        let wrong: Result<Option<u32>, _> = ctx.get_as("photos");
        assert!(wrong.is_err());
    }

    #[test]
    fn test_start_time_round_trip() {
        let mut ctx = ExecutionContext::new();
        let now = chrono::Utc::now();
        ctx.set(keys::START_TIME, &now).unwrap();

        assert_eq!(ctx.start_time(), Some(now));
    }

    #[test]
    fn test_keys_sorted() {
        let mut ctx = ExecutionContext::new();
        ctx.set_value("b", json!(1));
        ctx.set_value("a", json!(2));
        assert_eq!(ctx.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
