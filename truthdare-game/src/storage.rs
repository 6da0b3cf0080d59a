//! Key-value persistence for the game snapshot and the completed-task set.
//!
//! Any string store (browser local storage, a directory of files, a map in
//! memory) plugs in through [`KeyValueStore`]; [`KeyValueStorage`] layers the
//! JSON encoding and the fixed keys on top and implements [`GameStorage`].
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::rc::Rc;
use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::GameStorage;
use crate::constants::{COMPLETED_TASKS_STORAGE_KEY, STATE_STORAGE_KEY};
use crate::quests::Quest;
use crate::state::{GameState, PlayerStats};

/// Minimal string store.
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), Self::Error>;
}

/// Shared in-memory store; clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("stored value under \"{key}\" is malformed: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Decode a stored snapshot, repairing derived fields.
///
/// Fields are merged one at a time over the defaults: a null or mistyped
/// field, or a quest entry that does not decode, is logged and dropped while
/// the rest of the save is kept.
///
/// # Errors
///
/// Returns [`StorageError::Malformed`] when `raw` is not a JSON object.
pub fn decode_state(raw: &str) -> Result<GameState, StorageError> {
    let malformed = |source| StorageError::Malformed {
        key: STATE_STORAGE_KEY,
        source,
    };
    let mut fields = match serde_json::from_str::<Value>(raw).map_err(malformed)? {
        Value::Object(fields) => fields,
        other => {
            let found = match other {
                Value::Array(_) => "an array",
                Value::String(_) => "a string",
                Value::Number(_) => "a number",
                Value::Bool(_) => "a boolean",
                Value::Null => "null",
                Value::Object(_) => "an object",
            };
            return Err(malformed(serde_json::Error::custom(format!(
                "expected a JSON object, found {found}"
            ))));
        }
    };

    let player_stats = match fields.remove("playerStats") {
        None => PlayerStats::default(),
        Some(Value::Object(stats)) => merge_fields("playerStats", stats),
        Some(other) => {
            log::warn!("ignoring stored playerStats: not an object ({other})");
            PlayerStats::default()
        }
    };
    let available_quests = decode_quests("availableQuests", fields.remove("availableQuests"));
    let community_quests = decode_quests("communityQuests", fields.remove("communityQuests"));

    let mut state: GameState = merge_fields("state", fields);
    state.player_stats = player_stats;
    state.available_quests = available_quests;
    state.community_quests = community_quests;
    Ok(state.normalized())
}

/// Deserialize `T` from whichever stored fields it accepts.
///
/// `T` must fill missing fields from its defaults.
fn merge_fields<T: DeserializeOwned + Default>(label: &str, fields: Map<String, Value>) -> T {
    let mut accepted = Map::new();
    for (key, value) in fields {
        if value.is_null() {
            log::warn!("ignoring stored {label}.{key}: null");
            continue;
        }
        accepted.insert(key.clone(), value);
        if let Err(err) = serde_json::from_value::<T>(Value::Object(accepted.clone())) {
            log::warn!("ignoring stored {label}.{key}: {err}");
            accepted.remove(&key);
        }
    }
    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

fn decode_quests(label: &str, stored: Option<Value>) -> Vec<Quest> {
    match stored {
        None => Vec::new(),
        Some(Value::Array(entries)) => entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                serde_json::from_value(entry)
                    .map_err(|err| log::warn!("ignoring stored {label}[{index}]: {err}"))
                    .ok()
            })
            .collect(),
        Some(other) => {
            log::warn!("ignoring stored {label}: not an array ({other})");
            Vec::new()
        }
    }
}

/// Decode the stored completed-task id list.
///
/// # Errors
///
/// Returns [`StorageError::Malformed`] when `raw` is not a JSON string array.
pub fn decode_completed_tasks(raw: &str) -> Result<BTreeSet<String>, StorageError> {
    serde_json::from_str(raw).map_err(|source| StorageError::Malformed {
        key: COMPLETED_TASKS_STORAGE_KEY,
        source,
    })
}

/// [`GameStorage`] over any [`KeyValueStore`].
///
/// Malformed stored values are logged and reported as absent, so a corrupted
/// save falls back to a fresh game instead of failing to start.
#[derive(Debug, Clone, Default)]
pub struct KeyValueStorage<K> {
    store: K,
}

impl<K: KeyValueStore> KeyValueStorage<K> {
    pub const fn new(store: K) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &K {
        &self.store
    }

    fn backend(err: K::Error) -> StorageError {
        StorageError::Backend(err.to_string())
    }

    fn read<T>(
        &self,
        key: &str,
        decode: impl FnOnce(&str) -> Result<T, StorageError>,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get_item(key).map_err(Self::backend)? else {
            return Ok(None);
        };
        match decode(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                log::warn!("ignoring stored {key}: {err}");
                Ok(None)
            }
        }
    }
}

impl<K: KeyValueStore> GameStorage for KeyValueStorage<K> {
    type Error = StorageError;

    fn save_state(&self, state: &GameState) -> Result<(), Self::Error> {
        let json = serde_json::to_string(state)?;
        self.store
            .set_item(STATE_STORAGE_KEY, &json)
            .map_err(Self::backend)
    }

    fn load_state(&self) -> Result<Option<GameState>, Self::Error> {
        self.read(STATE_STORAGE_KEY, decode_state)
    }

    fn save_completed_tasks(&self, task_ids: &BTreeSet<String>) -> Result<(), Self::Error> {
        let json = serde_json::to_string(task_ids)?;
        self.store
            .set_item(COMPLETED_TASKS_STORAGE_KEY, &json)
            .map_err(Self::backend)
    }

    fn load_completed_tasks(&self) -> Result<Option<BTreeSet<String>>, Self::Error> {
        self.read(COMPLETED_TASKS_STORAGE_KEY, decode_completed_tasks)
    }

    fn clear(&self) -> Result<(), Self::Error> {
        self.store
            .remove_item(STATE_STORAGE_KEY)
            .map_err(Self::backend)?;
        self.store
            .remove_item(COMPLETED_TASKS_STORAGE_KEY)
            .map_err(Self::backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> KeyValueStorage<MemoryStore> {
        KeyValueStorage::new(MemoryStore::default())
    }

    #[test]
    fn state_roundtrips_under_fixed_key() {
        let storage = storage();
        let mut state = GameState::initial("party", 0);
        state.player_stats.points = 75;
        state.player_stats.gain_experience(60);
        storage.save_state(&state).unwrap();

        assert!(
            storage
                .store()
                .get_item(STATE_STORAGE_KEY)
                .unwrap()
                .is_some()
        );
        assert_eq!(storage.load_state().unwrap(), Some(state));
    }

    #[test]
    fn completed_tasks_stored_as_array() {
        let storage = storage();
        let ids: BTreeSet<String> = ["TRUTH-a-1".to_string(), "DARE-b-2".to_string()].into();
        storage.save_completed_tasks(&ids).unwrap();
        let raw = storage
            .store()
            .get_item(COMPLETED_TASKS_STORAGE_KEY)
            .unwrap()
            .unwrap();
        assert!(raw.starts_with('['));
        assert_eq!(storage.load_completed_tasks().unwrap(), Some(ids));
    }

    #[test]
    fn malformed_values_read_as_absent() {
        let storage = storage();
        storage
            .store()
            .set_item(STATE_STORAGE_KEY, "{not json")
            .unwrap();
        storage
            .store()
            .set_item(COMPLETED_TASKS_STORAGE_KEY, r#"{"a": 1}"#)
            .unwrap();
        assert_eq!(storage.load_state().unwrap(), None);
        assert_eq!(storage.load_completed_tasks().unwrap(), None);
        assert!(matches!(
            decode_state("[]"),
            Err(StorageError::Malformed {
                key: STATE_STORAGE_KEY,
                ..
            })
        ));
    }

    #[test]
    fn clear_removes_both_keys() {
        let storage = storage();
        storage.save_state(&GameState::default()).unwrap();
        storage.save_completed_tasks(&BTreeSet::new()).unwrap();
        assert_eq!(storage.store().len(), 2);
        storage.clear().unwrap();
        assert!(storage.store().is_empty());
        assert_eq!(storage.load_state().unwrap(), None);
    }

    #[test]
    fn partial_snapshot_loads_with_defaults() {
        let state = decode_state(r#"{"playerStats": {"points": 10, "xp": 320}}"#).unwrap();
        assert_eq!(state.player_stats.points, 10);
        assert_eq!(state.player_stats.level(), 3);
        assert!(state.available_quests.is_empty());
    }

    #[test]
    fn non_object_snapshots_are_rejected() {
        for raw in ["[]", "42", "\"party\"", "null"] {
            assert!(
                matches!(
                    decode_state(raw),
                    Err(StorageError::Malformed {
                        key: STATE_STORAGE_KEY,
                        ..
                    })
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn bad_fields_fall_back_individually() {
        let state = decode_state(
            r#"{
                "selectedCategory": null,
                "difficulty": "impossible",
                "lastTaskTimestamp": 1234,
                "playerStats": {"points": 900, "xp": "lots", "skipTokens": 3, "maxStreak": null}
            }"#,
        )
        .unwrap();
        assert_eq!(state.selected_category, GameState::default().selected_category);
        assert_eq!(state.difficulty, GameState::default().difficulty);
        assert_eq!(state.last_task_timestamp, Some(1234));
        assert_eq!(state.player_stats.points, 900);
        assert_eq!(state.player_stats.skip_tokens, 3);
        assert_eq!(state.player_stats.experience, 0);
        assert_eq!(state.player_stats.level(), 1);
    }

    #[test]
    fn undecodable_quests_are_dropped_one_by_one() {
        let state = decode_state(
            r#"{
                "availableQuests": [
                    {"id": "q-good", "title": "Answer", "type": "DAILY_PERSONAL", "goal": "truths_answered", "targetValue": 3},
                    {"id": "q-bad", "title": "No goal", "type": "DAILY_PERSONAL", "targetValue": 3}
                ],
                "communityQuests": "oops"
            }"#,
        )
        .unwrap();
        let ids: Vec<&str> = state.available_quests.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q-good"]);
        assert!(state.community_quests.is_empty());
    }
}
