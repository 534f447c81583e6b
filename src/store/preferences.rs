use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::agent::error::AutofillError;
use crate::store::kv::KeyValueStore;

pub const PREFERENCES_KEY: &str = "preferences";
pub const PROFILE_KEY: &str = "user_profile";
pub const RECENT_ANSWERS_KEY: &str = "recent_answers";

pub const MAX_RECENT_ANSWERS: usize = 50;

fn load<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> Result<T, AutofillError> {
    match store.get(key)? {
        Some(value) => serde_json::from_value(value).map_err(|e| AutofillError::Store(format!("{}: {}", key, e))),
        None => Ok(T::default()),
    }
}

fn save<T: Serialize>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<(), AutofillError> {
    let value = serde_json::to_value(value).map_err(|e| AutofillError::Store(format!("{}: {}", key, e)))?;
    store.set(key, value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub auto_fill_enabled: bool,
    pub min_confidence: f32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_fill_enabled: false,
            min_confidence: 0.0,
        }
    }
}

impl Preferences {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, AutofillError> {
        load(store, PREFERENCES_KEY)
    }

    /// Stored preferences, or `fallback` when none were ever saved.
    pub fn load_or(store: &dyn KeyValueStore, fallback: Preferences) -> Result<Self, AutofillError> {
        if store.get(PREFERENCES_KEY)?.is_none() {
            return Ok(fallback);
        }
        Self::load(store)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), AutofillError> {
        save(store, PREFERENCES_KEY, self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: Option<String>,
}

impl UserProfile {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, AutofillError> {
        load(store, PROFILE_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), AutofillError> {
        save(store, PROFILE_KEY, self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentAnswer {
    pub label: String,
    pub answer: String,
    pub url: String,
    pub used_at: DateTime<Utc>,
}

/// Most recent first, one entry per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentAnswers {
    pub entries: Vec<RecentAnswer>,
}

impl RecentAnswers {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, AutofillError> {
        load(store, RECENT_ANSWERS_KEY)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), AutofillError> {
        save(store, RECENT_ANSWERS_KEY, self)
    }

    pub fn push(&mut self, entry: RecentAnswer) {
        self.entries.retain(|e| !e.label.eq_ignore_ascii_case(&entry.label));
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_RECENT_ANSWERS);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
