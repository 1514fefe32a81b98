use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{Category, MediaItem};

const CACHE_KEY_PREFIX: &str = "gallery-cache:";

/// Tab-scoped key/value storage. Values are opaque strings.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Stored form of one fetch result. `fetched_at` is unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCollection {
    pub category: Category,
    pub items: Vec<MediaItem>,
    pub fetched_at: i64,
}

impl CachedCollection {
    pub fn new(category: Category, items: Vec<MediaItem>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            category,
            items,
            fetched_at: fetched_at.timestamp_millis(),
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at)
    }

    /// An entry is servable while younger than `ttl`, non-empty, and free of
    /// expired signed URLs.
    pub fn is_servable(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        let age_ms = i128::from(now.timestamp_millis()) - i128::from(self.fetched_at);
        if age_ms >= ttl.as_millis() as i128 {
            return false;
        }
        if self.items.is_empty() {
            return false;
        }
        !self.items.iter().any(|item| item.url_expired_at(now))
    }
}

pub fn cache_key(category: &Category) -> String {
    format!("{CACHE_KEY_PREFIX}{category}")
}
