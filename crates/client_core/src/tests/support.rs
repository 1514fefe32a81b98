use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use shared::{
    domain::{Category, MediaItem},
    protocol::CollectionResponse,
};

use crate::{cache::Clock, error::LoadError, loader::CollectionBackend};

pub(crate) fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_771_900_000 + secs, 0).single().expect("timestamp")
}

pub(crate) fn item(key: &str) -> MediaItem {
    MediaItem::new(key, format!("https://cdn.example.test/{key}.jpg"), at(0))
}

pub(crate) fn items(keys: &[&str]) -> Vec<MediaItem> {
    keys.iter().map(|key| item(key)).collect()
}

pub(crate) struct ManualClock {
    now: StdMutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: StdMutex::new(now),
        })
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock");
        *now += chrono::Duration::from_std(by).expect("duration");
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock")
    }
}

/// Backend double that counts requests and answers from a fixed script.
pub(crate) struct ScriptedBackend {
    items: StdMutex<Vec<MediaItem>>,
    fail_status: StdMutex<Option<u16>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn serving(items: Vec<MediaItem>) -> Arc<Self> {
        Arc::new(Self {
            items: StdMutex::new(items),
            fail_status: StdMutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn slow(items: Vec<MediaItem>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            items: StdMutex::new(items),
            fail_status: StdMutex::new(None),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(status: u16) -> Arc<Self> {
        let backend = Self::serving(Vec::new());
        backend.fail_with(Some(status));
        backend
    }

    pub(crate) fn set_items(&self, items: Vec<MediaItem>) {
        *self.items.lock().expect("items") = items;
    }

    pub(crate) fn fail_with(&self, status: Option<u16>) {
        *self.fail_status.lock().expect("status") = status;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionBackend for ScriptedBackend {
    async fn fetch_collection(
        &self,
        category: &Category,
    ) -> Result<CollectionResponse, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = *self.fail_status.lock().expect("status") {
            return Err(LoadError::Status { status });
        }
        let items = self.items.lock().expect("items").clone();
        Ok(CollectionResponse::new(category.clone(), items))
    }
}
