use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use shared::{
    domain::{Category, MediaItem},
    protocol::{CollectionResponse, COLLECTIONS_ROUTE},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    cache::{cache_key, CachedCollection, Clock, SessionStore, SystemClock},
    error::LoadError,
};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[async_trait]
pub trait CollectionBackend: Send + Sync {
    async fn fetch_collection(&self, category: &Category)
        -> Result<CollectionResponse, LoadError>;
}

pub struct HttpCollectionBackend {
    http: Client,
    base_url: Url,
}

impl HttpCollectionBackend {
    pub fn new(base_url: &str) -> Result<Self, LoadError> {
        let base_url = Url::parse(base_url).map_err(|source| LoadError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn collection_url(&self, category: &Category) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}{}",
            self.base_url.path().trim_end_matches('/'),
            COLLECTIONS_ROUTE
        );
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("category", category.as_str());
        url
    }
}

#[async_trait]
impl CollectionBackend for HttpCollectionBackend {
    async fn fetch_collection(
        &self,
        category: &Category,
    ) -> Result<CollectionResponse, LoadError> {
        let res = self.http.get(self.collection_url(category)).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                status: status.as_u16(),
            });
        }
        let body = res.bytes().await?;
        let response: CollectionResponse = serde_json::from_slice(&body)?;
        if response.count != response.items.len() {
            warn!(
                %category,
                count = response.count,
                items = response.items.len(),
                "collection count does not match item list"
            );
        }
        Ok(response)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub category: Category,
    pub items: Vec<MediaItem>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Network,
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => f.write_str("cache"),
            Self::Network => f.write_str("network"),
        }
    }
}

/// Result of one `load` call. A failure still renders as an empty collection,
/// but keeps its reason for hosts that offer a retry.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        collection: Collection,
        source: LoadSource,
    },
    Failed {
        category: Category,
        reason: LoadError,
    },
}

impl LoadOutcome {
    pub fn items(&self) -> &[MediaItem] {
        match self {
            Self::Loaded { collection, .. } => &collection.items,
            Self::Failed { .. } => &[],
        }
    }

    pub fn into_items(self) -> Vec<MediaItem> {
        match self {
            Self::Loaded { collection, .. } => collection.items,
            Self::Failed { .. } => Vec::new(),
        }
    }

    pub fn source(&self) -> Option<LoadSource> {
        match self {
            Self::Loaded { source, .. } => Some(*source),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

pub struct CollectionLoader {
    backend: Arc<dyn CollectionBackend>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    inflight: Mutex<HashMap<Category, Arc<Mutex<()>>>>,
}

impl CollectionLoader {
    pub fn new(backend: Arc<dyn CollectionBackend>, store: Arc<dyn SessionStore>) -> Self {
        Self::new_with_clock(backend, store, Arc::new(SystemClock), DEFAULT_CACHE_TTL)
    }

    pub fn new_with_clock(
        backend: Arc<dyn CollectionBackend>,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            clock,
            ttl,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn load(&self, category: &Category) -> LoadOutcome {
        if let Some(collection) = self.cached(category) {
            return self.cache_hit(collection);
        }

        // Callers for the same category queue here; whoever enters after a
        // successful fetch finds the fresh entry instead of fetching again.
        let gate = self.gate(category).await;
        let outcome = {
            let _guard = gate.lock().await;
            self.load_gated(category).await
        };
        self.release_gate(category, gate).await;
        outcome
    }

    async fn load_gated(&self, category: &Category) -> LoadOutcome {
        if let Some(collection) = self.cached(category) {
            return self.cache_hit(collection);
        }

        match self.backend.fetch_collection(category).await {
            Ok(response) => {
                let fetched_at = self.clock.now();
                let collection = Collection {
                    category: category.clone(),
                    items: response.items,
                    fetched_at,
                };
                self.persist(&collection);
                info!(
                    %category,
                    count = collection.items.len(),
                    source = %LoadSource::Network,
                    "collection loaded"
                );
                LoadOutcome::Loaded {
                    collection,
                    source: LoadSource::Network,
                }
            }
            Err(reason) => {
                warn!(%category, error = %reason, "collection load failed");
                LoadOutcome::Failed {
                    category: category.clone(),
                    reason,
                }
            }
        }
    }

    fn cache_hit(&self, collection: Collection) -> LoadOutcome {
        debug!(
            category = %collection.category,
            count = collection.items.len(),
            source = %LoadSource::Cache,
            "collection loaded"
        );
        LoadOutcome::Loaded {
            collection,
            source: LoadSource::Cache,
        }
    }

    async fn gate(&self, category: &Category) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        Arc::clone(inflight.entry(category.clone()).or_default())
    }

    /// Drops the category's gate once nobody else is queued on it.
    async fn release_gate(&self, category: &Category, gate: Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        let last_holder = Arc::strong_count(&gate) == 2
            && inflight
                .get(category)
                .is_some_and(|current| Arc::ptr_eq(current, &gate));
        if last_holder {
            inflight.remove(category);
        }
    }

    fn cached(&self, category: &Category) -> Option<Collection> {
        let raw = self.store.get(&cache_key(category))?;
        let entry = match serde_json::from_str::<CachedCollection>(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%category, %error, "ignoring unreadable cache entry");
                return None;
            }
        };

        if !entry.is_servable(self.clock.now(), self.ttl) {
            debug!(%category, "cache entry is stale");
            return None;
        }

        let fetched_at = entry.fetched_at()?;
        Some(Collection {
            category: entry.category,
            items: entry.items,
            fetched_at,
        })
    }

    fn persist(&self, collection: &Collection) {
        let entry = CachedCollection::new(
            collection.category.clone(),
            collection.items.clone(),
            collection.fetched_at,
        );
        match serde_json::to_string(&entry) {
            Ok(raw) => self.store.set(&cache_key(&collection.category), raw),
            Err(error) => {
                warn!(category = %collection.category, %error, "failed to encode cache entry")
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
