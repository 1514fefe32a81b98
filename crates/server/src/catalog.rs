use std::{collections::BTreeMap, fs, path::Path};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::domain::{Category, MediaItem, MediaKey};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("collection '{category}' lists key '{key}' more than once")]
    DuplicateKey { category: String, key: String },
    #[error("collection '{category}' has an invalid url for '{key}': {source}")]
    InvalidUrl {
        category: String,
        key: String,
        source: url::ParseError,
    },
}

/// One asset as the operator describes it; signing happens per request.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub key: MediaKey,
    pub public_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub accent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    collections: BTreeMap<Category, Vec<CatalogEntry>>,
}

impl Catalog {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|err| match err {
            CatalogError::Parse { source, .. } => CatalogError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(raw).map_err(|source| CatalogError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (category, entries) in &self.collections {
            let mut seen = std::collections::HashSet::new();
            for entry in entries {
                if !seen.insert(&entry.key) {
                    return Err(CatalogError::DuplicateKey {
                        category: category.to_string(),
                        key: entry.key.to_string(),
                    });
                }
                Url::parse(&entry.public_url).map_err(|source| CatalogError::InvalidUrl {
                    category: category.to_string(),
                    key: entry.key.to_string(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.collections.keys()
    }

    pub fn collection(&self, category: &Category) -> Option<&[CatalogEntry]> {
        self.collections.get(category).map(Vec::as_slice)
    }
}

const EXPIRES_PARAM: &str = "Expires";

/// Sets the `Expires` parameter (unix seconds) on a public url, replacing any
/// expiry it already carries.
pub fn signed_display_url(
    public_url: &str,
    expires_at: DateTime<Utc>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(public_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != EXPIRES_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(&kept)
        .append_pair(EXPIRES_PARAM, &expires_at.timestamp().to_string());
    Ok(url)
}

pub fn to_media_item(
    entry: &CatalogEntry,
    expires_at: Option<DateTime<Utc>>,
) -> Result<MediaItem, url::ParseError> {
    let display_url = match expires_at {
        Some(expires_at) => signed_display_url(&entry.public_url, expires_at)?.to_string(),
        None => entry.public_url.clone(),
    };
    Ok(MediaItem {
        key: entry.key.clone(),
        display_url,
        created_at: entry.created_at,
        label: entry.label.clone(),
        title: entry.title.clone(),
        accent: entry.accent.clone(),
        url_expires_at: expires_at,
    })
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
