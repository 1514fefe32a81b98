use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use chrono::Duration;
use serde::Deserialize;
use shared::domain::Category;
use tracing::warn;

use crate::catalog::Catalog;

/// Longest signed-url lifetime accepted from configuration (7 days).
pub const MAX_SIGNED_URL_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub catalog_path: String,
    pub default_category: String,
    pub signed_url_ttl_seconds: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:3000".into(),
            catalog_path: "catalog.json".into(),
            default_category: "gallery".into(),
            signed_url_ttl_seconds: None,
        }
    }
}

impl Settings {
    pub fn default_category(&self) -> Category {
        Category::new(self.default_category.trim())
    }

    pub fn signed_url_ttl(&self) -> Option<Duration> {
        self.signed_url_ttl_seconds
            .filter(|secs| (1..=MAX_SIGNED_URL_TTL_SECONDS).contains(secs))
            .and_then(Duration::try_seconds)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |name| std::env::var(name).ok())
}

pub fn load_settings_from(path: &Path, var: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("bind_addr") {
                settings.server_bind = v.clone();
            }
            if let Some(v) = file_cfg.get("catalog_path") {
                settings.catalog_path = v.clone();
            }
            if let Some(v) = file_cfg.get("default_category") {
                settings.default_category = v.clone();
            }
            if let Some(v) = file_cfg.get("signed_url_ttl_seconds") {
                if let Some(secs) = parse_signed_url_ttl("signed_url_ttl_seconds", v) {
                    settings.signed_url_ttl_seconds = Some(secs);
                }
            }
        }
    }

    if let Some(v) = var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = var("APP__CATALOG_PATH") {
        settings.catalog_path = v;
    }

    if let Some(v) = var("APP__DEFAULT_CATEGORY") {
        settings.default_category = v;
    }

    if let Some(v) = var("APP__SIGNED_URL_TTL_SECONDS") {
        if let Some(secs) = parse_signed_url_ttl("APP__SIGNED_URL_TTL_SECONDS", &v) {
            settings.signed_url_ttl_seconds = Some(secs);
        }
    }

    settings
}

fn parse_signed_url_ttl(source: &str, raw: &str) -> Option<i64> {
    let secs = raw.trim().parse::<i64>().ok()?;
    if secs > MAX_SIGNED_URL_TTL_SECONDS {
        warn!(
            source,
            secs,
            max = MAX_SIGNED_URL_TTL_SECONDS,
            "ignoring out-of-range signed url ttl"
        );
        return None;
    }
    Some(secs)
}

pub fn load_catalog(catalog_path: &str) -> anyhow::Result<Catalog> {
    let catalog_path = catalog_path.trim();
    Catalog::load(catalog_path)
        .with_context(|| format!("failed to load media catalog from '{catalog_path}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
