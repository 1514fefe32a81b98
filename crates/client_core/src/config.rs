use std::{collections::HashMap, fs, path::Path, time::Duration};

use tracing::warn;

use crate::{
    loader::DEFAULT_CACHE_TTL, pagination::WISHES_PAGE_SIZE, rotation::DEFAULT_ROTATION_INTERVAL,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub backend_url: String,
    pub cache_ttl: Duration,
    pub rotation_interval: Duration,
    pub page_size: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:3000".into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            page_size: WISHES_PAGE_SIZE,
        }
    }
}

/// Defaults, then `path` (a flat TOML string table), then `GALLERY_*`
/// environment variables.
pub fn load_client_settings(path: impl AsRef<Path>) -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(path.as_ref()) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

pub fn apply_file_overrides(settings: &mut ClientSettings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(error) => {
            warn!(%error, "ignoring unreadable client settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.get("backend_url") {
        settings.backend_url = v.clone();
    }
    if let Some(secs) = file_cfg.get("cache_ttl_seconds").and_then(|v| v.parse().ok()) {
        settings.cache_ttl = Duration::from_secs(secs);
    }
    if let Some(ms) = file_cfg
        .get("rotation_interval_ms")
        .and_then(|v| v.parse().ok())
    {
        settings.rotation_interval = Duration::from_millis(ms);
    }
    if let Some(size) = file_cfg.get("page_size").and_then(|v| v.parse().ok()) {
        settings.page_size = size;
    }
}

pub fn apply_env_overrides(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("GALLERY_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(secs) = var("GALLERY_CACHE_TTL_SECONDS").and_then(|v| v.parse().ok()) {
        settings.cache_ttl = Duration::from_secs(secs);
    }
    if let Some(ms) = var("GALLERY_ROTATION_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        settings.rotation_interval = Duration::from_millis(ms);
    }
    if let Some(size) = var("GALLERY_PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = size;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
