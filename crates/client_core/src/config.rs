use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SAMPLE_EVERY: u32 = 15;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const SETTINGS_FILE: &str = "analyzer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Always without a trailing slash.
    pub api_base_url: String,
    /// Frame sampling stride forwarded to `/predict`; `None` omits it.
    pub sample_every: Option<u32>,
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            sample_every: Some(DEFAULT_SAMPLE_EVERY),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    sample_every: Option<u32>,
    request_timeout_secs: Option<u64>,
}

impl ClientSettings {
    pub fn with_base_url(mut self, raw: &str) -> Self {
        self.api_base_url = normalize_base_url(raw);
        self
    }

    pub fn with_sample_every(mut self, sample_every: u32) -> Self {
        self.sample_every = (sample_every > 0).then_some(sample_every);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn apply_toml(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg: FileSettings =
            toml::from_str(raw).context("failed to parse client settings toml")?;
        if let Some(v) = file_cfg.api_base_url {
            self.api_base_url = normalize_base_url(&v);
        }
        if let Some(v) = file_cfg.sample_every {
            self.sample_every = (v > 0).then_some(v);
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("API_BASE_URL") {
            self.api_base_url = normalize_base_url(&v);
        }
        if let Some(v) = lookup("APP__API_BASE_URL") {
            self.api_base_url = normalize_base_url(&v);
        }

        if let Some(v) = lookup("APP__SAMPLE_EVERY") {
            match v.trim().parse::<u32>() {
                Ok(parsed) => self.sample_every = (parsed > 0).then_some(parsed),
                Err(_) => tracing::warn!(value = %v, "ignoring invalid APP__SAMPLE_EVERY"),
            }
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_SECS"),
            }
        }
    }
}

/// Defaults, then `analyzer.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Err(err) = settings.apply_toml(&raw) {
            tracing::warn!(path = %path.display(), "ignoring client settings file: {err:#}");
        }
    }

    settings.apply_env(lookup);
    settings
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return DEFAULT_API_BASE_URL.to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
