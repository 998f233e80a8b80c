//! Board sync configuration.

use crate::identity::FileCredentialStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default remote API root.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
/// Default resize quiescence window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Settings for a board session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    /// Root URL of the links API, without a trailing slash.
    pub api_base_url: String,
    /// Quiet period before a widget's size change is emitted.
    pub debounce_ms: u64,
    /// Timeout applied to every remote request.
    pub request_timeout_secs: u64,
    /// Where the bearer token is stored. `None` uses the default location.
    pub credential_path: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credential_path: None,
        }
    }
}

impl BoardConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_json_str(&json).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
    }

    /// Apply `LINKBOARD_*` environment overrides. Unparseable values are ignored.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("LINKBOARD_API_URL") {
            self.api_base_url = url;
        }
        if let Some(ms) = var("LINKBOARD_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.debounce_ms = ms;
        }
        if let Some(secs) = var("LINKBOARD_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(path) = var("LINKBOARD_CREDENTIALS") {
            self.credential_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Credential store at the configured path, or the default location.
    pub fn credential_store(&self) -> io::Result<FileCredentialStore> {
        match &self.credential_path {
            Some(path) => Ok(FileCredentialStore::new(path)),
            None => FileCredentialStore::default_location(),
        }
    }

    /// API root with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
