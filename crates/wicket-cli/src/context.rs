//! Per-invocation state: where the session lives and which API it talks to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::{debug, warn};

use wicket_core::{ApiUrl, SessionStore, Storage};
use wicket_file::FileStorage;
use wicket_http::{ClientConfig, SessionManager};

/// Storage key remembering the API URL of the last login.
const API_URL_KEY: &str = "api_url";

#[derive(Debug)]
pub struct AppContext {
    storage: Arc<FileStorage>,
    api: Option<String>,
}

impl AppContext {
    pub fn new(state_dir: Option<PathBuf>, api: Option<String>) -> Result<Self> {
        let state_dir = match state_dir {
            Some(dir) => dir,
            None => default_state_dir()?,
        };
        debug!(path = %state_dir.display(), "Using state directory");

        Ok(Self {
            storage: Arc::new(FileStorage::new(state_dir)),
            api,
        })
    }

    pub fn state_dir(&self) -> &Path {
        self.storage.root()
    }

    /// The API URL from `--api`, falling back to the one used at login.
    pub fn api_url(&self) -> Result<ApiUrl> {
        let raw = match &self.api {
            Some(api) => api.clone(),
            None => self
                .storage
                .get(API_URL_KEY)
                .context("Failed to read stored API URL")?
                .context("No API URL configured. Pass --api or set WICKET_API_URL.")?,
        };
        ApiUrl::new(&raw).context("Invalid API URL")
    }

    /// Remember the API URL so later commands can omit `--api`.
    pub fn remember_api_url(&self, url: &ApiUrl) {
        if let Err(e) = self.storage.set(API_URL_KEY, url.as_str()) {
            warn!(error = %e, "Failed to remember API URL");
        }
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(self.storage.clone())
    }

    /// Build a session manager over the persisted store.
    pub fn session(&self) -> Result<SessionManager> {
        let config = ClientConfig::new(self.api_url()?);
        SessionManager::connect(config, self.store()).context("Failed to create HTTP client")
    }
}

fn default_state_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "wicket").context("Could not determine data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
