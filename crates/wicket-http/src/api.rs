//! Authenticated API client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::instrument;

use wicket_core::{Result, SessionStore};

use crate::config::ClientConfig;
use crate::dispatch::{ApiResponse, Dispatcher, RequestDescriptor};
use crate::http::{HttpTransport, Transport};
use crate::refresh::{RefreshCoordinator, SessionEvent};

/// HTTP client for the backend API.
///
/// Every request goes through the [`RefreshCoordinator`], so callers never
/// see a raw 401 for an expired access token. Cheap to clone.
///
/// # Example
///
/// ```no_run
/// use wicket_core::{ApiUrl, SessionStore};
/// use wicket_http::{ApiClient, ClientConfig};
///
/// # async fn example() -> Result<(), wicket_core::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
/// let client = ApiClient::new(config, SessionStore::in_memory())?;
///
/// let licenses: serde_json::Value = client.get("/licenses/").await?;
/// println!("{licenses}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    coordinator: RefreshCoordinator,
    store: SessionStore,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    /// Create a client that talks HTTP to `config.base_url`.
    pub fn new(config: ClientConfig, store: SessionStore) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, store, Arc::new(transport)))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(
        config: ClientConfig,
        store: SessionStore,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            transport,
            store.credentials().clone(),
            config.endpoints.clone(),
        );

        Self {
            coordinator: RefreshCoordinator::new(dispatcher),
            store,
            config: Arc::new(config),
        }
    }

    /// Send a request through the refresh protocol.
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        self.coordinator.dispatch_with_refresh(request).await
    }

    /// GET a path and decode the JSON response.
    #[instrument(skip(self))]
    pub async fn get<R>(&self, path: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.send(RequestDescriptor::get(path)).await?.json()
    }

    /// POST a JSON body and decode the JSON response.
    #[instrument(skip(self, body))]
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send(RequestDescriptor::post(path).json(body)?)
            .await?
            .json()
    }

    /// Subscribe to refresh outcomes, including session expiry.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator.subscribe()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
