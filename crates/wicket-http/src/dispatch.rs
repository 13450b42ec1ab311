//! Request descriptors and the credential-attaching dispatcher.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use wicket_core::{AccessToken, CredentialStore, Result};

use crate::config::Endpoints;
use crate::http::Transport;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Send without the access token and never enter the refresh protocol.
    pub credential_exempt: bool,
}

/// Everything needed to send, and later replay, one API request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub options: RequestOptions,
    /// The access token attached on the most recent send.
    sent_with: Option<AccessToken>,
    /// Set once the request has been through the refresh protocol.
    retried: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            options: RequestOptions::default(),
            sent_with: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Mark the request as credential-exempt.
    pub fn credential_exempt(mut self) -> Self {
        self.options.credential_exempt = true;
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    pub(crate) fn sent_with(&self) -> Option<&AccessToken> {
        self.sent_with.as_ref()
    }
}

/// A fully-read 2xx response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends a single request, attaching the stored access token unless the
/// request is credential-exempt.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    endpoints: Endpoints,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            transport,
            credentials,
            endpoints,
        }
    }

    /// Whether the request bypasses credentials and the refresh protocol,
    /// either by flag or because it targets an exempt endpoint.
    pub fn is_exempt(&self, request: &RequestDescriptor) -> bool {
        request.options.credential_exempt || self.endpoints.is_credential_exempt(&request.path)
    }

    /// Send once. Records which access token was attached.
    pub async fn send(&self, request: &mut RequestDescriptor) -> Result<ApiResponse> {
        let bearer = if self.is_exempt(request) {
            None
        } else {
            self.credentials.access_token()
        };

        trace!(path = %request.path, authenticated = bearer.is_some(), "Dispatching");
        request.sent_with = bearer.clone();
        self.transport.execute(request, bearer.as_ref()).await
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}
