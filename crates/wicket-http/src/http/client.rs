//! reqwest-backed HTTP transport.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::{debug, instrument, trace};

use wicket_core::error::{ApiError, Error, InvalidInputError, TransportError};
use wicket_core::{AccessToken, ApiUrl, Result};

use super::endpoints::ErrorBody;
use crate::config::ClientConfig;
use crate::dispatch::{ApiResponse, RequestDescriptor};

/// Performs exactly one HTTP exchange for a request.
///
/// The transport knows nothing about credentials beyond the bearer token it
/// is handed; deciding whether to attach one is the dispatcher's job.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn execute(
        &self,
        request: &RequestDescriptor,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse>;
}

/// HTTP transport for the backend API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: ApiUrl,
}

impl HttpTransport {
    /// Create a transport from client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Returns the API base URL this transport is configured for.
    pub fn base_url(&self) -> &ApiUrl {
        &self.base_url
    }

    fn bearer_header(token: &AccessToken) -> Result<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {}", token.as_str())).map_err(|_| {
            InvalidInputError::HeaderValue {
                header: AUTHORIZATION.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request, bearer), fields(method = %request.method, path = %request.path))]
    async fn execute(
        &self,
        request: &RequestDescriptor,
        bearer: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let url = self.base_url.endpoint_url(&request.path);
        debug!(authenticated = bearer.is_some(), "HTTP request");

        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, Self::bearer_header(token)?);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        trace!(status = %status, "HTTP response");

        let body = response.bytes().await.map_err(transport_error)?.to_vec();

        if status.is_success() {
            Ok(ApiResponse::new(status.as_u16(), body))
        } else {
            Err(Error::Api(parse_error_response(status.as_u16(), &body)))
        }
    }
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}

/// Parse a non-2xx body, tolerating bodies that are not JSON.
fn parse_error_response(status: u16, body: &[u8]) -> ApiError {
    let raw = String::from_utf8_lossy(body).into_owned();
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => ApiError::new(status, parsed.code, parsed.message.or(parsed.error), raw),
        Err(_) => ApiError::new(status, None, None, raw),
    }
}
