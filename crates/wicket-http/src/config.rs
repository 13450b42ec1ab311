//! Client configuration.

use std::time::Duration;

use wicket_core::ApiUrl;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit on how old a cached profile may be and still be shown
/// after a failed revalidation.
pub const DEFAULT_PROFILE_MAX_STALENESS: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Backend endpoint paths, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub refresh: String,
    pub logout: String,
    pub profile: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            refresh: "/auth/refresh-token".to_string(),
            logout: "/auth/logout".to_string(),
            profile: "/profile/".to_string(),
        }
    }
}

impl Endpoints {
    /// Endpoints that must never carry the access token nor trigger a
    /// refresh: login, registration, and refresh itself.
    pub fn is_credential_exempt(&self, path: &str) -> bool {
        path == self.login || path == self.register || path == self.refresh
    }
}

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: ApiUrl,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub user_agent: String,
    pub profile_max_staleness: Duration,
}

impl ClientConfig {
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("wicket/", env!("CARGO_PKG_VERSION")).to_string(),
            profile_max_staleness: DEFAULT_PROFILE_MAX_STALENESS,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_profile_max_staleness(mut self, max: Duration) -> Self {
        self.profile_max_staleness = max;
        self
    }
}
