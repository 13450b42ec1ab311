//! wicket-http - Authenticated HTTP client and session state machine
//!
//! Requests go through an [`ApiClient`], which attaches the stored access
//! token and transparently recovers from an expired one: concurrent 401s
//! share a single refresh call and are replayed in arrival order.
//! [`SessionManager`] sits on top and owns login, logout, and the
//! published [`SessionState`].
//!
//! # Example
//!
//! ```no_run
//! use wicket_core::{ApiUrl, LoginCredentials, SessionStore};
//! use wicket_http::{ClientConfig, SessionManager};
//!
//! # async fn example() -> Result<(), wicket_core::Error> {
//! let config = ClientConfig::new(ApiUrl::new("https://api.example.com")?);
//! let session = SessionManager::connect(config, SessionStore::in_memory())?;
//! session.initialize();
//!
//! let profile = session
//!     .login(LoginCredentials::new("alice@example.com", "secret"))
//!     .await?;
//! println!("Logged in as {}", profile.display_name());
//! # Ok(())
//! # }
//! ```

mod api;
mod config;
mod dispatch;
mod http;
mod refresh;
mod session;

pub use api::ApiClient;
pub use config::{ClientConfig, DEFAULT_PROFILE_MAX_STALENESS, DEFAULT_TIMEOUT, Endpoints};
pub use dispatch::{ApiResponse, Dispatcher, RequestDescriptor, RequestOptions};
pub use http::{HttpTransport, Transport};
pub use refresh::{RefreshCoordinator, SessionEvent};
pub use session::{SessionManager, SessionState, SessionStatus};

pub use wicket_core::{Error, Result};
