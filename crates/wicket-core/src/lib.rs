//! wicket-core - Core types and traits for the wicket session layer.
//!
//! This crate holds everything the HTTP client and the session state
//! machine share: the error taxonomy, credential and profile types, the
//! [`Storage`] trait, and the stores built on top of it.

pub mod credentials;
pub mod error;
pub mod profile;
pub mod store;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::{LoginCredentials, Registration};
pub use error::Error;
pub use profile::{CachedProfile, Profile};
pub use store::{CredentialStore, MemoryStorage, ProfileCache, SessionStore};
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use traits::Storage;
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
