//! Persisted session state built on a [`Storage`](crate::Storage) backend.
//!
//! Every operation here is infallible from the caller's point of view.
//! A storage failure is logged and the operation degrades to "nothing
//! stored", which at worst means the user has to log in again.

mod credentials;
mod memory;
mod profile;

use std::sync::Arc;

pub use credentials::{ACCESS_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY};
pub use memory::MemoryStorage;
pub use profile::{PROFILE_KEY, ProfileCache};

use crate::traits::Storage;

/// The persisted state of one client: credentials plus the cached profile.
///
/// Constructed once at process start and shared by reference with the
/// HTTP client and the session state machine.
#[derive(Debug, Clone)]
pub struct SessionStore {
    credentials: CredentialStore,
    profile: ProfileCache,
}

impl SessionStore {
    /// Create a store over the given backend.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            credentials: CredentialStore::new(storage.clone()),
            profile: ProfileCache::new(storage),
        }
    }

    /// Create a store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn profile(&self) -> &ProfileCache {
        &self.profile
    }

    /// Remove credentials and the cached profile.
    pub fn clear(&self) {
        self.credentials.clear();
        self.profile.clear();
    }
}
