//! Persisted access/refresh credential pair.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::tokens::{AccessToken, CredentialPair, RefreshToken};
use crate::traits::Storage;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Holder for the stored credential pair.
///
/// Reads and writes go straight to the backing [`Storage`], so every clone
/// and every process sharing the backend sees the same values. Writes from
/// clones are serialized, which makes the conditional updates atomic with
/// respect to `set`, `replace` and `clear` within one process.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    writes: Arc<Mutex<()>>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            writes: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the stored pair. Missing or unreadable halves are `None`.
    pub fn get(&self) -> CredentialPair {
        CredentialPair {
            access: self.read(ACCESS_TOKEN_KEY).map(AccessToken::new),
            refresh: self.read(REFRESH_TOKEN_KEY).map(RefreshToken::new),
        }
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.read(ACCESS_TOKEN_KEY).map(AccessToken::new)
    }

    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.read(REFRESH_TOKEN_KEY).map(RefreshToken::new)
    }

    /// Overwrite the provided halves, leaving omitted ones untouched.
    pub fn set(&self, access: Option<&AccessToken>, refresh: Option<&RefreshToken>) {
        let _guard = self.lock();
        self.write_halves(access, refresh);
    }

    /// Store both halves of a pair that are present.
    pub fn set_pair(&self, pair: &CredentialPair) {
        self.set(pair.access.as_ref(), pair.refresh.as_ref());
    }

    /// Make the stored pair exactly `pair`: present halves are written,
    /// absent ones removed.
    pub fn replace(&self, pair: &CredentialPair) {
        let _guard = self.lock();
        self.write_halves(pair.access.as_ref(), pair.refresh.as_ref());
        if pair.access.is_none() {
            self.remove(ACCESS_TOKEN_KEY);
        }
        if pair.refresh.is_none() {
            self.remove(REFRESH_TOKEN_KEY);
        }
    }

    /// Store a refreshed access token (and a rotated refresh token, if any)
    /// only while the stored refresh token is still `expected`.
    ///
    /// Returns false, writing nothing, if the credentials were cleared or
    /// replaced in the meantime.
    pub fn set_if_refresh_is(
        &self,
        expected: Option<&RefreshToken>,
        access: &AccessToken,
        rotated: Option<&RefreshToken>,
    ) -> bool {
        let _guard = self.lock();
        if self.refresh_token().as_ref() != expected {
            return false;
        }
        self.write_halves(Some(access), rotated);
        true
    }

    /// Remove both credentials only while the stored refresh token is still
    /// `expected`. Returns false if they were replaced in the meantime.
    pub fn clear_if_refresh_is(&self, expected: Option<&RefreshToken>) -> bool {
        let _guard = self.lock();
        if self.refresh_token().as_ref() != expected {
            return false;
        }
        self.remove_all();
        true
    }

    /// Remove both credentials.
    pub fn clear(&self) {
        let _guard = self.lock();
        self.remove_all();
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_halves(&self, access: Option<&AccessToken>, refresh: Option<&RefreshToken>) {
        if let Some(access) = access {
            self.write(ACCESS_TOKEN_KEY, access.as_str());
        }
        if let Some(refresh) = refresh {
            self.write(REFRESH_TOKEN_KEY, refresh.as_str());
        }
    }

    fn remove_all(&self) {
        self.remove(ACCESS_TOKEN_KEY);
        self.remove(REFRESH_TOKEN_KEY);
        debug!("Credentials cleared");
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            warn!(key, error = %e, "Failed to remove stored credential");
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(key, error = %e, "Failed to persist credential");
        }
    }
}
