//! Durable key/value storage trait.

use std::fmt::Debug;
use std::io;

/// A string key/value store that survives process restarts.
///
/// Implementations are synchronous; callers treat failures as non-fatal
/// and log them.
pub trait Storage: Send + Sync + Debug {
    /// Read a value, returning `None` if the key is absent.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}
