//! Core traits for session persistence.

mod storage;

pub use storage::Storage;
