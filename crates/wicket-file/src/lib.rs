//! wicket-file - Filesystem-backed session storage.
//!
//! Provides [`FileStorage`], a [`Storage`](wicket_core::Storage)
//! implementation that keeps one file per key under a state directory.

mod storage;

pub use storage::FileStorage;
