//! HTTP transport implementation.
//!
//! This module provides the reqwest-backed transport and the wire types
//! exchanged with the backend.

mod client;
mod endpoints;

pub use client::{HttpTransport, Transport};
pub(crate) use endpoints::*;
