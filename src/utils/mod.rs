//! Utility functions and helpers for storecache.
//!
//! # Submodules
//!
//! - `logging`: Tracing and logging initialization.
//! - `retry`: Retry with backoff that respects upstream `Retry-After` hints.
//!
//! Author: storecache contributors

pub mod logging;
pub mod retry;
