//! Outbound network access.
//!
//! The cache manager never talks to `reqwest` directly: every strategy goes
//! through the [`Network`] trait so tests can substitute a scripted origin.
//!
//! Author: storecache contributors

mod client;

pub use client::{is_hop_by_hop, OriginClient};

use crate::error::Result;
use crate::models::{FetchRequest, FetchResponse};
use async_trait::async_trait;

/// A network that can answer fetches.
///
/// `Ok` carries any HTTP response, including error statuses. `Err` means
/// the fetch itself failed (connection refused, timeout, offline).
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}
