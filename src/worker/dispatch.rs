// Event table and fetch classification
// Author: storecache contributors

use super::lifecycle::{ActivateOutcome, InstallOutcome};
use super::message::MessageOutcome;
use super::strategies::Served;
use crate::cache::CacheNames;
use crate::models::{Destination, FetchRequest};
use serde_json::Value;

/// Events the cache manager reacts to.
#[derive(Debug)]
pub enum WorkerEvent {
    /// Precache the generation being installed.
    Install,
    /// Promote the waiting generation and purge stale stores.
    Activate,
    /// An intercepted request.
    Fetch(FetchRequest),
    /// A control message posted by the page.
    Message(Value),
}

impl WorkerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Fetch(_) => "fetch",
            WorkerEvent::Message(_) => "message",
        }
    }
}

#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated(ActivateOutcome),
    Fetch(FetchDecision),
    Message(MessageOutcome),
}

/// Caching strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    NetworkFirst,
    StaleWhileRevalidate,
    CacheFirst,
    CacheOrNetwork,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::NetworkFirst => "network_first",
            Route::StaleWhileRevalidate => "stale_while_revalidate",
            Route::CacheFirst => "cache_first",
            Route::CacheOrNetwork => "cache_or_network",
        }
    }

    /// The store this route reads and writes. Cache-or-network has none.
    pub fn store(&self, names: &CacheNames) -> Option<String> {
        match self {
            Route::NetworkFirst => Some(names.runtime()),
            Route::StaleWhileRevalidate => Some(names.assets()),
            Route::CacheFirst => Some(names.images()),
            Route::CacheOrNetwork => None,
        }
    }

    pub fn writes_cache(&self) -> bool {
        !matches!(self, Route::CacheOrNetwork)
    }
}

/// Whether `path` lies under `scope`, on a path-segment boundary: a scope
/// of `/shop` covers `/shop` and `/shop/cart`, not `/shopping`.
pub fn in_scope(path: &str, scope: &str) -> bool {
    if scope.ends_with('/') {
        return path.starts_with(scope);
    }
    match path.strip_prefix(scope) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// First match wins: navigation, then scripts/styles/workers, then images.
pub fn classify(request: &FetchRequest) -> Route {
    if request.is_navigation() {
        return Route::NetworkFirst;
    }
    match request.destination {
        Destination::Style | Destination::Script | Destination::Worker => Route::StaleWhileRevalidate,
        Destination::Image => Route::CacheFirst,
        _ => Route::CacheOrNetwork,
    }
}

/// Why a request was left to reach the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    NotGet,
    OutOfScope,
    NoActiveGeneration,
}

impl PassthroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassthroughReason::NotGet => "not_get",
            PassthroughReason::OutOfScope => "out_of_scope",
            PassthroughReason::NoActiveGeneration => "uncontrolled",
        }
    }
}

#[derive(Debug)]
pub enum FetchDecision {
    /// The manager produced the response.
    Respond { route: Route, served: Served },
    /// The manager did not intercept; the caller forwards the request.
    Passthrough(PassthroughReason),
}
