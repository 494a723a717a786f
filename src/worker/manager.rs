//! The cache manager.
//!
//! Owns the cache storage and the registration of cache generations, and
//! routes every [`WorkerEvent`] to its handler. At most one generation is
//! active (used for fetch interception), at most one is waiting to be
//! activated and at most one is installing.

// Author: storecache contributors

use super::dispatch::{classify, in_scope, EventOutcome, FetchDecision, PassthroughReason, Route, WorkerEvent};
use super::lifecycle::{precache, purge_stale, ActivateOutcome, Generation, InstallOutcome, WorkerState};
use super::message::{ControlMessage, MessageOutcome};
use super::strategies::{
    cache_first, cache_or_network, network_first, stale_while_revalidate, OfflineFallback, StrategyContext,
};
use crate::cache::{CacheNames, CacheStorage};
use crate::config::CacheConfig;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::{FetchRequest, FetchResponse};
use crate::network::Network;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Registration {
    installing: Option<Arc<Generation>>,
    waiting: Option<Arc<Generation>>,
    active: Option<Arc<Generation>>,
}

/// Outcome of registering a generation.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// The version is already active; nothing was installed.
    Unchanged,
    /// Installed, and activated unless it has to wait.
    Registered {
        install: InstallOutcome,
        activate: Option<ActivateOutcome>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationStatus {
    pub version: String,
    pub state: WorkerState,
}

impl GenerationStatus {
    fn of(generation: &Generation) -> Self {
        Self {
            version: generation.version().to_string(),
            state: generation.state(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub name: String,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub active: Option<GenerationStatus>,
    pub waiting: Option<GenerationStatus>,
    pub installing: Option<GenerationStatus>,
    pub stores: Vec<StoreStatus>,
}

pub struct CacheManager {
    ctx: StrategyContext,
    config: CacheConfig,
    fallback: OfflineFallback,
    registration: RwLock<Registration>,
    /// Fetches open their stores under the read side; activation purges and
    /// claims under the write side. No fetch can open a store of the
    /// outgoing generation once its stores are purged.
    purge_gate: AsyncRwLock<()>,
}

impl CacheManager {
    pub fn new(config: CacheConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let fallback = OfflineFallback {
            offline_url: config.offline_url.clone(),
            root_fallback: config.root_fallback.clone(),
        };
        Self {
            ctx: StrategyContext::new(storage, network),
            config,
            fallback,
            registration: RwLock::new(Registration::default()),
            purge_gate: AsyncRwLock::new(()),
        }
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.ctx.storage
    }

    pub fn active(&self) -> Option<Arc<Generation>> {
        self.registration.read().active.clone()
    }

    pub fn waiting(&self) -> Option<Arc<Generation>> {
        self.registration.read().waiting.clone()
    }

    /// Route an event to its handler.
    pub fn dispatch(&self, event: WorkerEvent) -> BoxFuture<'_, Result<EventOutcome>> {
        debug!("Dispatching {} event", event.kind());
        match event {
            WorkerEvent::Install => self.install().map(|r| r.map(EventOutcome::Installed)).boxed(),
            WorkerEvent::Activate => self.activate().map(|r| r.map(EventOutcome::Activated)).boxed(),
            WorkerEvent::Fetch(request) => async move { self.fetch(request).await.map(EventOutcome::Fetch) }.boxed(),
            WorkerEvent::Message(payload) => async move { Ok(EventOutcome::Message(self.message(&payload).await)) }.boxed(),
        }
    }

    /// Register the configured version: install it, then activate it
    /// unless it has to wait behind the active generation.
    pub async fn register(&self, version: &str, manifest: Vec<String>) -> Result<RegisterOutcome> {
        let generation = Arc::new(Generation::new(CacheNames::new(&self.config.prefix, version), manifest));

        {
            let mut registration = self.registration.write();
            if registration.active.as_ref().is_some_and(|g| g.version() == version) {
                debug!("Version {} is already active", version);
                return Ok(RegisterOutcome::Unchanged);
            }
            if let Some(previous) = registration.installing.replace(generation.clone()) {
                let _ = previous.transition(WorkerState::Redundant);
            }
        }
        info!("Registering cache generation {}", version);

        let install = match self.dispatch(WorkerEvent::Install).await? {
            EventOutcome::Installed(outcome) => outcome,
            other => return Err(ProxyError::Internal(format!("unexpected install outcome {:?}", other))),
        };

        if self.config.skip_waiting_on_install {
            generation.request_skip_waiting();
        }

        let must_activate = self.active().is_none() || generation.skip_waiting_requested();
        let is_waiting = self.waiting().is_some_and(|g| Arc::ptr_eq(&g, &generation));
        let activate = if must_activate && is_waiting {
            match self.dispatch(WorkerEvent::Activate).await {
                Ok(EventOutcome::Activated(outcome)) => Some(outcome),
                Ok(other) => return Err(ProxyError::Internal(format!("unexpected activate outcome {:?}", other))),
                // A concurrent SKIP_WAITING took the waiting slot first.
                Err(ProxyError::NoGeneration(_)) if generation.state() == WorkerState::Activated => {
                    debug!("Generation {} was activated by skip-waiting", version);
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            if is_waiting {
                info!("Generation {} installed and waiting", version);
            }
            None
        };

        Ok(RegisterOutcome::Registered { install, activate })
    }

    /// Precache the installing generation and move it to the waiting slot.
    pub async fn install(&self) -> Result<InstallOutcome> {
        let generation = self
            .registration
            .read()
            .installing
            .clone()
            .ok_or(ProxyError::NoGeneration("installing"))?;

        let outcome = precache(&self.ctx, &generation, self.config.precache_attempts).await;

        let mut registration = self.registration.write();
        // Superseded while precaching: leave it redundant.
        if !registration.installing.as_ref().is_some_and(|g| Arc::ptr_eq(g, &generation)) {
            return Ok(outcome);
        }
        registration.installing = None;
        generation.transition(WorkerState::Installed)?;
        if let Some(previous) = registration.waiting.replace(generation) {
            let _ = previous.transition(WorkerState::Redundant);
        }
        Ok(outcome)
    }

    /// Activate the waiting generation: purge stale stores, then claim
    /// interception from the previously active generation.
    pub async fn activate(&self) -> Result<ActivateOutcome> {
        let _gate = self.purge_gate.write().await;
        let generation = self
            .registration
            .write()
            .waiting
            .take()
            .ok_or(ProxyError::NoGeneration("waiting"))?;

        generation.transition(WorkerState::Activating)?;
        let deleted = purge_stale(&self.ctx, generation.names()).await;
        generation.transition(WorkerState::Activated)?;

        let replaced = {
            let mut registration = self.registration.write();
            registration.active.replace(generation.clone())
        };
        let replaced = replaced.map(|previous| {
            let _ = previous.transition(WorkerState::Redundant);
            previous.version().to_string()
        });

        metrics::set_active_generation(generation.version(), replaced.as_deref());
        info!(
            "Generation {} activated, {} stale stores deleted",
            generation.version(),
            deleted.len()
        );

        Ok(ActivateOutcome {
            version: generation.version().to_string(),
            deleted,
            replaced,
        })
    }

    /// Handle an intercepted request.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchDecision> {
        if !request.is_get() {
            return Ok(FetchDecision::Passthrough(PassthroughReason::NotGet));
        }
        if !in_scope(request.path(), &self.config.scope) {
            return Ok(FetchDecision::Passthrough(PassthroughReason::OutOfScope));
        }
        let route = classify(&request);

        let generation = {
            let _gate = self.purge_gate.read().await;
            let Some(generation) = self.active() else {
                return Ok(FetchDecision::Passthrough(PassthroughReason::NoActiveGeneration));
            };
            if let Some(store) = route.store(generation.names()) {
                if let Err(e) = self.ctx.storage.open(&store).await {
                    warn!("Opening store {} failed: {}", store, e);
                }
            }
            generation
        };

        // Validators from the browser's own HTTP cache would turn a
        // cacheable answer into a 304 that is never stored.
        let request = if route.writes_cache() {
            request.without_conditionals()
        } else {
            request
        };

        let started = Instant::now();
        let names = generation.names();

        let served = match route {
            Route::NetworkFirst => Ok(network_first(&self.ctx, &names.runtime(), &self.fallback, &request).await),
            Route::StaleWhileRevalidate => stale_while_revalidate(&self.ctx, &names.assets(), &request).await,
            Route::CacheFirst => Ok(cache_first(&self.ctx, &names.images(), &request).await),
            Route::CacheOrNetwork => cache_or_network(&self.ctx, &request).await,
        };

        let elapsed = started.elapsed().as_secs_f64();
        match served {
            Ok(served) => {
                debug!(
                    "{} {} via {} from {}",
                    request.method,
                    request.url,
                    route.as_str(),
                    served.source.as_str()
                );
                metrics::record_fetch(route.as_str(), served.source.as_str(), elapsed);
                Ok(FetchDecision::Respond { route, served })
            }
            Err(e) => {
                metrics::record_fetch(route.as_str(), "error", elapsed);
                Err(e)
            }
        }
    }

    /// Forward a request the manager did not intercept.
    pub async fn passthrough(&self, request: &FetchRequest, reason: PassthroughReason) -> Result<FetchResponse> {
        let started = Instant::now();
        let result = self.ctx.network.fetch(request).await;
        metrics::record_fetch(reason.as_str(), "passthrough", started.elapsed().as_secs_f64());
        result
    }

    /// Handle a control message posted by the page.
    pub async fn message(&self, payload: &Value) -> MessageOutcome {
        match ControlMessage::from_payload(payload) {
            Some(ControlMessage::SkipWaiting) => self.skip_waiting().await,
            None => {
                debug!("Ignoring control message {}", payload);
                MessageOutcome::Ignored
            }
        }
    }

    async fn skip_waiting(&self) -> MessageOutcome {
        if self.waiting().is_some() {
            return match self.activate().await {
                Ok(outcome) => MessageOutcome::Activated {
                    version: outcome.version,
                },
                Err(e) => {
                    warn!("Skip-waiting activation failed: {}", e);
                    MessageOutcome::NothingWaiting
                }
            };
        }

        let installing = self.registration.read().installing.clone();
        match installing {
            Some(generation) => {
                generation.request_skip_waiting();
                MessageOutcome::Scheduled {
                    version: generation.version().to_string(),
                }
            }
            None => MessageOutcome::NothingWaiting,
        }
    }

    /// Snapshot of the registration and of every store.
    pub async fn status(&self) -> Result<WorkerStatus> {
        let (active, waiting, installing) = {
            let registration = self.registration.read();
            (
                registration.active.as_deref().map(GenerationStatus::of),
                registration.waiting.as_deref().map(GenerationStatus::of),
                registration.installing.as_deref().map(GenerationStatus::of),
            )
        };

        let mut stores = Vec::new();
        for name in self.ctx.storage.keys().await? {
            let entries = self.ctx.storage.len(&name).await?.unwrap_or(0);
            stores.push(StoreStatus { name, entries });
        }

        Ok(WorkerStatus {
            active,
            waiting,
            installing,
            stores,
        })
    }
}

