// Generation lifecycle: install (precache) and activate (cleanup)
// Author: storecache contributors

use super::strategies::StrategyContext;
use crate::cache::CacheNames;
use crate::error::{ProxyError, Result};
use crate::metrics;
use crate::models::{FetchRequest, FetchResponse};
use crate::utils::retry::{parse_retry_after, with_retry, AttemptFailure};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Lifecycle state of a cache generation.
///
/// `installing → installed → activating → activated`; any state may end in
/// `redundant` once a newer generation supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    pub fn can_become(&self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing | Installed | Activating | Activated, Redundant)
        )
    }
}

/// One version of the cache: its store names, its manifest and where it
/// is in the lifecycle.
#[derive(Debug)]
pub struct Generation {
    names: CacheNames,
    manifest: Vec<String>,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
}

impl Generation {
    pub fn new(names: CacheNames, manifest: Vec<String>) -> Self {
        Self {
            names,
            manifest,
            state: Mutex::new(WorkerState::Installing),
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn names(&self) -> &CacheNames {
        &self.names
    }

    pub fn version(&self) -> &str {
        self.names.version()
    }

    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn transition(&self, next: WorkerState) -> Result<()> {
        let mut state = self.state.lock();
        if !state.can_become(next) {
            return Err(ProxyError::Lifecycle {
                from: state.as_str(),
                to: next.as_str(),
            });
        }
        debug!("Generation {}: {} -> {}", self.version(), state.as_str(), next.as_str());
        *state = next;
        metrics::record_transition(next.as_str());
        Ok(())
    }

    /// Ask for activation as soon as installation is done, without
    /// waiting for the active generation to be released.
    pub fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }
}

/// Result of precaching one manifest asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum PrecacheResult {
    Stored { path: String },
    Failed { path: String, reason: String },
}

impl PrecacheResult {
    pub fn path(&self) -> &str {
        match self {
            PrecacheResult::Stored { path } | PrecacheResult::Failed { path, .. } => path,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, PrecacheResult::Stored { .. })
    }
}

/// Aggregate of an install. There is no failing variant: installation
/// proceeds whatever the individual assets did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallOutcome {
    pub version: String,
    pub results: Vec<PrecacheResult>,
}

impl InstallOutcome {
    pub fn stored(&self) -> usize {
        self.results.iter().filter(|r| r.is_stored()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &PrecacheResult> {
        self.results.iter().filter(|r| !r.is_stored())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateOutcome {
    pub version: String,
    pub deleted: Vec<String>,
    pub replaced: Option<String>,
}

/// Fetch every manifest asset into the precache store.
pub async fn precache(ctx: &StrategyContext, generation: &Generation, attempts: u32) -> InstallOutcome {
    let store = generation.names().precache();

    if let Err(e) = ctx.storage.open(&store).await {
        warn!("Opening precache store {} failed: {}", store, e);
    }

    let results = join_all(
        generation
            .manifest()
            .iter()
            .map(|path| precache_asset(ctx, &store, path, attempts)),
    )
    .await;

    let outcome = InstallOutcome {
        version: generation.version().to_string(),
        results,
    };

    for failure in outcome.failed() {
        if let PrecacheResult::Failed { path, reason } = failure {
            warn!("Precache of {} failed: {}", path, reason);
        }
    }
    info!(
        "Precached {}/{} assets into {}",
        outcome.stored(),
        outcome.results.len(),
        store
    );

    outcome
}

async fn precache_asset(ctx: &StrategyContext, store: &str, path: &str, attempts: u32) -> PrecacheResult {
    let request = FetchRequest::get(path);

    let fetched: std::result::Result<FetchResponse, AttemptFailure> =
        with_retry(&format!("Precache {}", path), attempts, || async {
            let response = ctx
                .network
                .fetch(&request)
                .await
                .map_err(|e| AttemptFailure::new(0, e.to_string()))?;
            if !response.is_ok() {
                let retry_after = response.header("retry-after").and_then(parse_retry_after);
                return Err(AttemptFailure::new(response.status, format!("HTTP {}", response.status))
                    .with_retry_after(retry_after));
            }
            Ok(response)
        })
        .await;

    let result = match fetched {
        Ok(response) => match ctx.storage.put(store, &request.cache_key(), &response).await {
            Ok(()) => PrecacheResult::Stored { path: path.to_string() },
            Err(e) => PrecacheResult::Failed {
                path: path.to_string(),
                reason: e.to_string(),
            },
        },
        Err(failure) => PrecacheResult::Failed {
            path: path.to_string(),
            reason: failure.message,
        },
    };

    metrics::record_precache(result.is_stored());
    result
}

/// Delete every store of this application that the generation does not own.
/// Deletions run concurrently; a failed deletion is logged and skipped.
pub async fn purge_stale(ctx: &StrategyContext, names: &CacheNames) -> Vec<String> {
    let keys = match ctx.storage.keys().await {
        Ok(keys) => keys,
        Err(e) => {
            warn!("Listing stores failed, skipping cleanup: {}", e);
            return Vec::new();
        }
    };

    let stale: Vec<String> = keys.into_iter().filter(|name| names.is_stale(name)).collect();
    let deletions = join_all(stale.into_iter().map(|name| async move {
        let result = ctx.storage.delete(&name).await;
        (name, result)
    }))
    .await;

    let mut deleted = Vec::new();
    for (name, result) in deletions {
        match result {
            Ok(true) => {
                debug!("Deleted stale store {}", name);
                metrics::record_store_deleted(names.prefix());
                deleted.push(name);
            }
            Ok(false) => {}
            Err(e) => warn!("Deleting stale store {} failed: {}", name, e),
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine() {
        use WorkerState::*;
        assert!(Installing.can_become(Installed));
        assert!(Installed.can_become(Activating));
        assert!(Activating.can_become(Activated));
        assert!(Activated.can_become(Redundant));
        assert!(Installed.can_become(Redundant));

        assert!(!Installing.can_become(Activated));
        assert!(!Activated.can_become(Installing));
        assert!(!Redundant.can_become(Activated));
        assert!(!Redundant.can_become(Redundant));
    }

    #[test]
    fn test_illegal_transition_is_an_error() {
        let generation = Generation::new(CacheNames::new("bdm-", "v3"), Vec::new());
        assert_eq!(generation.state(), WorkerState::Installing);

        let err = generation.transition(WorkerState::Activated).unwrap_err();
        assert!(matches!(err, ProxyError::Lifecycle { from: "installing", to: "activated" }));

        generation.transition(WorkerState::Installed).unwrap();
        assert_eq!(generation.state(), WorkerState::Installed);
    }

    #[test]
    fn test_install_outcome_counts() {
        let outcome = InstallOutcome {
            version: "v3".into(),
            results: vec![
                PrecacheResult::Stored { path: "/".into() },
                PrecacheResult::Failed {
                    path: "/missing.png".into(),
                    reason: "HTTP 404".into(),
                },
            ],
        };
        assert_eq!(outcome.stored(), 1);
        assert_eq!(outcome.failed().map(|r| r.path()).collect::<Vec<_>>(), vec!["/missing.png"]);
    }
}
