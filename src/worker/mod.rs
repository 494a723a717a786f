//! The cache manager: lifecycle, fetch dispatch and caching strategies.
//!
//! # Components
//!
//! - `lifecycle`: generation state machine, precache on install and stale
//!   store cleanup on activate.
//! - `dispatch`: the event table and the request classifier.
//! - `strategies`: network-first, stale-while-revalidate, cache-first and
//!   cache-or-network.
//! - `message`: the skip-waiting control channel.
//! - `manager`: the [`CacheManager`] tying them together.
//!
//! Author: storecache contributors

pub mod dispatch;
pub mod lifecycle;
mod manager;
pub mod message;
pub mod strategies;

pub use dispatch::{classify, EventOutcome, FetchDecision, PassthroughReason, Route, WorkerEvent};
pub use lifecycle::{ActivateOutcome, Generation, InstallOutcome, PrecacheResult, WorkerState};
pub use manager::{CacheManager, GenerationStatus, RegisterOutcome, StoreStatus, WorkerStatus};
pub use message::{ControlMessage, MessageOutcome};
pub use strategies::{OfflineFallback, ResponseSource, Served, StrategyContext};
