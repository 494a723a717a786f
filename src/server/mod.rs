//! Axum-based HTTP surface of the caching proxy.
//!
//! Every request outside [`CONTROL_PREFIX`] is an intercepted fetch and goes
//! to the cache manager. The control routes expose health, metrics, the
//! registration status and the skip-waiting message channel.
//!
//! # Components
//!
//! - `handlers`: interception and control endpoints.
//! - `routes`: the router and its tracing / request-id layers.
//!
//! Author: storecache contributors

mod handlers;
mod routes;

pub use handlers::SOURCE_HEADER;
pub use routes::{create_router, AppState, CONTROL_PREFIX};
