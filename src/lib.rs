// storecache - Offline-first caching proxy for the storefront
// Author: storecache contributors

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod network;
pub mod server;
pub mod utils;
pub mod worker;
