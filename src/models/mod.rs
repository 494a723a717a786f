// Request and response models
// Author: storecache contributors

pub mod fetch;

pub use fetch::{CacheKey, Destination, FetchRequest, FetchResponse, RequestMode};
