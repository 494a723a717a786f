//! Cache naming for a generation.

// Author: storecache contributors

/// Names of every store that belongs to one cache generation.
///
/// A generation is identified by its version tag; every name is derived
/// from the application prefix and that tag, so a version bump yields a
/// disjoint set of stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    prefix: String,
    version: String,
}

impl CacheNames {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Store filled from the precache manifest at install time.
    pub fn precache(&self) -> String {
        format!("{}precache-{}", self.prefix, self.version)
    }

    /// Store for navigation responses.
    pub fn runtime(&self) -> String {
        format!("{}runtime-{}", self.prefix, self.version)
    }

    /// Store for stylesheets, scripts and workers.
    pub fn assets(&self) -> String {
        format!("{}-assets", self.runtime())
    }

    /// Store for images.
    pub fn images(&self) -> String {
        format!("{}-images", self.runtime())
    }

    pub fn all(&self) -> [String; 4] {
        [self.precache(), self.runtime(), self.assets(), self.images()]
    }

    /// Whether `name` is a store of this generation.
    pub fn owns(&self, name: &str) -> bool {
        self.all().iter().any(|n| n == name)
    }

    /// Whether `name` follows this application's naming convention but
    /// belongs to another generation.
    pub fn is_stale(&self, name: &str) -> bool {
        name.starts_with(&self.prefix) && !self.owns(name)
    }
}
