//! Versioned partition names.

use serde::Serialize;

const PREFIX: &str = "sp1sh";

/// The four partition names of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct CacheNames {
    precache: String,
    runtime: String,
    static_assets: String,
    images: String,
}

impl CacheNames {
    pub fn new(version: &str) -> Self {
        Self {
            precache: format!("{PREFIX}-cache-{version}"),
            runtime: format!("{PREFIX}-runtime-{version}"),
            static_assets: format!("{PREFIX}-static-{version}"),
            images: format!("{PREFIX}-images-{version}"),
        }
    }

    /// Install-time manifest and navigations.
    pub fn precache(&self) -> &str {
        &self.precache
    }

    /// API responses and uncategorized resources.
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Fonts and optimized image derivatives.
    pub fn static_assets(&self) -> &str {
        &self.static_assets
    }

    pub fn images(&self) -> &str {
        &self.images
    }

    pub fn all(&self) -> [&str; 4] {
        [self.precache(), self.runtime(), self.static_assets(), self.images()]
    }

    /// Whether `name` belongs to this version.
    pub fn contains(&self, name: &str) -> bool {
        self.all().contains(&name)
    }
}
