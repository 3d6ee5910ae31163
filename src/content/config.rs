//! # Content Configuration Module
//!
//! Configuration for chapter assembly. The only tunable today is how many
//! continuation pages may be fetched at once when a chapter's first page lists all
//! of its pages up front.

/// Default number of concurrent fan-out fetches
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Configuration for chapter content assembly
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Process-wide bound on concurrent fan-out fetches
    pub concurrency: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Builder for ContentConfig
#[derive(Debug, Default)]
pub struct ContentConfigBuilder {
    config: ContentConfig,
}

impl ContentConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ContentConfig::default(),
        }
    }

    /// Set the number of concurrent fan-out fetches; clamped to at least one
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ContentConfig {
        self.config
    }
}

impl ContentConfig {
    /// Create a new builder
    pub fn builder() -> ContentConfigBuilder {
        ContentConfigBuilder::new()
    }
}
