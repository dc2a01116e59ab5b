//! Engine configuration.

/// Configuration for the navigation engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout for resource preload fetches, in milliseconds.
    ///
    /// Preloads are best-effort; on timeout the node is still inserted
    /// and left to load natively.
    pub preload_timeout_ms: u64,
    /// Timeout for the default router's document fetch, in milliseconds.
    pub router_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preload_timeout_ms: 400,
            router_timeout_ms: 500,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `PAGEFLOW_PRELOAD_TIMEOUT_MS`: resource preload timeout
    /// - `PAGEFLOW_ROUTER_TIMEOUT_MS`: document fetch timeout
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let preload_timeout_ms = std::env::var("PAGEFLOW_PRELOAD_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.preload_timeout_ms);
        let router_timeout_ms = std::env::var("PAGEFLOW_ROUTER_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.router_timeout_ms);

        Self {
            preload_timeout_ms,
            router_timeout_ms,
        }
    }

    /// Create configuration from environment variables, or use defaults.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_env()
    }

    /// Set the preload timeout.
    #[must_use]
    pub fn with_preload_timeout(mut self, timeout_ms: u64) -> Self {
        self.preload_timeout_ms = timeout_ms;
        self
    }

    /// Set the router fetch timeout.
    #[must_use]
    pub fn with_router_timeout(mut self, timeout_ms: u64) -> Self {
        self.router_timeout_ms = timeout_ms;
        self
    }
}
