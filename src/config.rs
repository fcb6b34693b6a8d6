//! Hub configuration

/// Configuration options for the subscription hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Run the one-time schema upgrade check on the first snapshot of each
    /// entity (disable for read-only deployments; a disabled process never
    /// marks the entity as checked, so an enabled process still upgrades)
    pub schema_upgrade: bool,

    /// Maintain cross-entity links (workbox publishers follow their domain
    /// and patch the denormalized domain name)
    pub link_related: bool,

    /// Replay the cached record synchronously to late-joining consumers
    pub replay_on_subscribe: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            schema_upgrade: true,
            link_related: true,
            replay_on_subscribe: true,
        }
    }
}

impl HubConfig {
    /// Enable or disable the schema upgrade check
    pub fn schema_upgrade(mut self, enabled: bool) -> Self {
        self.schema_upgrade = enabled;
        self
    }

    /// Enable or disable cross-entity links
    pub fn link_related(mut self, enabled: bool) -> Self {
        self.link_related = enabled;
        self
    }

    /// Enable or disable cached-record replay at subscribe time
    pub fn replay_on_subscribe(mut self, enabled: bool) -> Self {
        self.replay_on_subscribe = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert!(config.schema_upgrade);
        assert!(config.link_related);
        assert!(config.replay_on_subscribe);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .schema_upgrade(false)
            .link_related(false)
            .replay_on_subscribe(false);

        assert!(!config.schema_upgrade);
        assert!(!config.link_related);
        assert!(!config.replay_on_subscribe);
    }
}
