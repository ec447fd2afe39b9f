//! Facade configuration
//!
//! Procedure and topic names are built from a configurable prefix; the
//! suffixes after the prefix are fixed by the deployed management API.

use std::time::Duration;

/// Default procedure/topic prefix of the router management API
pub const DEFAULT_PREFIX: &str = "io.xconn.mgmt";

/// Configuration for the management facade
#[derive(Debug, Clone)]
pub struct MgmtConfig {
    /// Procedure/topic prefix (deployment-specific)
    pub prefix: String,

    /// Interval between coalesced batch deliveries to a sink
    pub coalesce_interval: Duration,

    /// Coalescer queue capacity; overflow drops the oldest item
    pub coalesce_capacity: usize,

    /// Retained log lines per (realm, session) key
    pub log_cache_cap: usize,
}

impl Default for MgmtConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            coalesce_interval: Duration::from_millis(50),
            coalesce_capacity: 500,
            log_cache_cap: 2000,
        }
    }
}

impl MgmtConfig {
    /// Create a config with a deployment-specific prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Build a full procedure or topic name from a suffix
    pub fn procedure(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix, suffix)
    }

    /// Topic carrying periodic stats snapshots
    pub fn stats_topic(&self) -> String {
        self.procedure("stats.on_update")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_procedure_names() {
        let config = MgmtConfig::default();
        assert_eq!(config.procedure("realm.list"), "io.xconn.mgmt.realm.list");
        assert_eq!(
            config.procedure("session.list"),
            "io.xconn.mgmt.session.list"
        );
        assert_eq!(
            config.procedure("stats.status.set"),
            "io.xconn.mgmt.stats.status.set"
        );
        assert_eq!(
            config.procedure("session.log.set"),
            "io.xconn.mgmt.session.log.set"
        );
        assert_eq!(config.stats_topic(), "io.xconn.mgmt.stats.on_update");
    }

    #[test]
    fn test_custom_prefix() {
        let config = MgmtConfig::with_prefix("io.acme.mgmt");
        assert_eq!(config.procedure("realm.list"), "io.acme.mgmt.realm.list");
        assert_eq!(config.coalesce_capacity, 500);
    }

    #[test]
    fn test_default_bounds() {
        let config = MgmtConfig::default();
        assert_eq!(config.coalesce_interval, Duration::from_millis(50));
        assert_eq!(config.log_cache_cap, 2000);
    }
}
