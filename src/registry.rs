//! Probe-type registry.
//!
//! Probe construction is a plain lookup in a map composed at startup.
//! There is no self-registration: what the registry knows is decided
//! here, explicitly, so the set of available probe types is visible in
//! one place.

use std::collections::HashMap;
use std::fmt;

use crate::dns::job::Job;
use crate::error::{ConfigError, ConfigErrors};

/// Factory signature: probe instance name plus its raw settings block.
pub type FactoryFn = fn(&str, &serde_yaml::Value) -> Result<Plugin, ConfigErrors>;

/// A constructed probe: its jobs and the endpoint count they cover.
pub struct Plugin {
    /// One job per configured endpoint.
    pub jobs: Vec<Box<dyn Job>>,
    /// Number of endpoints covered.
    pub endpoints: usize,
}

// Trait-object jobs carry no `Debug` of their own.
impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("jobs", &self.jobs.len())
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Maps probe-type names to factories.
pub struct Registry {
    factories: HashMap<&'static str, FactoryFn>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry {
            factories: HashMap::new(),
        }
    }

    /// A registry with every built-in probe type registered.
    pub fn with_defaults() -> Self {
        let mut registry = Registry::new();
        registry.register("dns", crate::dns::create);
        registry
    }

    /// Registers a factory under a probe-type name, replacing any previous
    /// one.
    pub fn register(&mut self, kind: &'static str, factory: FactoryFn) {
        self.factories.insert(kind, factory);
    }

    /// Builds a probe of the given type from its settings block.
    pub fn create(
        &self,
        kind: &str,
        name: &str,
        settings: &serde_yaml::Value,
    ) -> Result<Plugin, ConfigErrors> {
        match self.factories.get(kind) {
            Some(factory) => factory(name, settings),
            None => Err(ConfigError::UnknownProbeType(kind.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(yaml: &str) -> serde_yaml::Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn defaults_know_the_dns_probe() {
        let registry = Registry::with_defaults();
        let plugin = registry
            .create(
                "dns",
                "google",
                &settings("dns_servers:\n  - \"8.8.8.8\"\ntarget: \"dns.google\"\n"),
            )
            .unwrap();
        assert_eq!(plugin.endpoints, 1);
        assert_eq!(plugin.jobs.len(), 1);
        assert_eq!(plugin.jobs[0].url(), "udp://8.8.8.8");
    }

    #[tokio::test]
    async fn plugin_debug_summarizes_jobs() {
        let registry = Registry::with_defaults();
        let plugin = registry
            .create(
                "dns",
                "pair",
                &settings(
                    "dns_servers:\n  - \"8.8.8.8\"\n  - \"1.1.1.1\"\ntarget: \"dns.google\"\n",
                ),
            )
            .unwrap();
        assert_eq!(format!("{plugin:?}"), "Plugin { jobs: 2, endpoints: 2 }");
    }

    #[tokio::test]
    async fn unknown_probe_type_is_named_in_the_error() {
        let registry = Registry::with_defaults();
        let problems = registry
            .create("http", "web", &settings("target: \"x\"\n"))
            .unwrap_err();
        assert_eq!(problems.to_string(), "unknown probe type: http");
    }

    #[tokio::test]
    async fn factory_problems_pass_through() {
        let registry = Registry::with_defaults();
        let problems = registry
            .create(
                "dns",
                "bad",
                &settings("dns_servers:\n  - \"ftp://8.8.8.8\"\ntarget: \"dns.google\"\n"),
            )
            .unwrap_err();
        assert!(problems.to_string().contains("invalid protocol specified ftp"));
    }
}
