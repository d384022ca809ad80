//! Capability registry.

use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CapabilityConfig;
use crate::error::{Error, Result};
use crate::types::{Capability, CapabilityHealth};

/// Known capabilities and their last observed health.
///
/// Registration takes `&mut self` and therefore only happens before the
/// registry is shared; afterwards only health changes.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    capabilities: RwLock<BTreeMap<String, Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a registry from configured endpoints
    pub fn from_config<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a CapabilityConfig)>,
    {
        let mut registry = Self::new();
        for (name, config) in entries {
            registry.register(name.as_str(), config.url.as_str())?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, endpoint: impl Into<String>) -> Result<()> {
        let capability = Capability::new(name, endpoint);
        let capabilities = self.capabilities.get_mut();
        if capabilities.contains_key(&capability.name) {
            return Err(Error::DuplicateCapability(capability.name));
        }
        debug!(capability = %capability.name, endpoint = %capability.endpoint, "Registered capability");
        capabilities.insert(capability.name.clone(), capability);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<Capability> {
        self.capabilities.read().await.get(name).cloned()
    }

    /// Record a health observation. Returns false for unknown names.
    pub async fn set_health(
        &self,
        name: &str,
        health: CapabilityHealth,
        error: Option<String>,
    ) -> bool {
        let mut capabilities = self.capabilities.write().await;
        match capabilities.get_mut(name) {
            Some(capability) => {
                capability.health = health;
                capability.last_error = error;
                true
            }
            None => false,
        }
    }

    pub async fn names(&self) -> Vec<String> {
        self.capabilities.read().await.keys().cloned().collect()
    }

    /// All capabilities, ordered by name
    pub async fn snapshot(&self) -> Vec<Capability> {
        self.capabilities.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.capabilities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.capabilities.read().await.is_empty()
    }
}
