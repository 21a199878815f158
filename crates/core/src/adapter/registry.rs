//! Link-to-adapter resolution.

use crate::config::Config;

use super::builtin::{builtin_adapters, override_adapters};
use super::types::{AdapterError, SiteAdapter};

/// Ordered adapter table. Resolution walks the table and takes the
/// first adapter whose matcher is contained in the link; the generic
/// fallback catches everything else, so resolution is total.
#[derive(Debug)]
pub struct AdapterRegistry {
    adapters: Vec<SiteAdapter>,
    fallback: SiteAdapter,
}

impl AdapterRegistry {
    /// Registry from explicit parts, specific adapters first. The
    /// fallback must match any link; built-in constructors use an
    /// empty matcher for it.
    pub fn new(adapters: Vec<SiteAdapter>, fallback: SiteAdapter) -> Self {
        Self { adapters, fallback }
    }

    /// The built-in site rules in their fixed priority order.
    pub fn builtin() -> Self {
        let (adapters, fallback) = builtin_adapters();
        Self::new(adapters, fallback)
    }

    /// Built-in sites with every discount table replaced by the user's
    /// marker tokens.
    pub fn with_override(tokens: &crate::config::AdapterOverride) -> Result<Self, AdapterError> {
        let (adapters, fallback) = override_adapters(tokens)?;
        Ok(Self::new(adapters, fallback))
    }

    pub fn from_config(config: &Config) -> Result<Self, AdapterError> {
        match &config.adapter {
            Some(tokens) => Self::with_override(tokens),
            None => Ok(Self::builtin()),
        }
    }

    pub fn resolve(&self, link: &str) -> &SiteAdapter {
        self.adapters
            .iter()
            .find(|adapter| adapter.matches(link))
            .unwrap_or(&self.fallback)
    }
}
