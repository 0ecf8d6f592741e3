//! Value providers
//!
//! A provider turns one original column value into one replacement value.
//! The pipeline does not know how any provider works: it looks providers up
//! by name in a [`ProviderRegistry`] that is built once and handed to the
//! anonymizer, so there is no process-wide provider state.
//!
//! # Usage
//!
//! ```rust
//! use pganon::domain::{ProviderConfig, Value};
//! use pganon::providers::ProviderRegistry;
//!
//! # fn example() -> pganon::domain::Result<()> {
//! let registry = ProviderRegistry::with_builtins();
//! let md5 = registry.resolve(&ProviderConfig::named("md5"))?;
//!
//! let altered = md5.alter(&Value::from("jane@example.com"))?;
//! assert_ne!(altered, Value::from("jane@example.com"));
//! # Ok(())
//! # }
//! ```

pub mod builtin;

use crate::domain::{AnonymizerError, ProviderConfig, Result, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Capability converting one input value into one output value
///
/// Implementations must be thread-safe: a single instance is shared by all
/// transformation workers of a table.
pub trait Provider: Send + Sync {
    /// Registered name of the provider
    fn name(&self) -> &str;

    /// Produce the replacement for `value`
    fn alter(&self, value: &Value) -> Result<Value>;
}

impl fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider({})", self.name())
    }
}

/// Builds a provider from its configuration
pub type ProviderFactory = Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn Provider>> + Send + Sync>;

/// Mapping from provider name to provider factory
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the builtin providers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a provider factory under `name`, replacing any previous registration
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Check whether a provider name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the provider referenced by `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is not registered or the
    /// provider rejects its options.
    pub fn resolve(&self, config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
        let factory = self.factories.get(&config.name).ok_or_else(|| {
            AnonymizerError::Configuration(format!(
                "Unknown provider '{}'. Registered providers: {}",
                config.name,
                self.names().join(", ")
            ))
        })?;
        factory(config)
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
