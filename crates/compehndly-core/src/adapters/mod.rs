//! Array adapters and their registry.
//!
//! An [`ArrayAdapter`] converts values between one native array family and
//! the canonical representation. Exactly one adapter is bound to each
//! function registry; the [`BaseAdapter`] is always available and is used
//! when no adapter name is given.
//!
//! # Architecture
//!
//! Concrete adapters are published as [`AdapterProvider`] entries through
//! `inventory`. The [`AdapterRegistry`] asks a [`ProviderDiscovery`] for the
//! providers, loads each one, and skips (with a warning) any provider that
//! fails to load. The process-wide registry returned by [`adapters()`] is
//! built once on first access.
//!
//! # Example
//!
//! ```
//! use compehndly_core::adapters::{AdapterRegistry, BASE_ADAPTER};
//!
//! let registry = AdapterRegistry::with_base();
//! assert_eq!(registry.resolve(None).unwrap().name(), BASE_ADAPTER);
//! ```

mod base;
#[cfg(feature = "adapter-buffer")]
mod buffer;
#[cfg(feature = "adapter-polars")]
mod series;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::error::{ConversionError, DispatchError, Result};
use crate::value::Value;

pub use base::BaseAdapter;
#[cfg(feature = "adapter-buffer")]
pub use buffer::BufferAdapter;
#[cfg(feature = "adapter-polars")]
pub use series::SeriesAdapter;

/// Name of the always-present fallback adapter.
pub const BASE_ADAPTER: &str = "base";

/// Converter between one native array family and canonical values.
///
/// Adapters are pure and stateless; they must be safe to share across threads.
pub trait ArrayAdapter: Send + Sync {
    /// Registry key for this adapter (e.g. "base", "buffer", "polars").
    fn name(&self) -> &'static str;

    /// Cheap runtime type check; performs no conversion.
    fn matches(&self, value: &Value) -> bool;

    /// Converts a native value into canonical form.
    ///
    /// Scalars are returned unchanged.
    fn to_canonical(&self, value: Value) -> std::result::Result<Value, ConversionError>;

    /// Converts a canonical result back to the adapter's native form.
    ///
    /// Scalars are returned unchanged.
    fn from_canonical(&self, value: Value) -> std::result::Result<Value, ConversionError>;
}

/// A named, lazily constructed adapter published to plugin discovery.
pub struct AdapterProvider {
    pub name: &'static str,
    pub load: fn() -> std::result::Result<Box<dyn ArrayAdapter>, String>,
}

inventory::collect!(AdapterProvider);

/// Source of adapter providers.
pub trait ProviderDiscovery {
    fn providers(&self) -> Vec<&AdapterProvider>;
}

/// Discovers every provider submitted with `inventory::submit!` in linked crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryDiscovery;

impl ProviderDiscovery for InventoryDiscovery {
    fn providers(&self) -> Vec<&AdapterProvider> {
        inventory::iter::<AdapterProvider>.into_iter().collect()
    }
}

/// Fixed list of providers, for tests and embedders that bypass `inventory`.
#[derive(Default)]
pub struct StaticDiscovery {
    providers: Vec<AdapterProvider>,
}

impl StaticDiscovery {
    pub fn new(providers: Vec<AdapterProvider>) -> Self {
        Self { providers }
    }
}

impl ProviderDiscovery for StaticDiscovery {
    fn providers(&self) -> Vec<&AdapterProvider> {
        self.providers.iter().collect()
    }
}

/// Registry of loaded adapters keyed by name.
///
/// The base adapter is always present regardless of discovery outcome.
#[derive(Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<&'static str, Arc<dyn ArrayAdapter>>,
}

impl AdapterRegistry {
    /// Creates a registry holding only the base adapter.
    pub fn with_base() -> Self {
        let mut adapters: BTreeMap<&'static str, Arc<dyn ArrayAdapter>> = BTreeMap::new();
        adapters.insert(BASE_ADAPTER, Arc::new(BaseAdapter));
        Self { adapters }
    }

    /// Loads every provider reported by `discovery`.
    ///
    /// A provider that fails to load is logged and skipped.
    pub fn discover(discovery: &dyn ProviderDiscovery) -> Self {
        debug!("registering adapters");
        let mut registry = Self::with_base();
        for provider in discovery.providers() {
            match (provider.load)() {
                Ok(adapter) => {
                    debug!(provider = provider.name, "loaded adapter provider");
                    registry.register(Arc::from(adapter));
                }
                Err(reason) => {
                    let error = DispatchError::PluginLoadFailure {
                        provider: provider.name.to_string(),
                        reason,
                    };
                    warn!(%error, "skipping adapter provider");
                }
            }
        }
        registry
    }

    /// Registers an adapter under its own name, replacing any previous entry.
    ///
    /// The base adapter cannot be replaced.
    pub fn register(&mut self, adapter: Arc<dyn ArrayAdapter>) {
        let name = adapter.name();
        if name == BASE_ADAPTER {
            debug!("ignoring provider that shadows the base adapter");
            return;
        }
        self.adapters.insert(name, adapter);
    }

    /// Resolves an adapter by name; `None` selects the base adapter.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownAdapter`] when `name` is not registered.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn ArrayAdapter>> {
        let key = name.unwrap_or(BASE_ADAPTER);
        self.adapters
            .get(key)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownAdapter {
                name: key.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    /// Returns the first non-base adapter whose `matches` accepts `value`.
    pub fn detect(&self, value: &Value) -> Option<Arc<dyn ArrayAdapter>> {
        self.adapters
            .values()
            .filter(|a| a.name() != BASE_ADAPTER)
            .find(|a| a.matches(value))
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_base()
    }
}

static ADAPTERS: OnceLock<AdapterRegistry> = OnceLock::new();

/// Returns the process-wide adapter registry, discovering providers on first access.
pub fn adapters() -> &'static AdapterRegistry {
    ADAPTERS.get_or_init(|| AdapterRegistry::discover(&InventoryDiscovery))
}
