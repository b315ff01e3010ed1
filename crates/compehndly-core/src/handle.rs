//! Process-wide registry handle.
//!
//! A [`RegistryHandle`] builds its registry on the first [`get`](RegistryHandle::get)
//! and hands out the same `Arc` afterwards. Construction, override and reset
//! all run under one lock, so a reader sees either the registry from before an
//! override or the one built after it, never a partial one.

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::adapters::{AdapterRegistry, adapters};
use crate::config::{RegistryConfig, RegistryStrategy};
use crate::conversion::DispatchFn;
use crate::error::{CallError, DispatchError, Result};
use crate::lazy::bootstrap;
use crate::module::ModuleCatalog;
use crate::registry::{FunctionLookup, build_registry};
use crate::value::{Args, Value};

/// Constructs the registry a handle exposes.
type RegistryBuilder = Arc<dyn Fn() -> Result<Arc<dyn FunctionLookup>> + Send + Sync>;

struct HandleState {
    builder: RegistryBuilder,
    current: Option<Arc<dyn FunctionLookup>>,
}

/// Lazily constructed, swappable registry.
pub struct RegistryHandle {
    state: Mutex<HandleState>,
}

impl RegistryHandle {
    pub fn new<F>(builder: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn FunctionLookup>> + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(HandleState {
                builder: Arc::new(builder),
                current: None,
            }),
        }
    }

    /// Handle whose builder follows `config`, using every discovered unit and adapter.
    pub fn from_config(config: RegistryConfig) -> Self {
        Self::new(move || build_from_config(&config, ModuleCatalog::discover(), adapters()))
    }

    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the registry, building it on first use.
    ///
    /// A failed build is not cached; the next call tries again. The builder
    /// must not call back into the same handle.
    pub fn get(&self) -> Result<Arc<dyn FunctionLookup>> {
        let mut state = self.lock();
        if let Some(current) = &state.current {
            return Ok(Arc::clone(current));
        }
        let registry = (state.builder)()?;
        debug!(adapter = registry.adapter_name(), "registry handle initialized");
        state.current = Some(Arc::clone(&registry));
        Ok(registry)
    }

    /// Replaces the builder and drops the cached registry in one step.
    pub fn override_builder<F>(&self, builder: F)
    where
        F: Fn() -> Result<Arc<dyn FunctionLookup>> + Send + Sync + 'static,
    {
        let mut state = self.lock();
        state.builder = Arc::new(builder);
        state.current = None;
        info!("registry handle overridden");
    }

    /// Installs an already built registry.
    pub fn override_with(&self, registry: Arc<dyn FunctionLookup>) {
        let cached = Arc::clone(&registry);
        let mut state = self.lock();
        state.builder = Arc::new(move || -> Result<Arc<dyn FunctionLookup>> {
            Ok(Arc::clone(&registry))
        });
        state.current = Some(cached);
    }

    /// Drops the cached registry; the next [`get`](Self::get) rebuilds it.
    pub fn reset(&self) {
        self.lock().current = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Returns an accessor for `name` in the current registry.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownFunction`] when the active registry has no
    /// function of that name.
    pub fn lookup(&self, name: &str) -> Result<FunctionAccessor> {
        let registry = self.get()?;
        if !registry.contains(name) {
            return Err(DispatchError::UnknownFunction {
                name: name.to_string(),
            });
        }
        Ok(FunctionAccessor {
            name: name.to_string(),
            registry,
        })
    }
}

impl fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// All versions of one function in a registry.
///
/// Calling it directly selects the latest version; [`version`](Self::version)
/// selects an exact one.
#[derive(Clone)]
pub struct FunctionAccessor {
    name: String,
    registry: Arc<dyn FunctionLookup>,
}

impl FunctionAccessor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the latest version.
    pub fn call(&self, args: Args) -> std::result::Result<Value, CallError> {
        self.latest()?.call(args)
    }

    pub fn call_with<I, V>(&self, values: I) -> std::result::Result<Value, CallError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.latest()?.call_with(values)
    }

    pub fn latest(&self) -> Result<DispatchFn> {
        self.registry.get(&self.name, None)
    }

    /// Resolves an exact version.
    pub fn version(&self, version: &str) -> Result<DispatchFn> {
        self.registry.get(&self.name, Some(version))
    }

    pub fn versions(&self) -> Vec<String> {
        self.registry.list_versions(&self.name)
    }
}

impl fmt::Debug for FunctionAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionAccessor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Builds the registry `config` describes.
///
/// The eager strategy imports `config.modules`, or every unit in `catalog`
/// when that list is empty. The lazy strategy bootstraps from the manifest.
pub fn build_from_config(
    config: &RegistryConfig,
    catalog: ModuleCatalog,
    adapters: &AdapterRegistry,
) -> Result<Arc<dyn FunctionLookup>> {
    match config.strategy {
        RegistryStrategy::Eager => {
            let locators: Vec<String> = if config.modules.is_empty() {
                catalog.modules().map(str::to_string).collect()
            } else {
                config.modules.clone()
            };
            let registry = build_registry(&locators, config.adapter_name(), &catalog, adapters)?;
            Ok(Arc::new(registry))
        }
        RegistryStrategy::Lazy => Ok(Arc::new(bootstrap(config, catalog, adapters)?)),
    }
}

static GLOBAL: LazyLock<RegistryHandle> = LazyLock::new(|| {
    RegistryHandle::new(|| {
        let config = RegistryConfig::from_env()?;
        build_from_config(&config, ModuleCatalog::discover(), adapters())
    })
});

/// The process-wide handle, configured from the environment on first use.
pub fn global() -> &'static RegistryHandle {
    &GLOBAL
}
