//! Versioned function registry with array adapter dispatch.
//!
//! Domain functions are written once against canonical values
//! ([`CanonicalArray`] and plain scalars) and registered by name and semantic
//! version. Callers look them up by name, optionally pinning a version, and
//! pass values in whatever native array family the registry's adapter
//! understands; arguments and results are converted at the boundary.
//!
//! Two registry strategies share the [`FunctionLookup`] surface:
//!
//! - [`FunctionRegistry`]: every unit imported up front by [`build_registry`]
//! - [`LazyRegistry`]: functions bound on first use from a persisted [`Manifest`]
//!
//! The process-wide [`RegistryHandle`] (see [`global`]) picks one according to
//! [`RegistryConfig`].

pub mod adapters;
pub mod compute;
pub mod config;
pub mod conversion;
pub mod error;
pub mod handle;
pub mod lazy;
pub mod manifest;
pub mod module;
pub mod registry;
pub mod value;
pub mod version;

pub use adapters::{
    AdapterProvider, AdapterRegistry, ArrayAdapter, BASE_ADAPTER, BaseAdapter, InventoryDiscovery,
    ProviderDiscovery, StaticDiscovery, adapters as adapter_registry,
};
pub use config::{RegistryConfig, RegistryStrategy};
pub use conversion::{CanonicalFn, DispatchFn, wrap};
pub use error::{CallError, ComputeError, ConversionError, DispatchError, Result};
pub use handle::{FunctionAccessor, RegistryHandle, build_from_config, global};
pub use lazy::{LazyRegistry, bootstrap};
pub use manifest::{Manifest, ManifestEntry, build_manifest, collect_manifest};
pub use module::{DEFAULT_TARGET, FunctionModule, ModuleCatalog, Registration, RegistrationTable};
pub use registry::{FunctionLookup, FunctionRegistry, build_registry};
pub use value::{Args, CanonicalArray, NativeValue, Value};
pub use version::Version;
