//! Eager function registry.
//!
//! Maps a function name to its versions, each stored already wrapped for the
//! registry's adapter. Versions are parsed once at registration and kept in
//! a sorted map, so "latest" and [`FunctionRegistry::list_versions`] never
//! re-parse.
//!
//! A registry is filled during [`build_registry`] and then shared behind an
//! `Arc`, after which it is read-only.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::{AdapterRegistry, ArrayAdapter};
use crate::conversion::{CanonicalFn, DispatchFn, wrap};
use crate::error::{DispatchError, Result};
use crate::module::{ModuleCatalog, Registration};
use crate::value::{Args, Value};
use crate::version::Version;

/// Read access shared by the eager and the lazy registry.
pub trait FunctionLookup: Send + Sync {
    /// Resolves `name` to its latest version, or to the exact `version` when given.
    fn get(&self, name: &str, version: Option<&str>) -> Result<DispatchFn>;

    /// Versions registered under `name`, ascending; empty when unknown.
    fn list_versions(&self, name: &str) -> Vec<String>;

    fn contains(&self, name: &str) -> bool;

    /// All function names, sorted.
    fn function_names(&self) -> Vec<String>;

    /// Name of the adapter every resolved function is bound to.
    fn adapter_name(&self) -> &'static str;
}

/// Picks the entry for `version` (exact) or the greatest one.
pub(crate) fn select<'a, T>(
    name: &str,
    versions: &'a BTreeMap<Version, T>,
    requested: Option<&str>,
) -> Result<(Version, &'a T)> {
    match requested {
        None => versions
            .iter()
            .next_back()
            .map(|(v, entry)| (*v, entry))
            .ok_or_else(|| DispatchError::UnknownFunction {
                name: name.to_string(),
            }),
        Some(text) => {
            let version = Version::parse(text)?;
            versions
                .get(&version)
                .map(|entry| (version, entry))
                .ok_or_else(|| DispatchError::UnknownVersion {
                    name: name.to_string(),
                    version: text.to_string(),
                    available: join_versions(versions.keys()),
                })
        }
    }
}

pub(crate) fn join_versions<'a>(versions: impl Iterator<Item = &'a Version>) -> String {
    versions
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Name → version → wrapped implementation.
pub struct FunctionRegistry {
    adapter: Arc<dyn ArrayAdapter>,
    functions: HashMap<String, BTreeMap<Version, DispatchFn>>,
}

impl FunctionRegistry {
    /// Creates an empty registry bound to the named adapter (`None` = base).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownAdapter`] before anything is registered
    /// when `adapter` is not in `adapters`.
    pub fn new(adapter: Option<&str>, adapters: &AdapterRegistry) -> Result<Self> {
        let adapter = adapters.resolve(adapter)?;
        Ok(Self::with_adapter(adapter))
    }

    pub fn with_adapter(adapter: Arc<dyn ArrayAdapter>) -> Self {
        Self {
            adapter,
            functions: HashMap::new(),
        }
    }

    /// Wraps `implementation` and stores it under `(name, version)`.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidVersion`] if `version` does not parse
    /// - [`DispatchError::DuplicateRegistration`] if the pair already exists;
    ///   the existing entry is kept
    pub fn register(&mut self, name: &str, version: &str, implementation: CanonicalFn) -> Result<()> {
        let parsed = Version::parse(version)?;
        let versions = self.functions.entry(name.to_string()).or_default();
        if versions.contains_key(&parsed) {
            return Err(DispatchError::DuplicateRegistration {
                name: name.to_string(),
                version: parsed.to_string(),
            });
        }
        debug!(function = name, version = %parsed, "registered function");
        versions.insert(parsed, wrap(implementation, Arc::clone(&self.adapter)));
        Ok(())
    }

    /// Convenience for registering a closure.
    pub fn register_fn<F>(&mut self, name: &str, version: &str, implementation: F) -> Result<()>
    where
        F: Fn(&Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(name, version, Arc::new(implementation))
    }

    pub fn get(&self, name: &str, version: Option<&str>) -> Result<DispatchFn> {
        let versions = self
            .functions
            .get(name)
            .filter(|versions| !versions.is_empty())
            .ok_or_else(|| DispatchError::UnknownFunction {
                name: name.to_string(),
            })?;
        select(name, versions, version).map(|(_, entry)| entry.clone())
    }

    pub fn list_versions(&self, name: &str) -> Vec<String> {
        self.functions
            .get(name)
            .map(|versions| versions.keys().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    /// Fails on the first row that would not register cleanly.
    fn check_unit(&self, rows: &[Registration]) -> Result<()> {
        let mut staged = HashSet::new();
        for row in rows {
            let version = Version::parse(&row.version)?;
            let taken = self
                .functions
                .get(&row.name)
                .is_some_and(|versions| versions.contains_key(&version));
            if taken || !staged.insert((row.name.as_str(), version)) {
                return Err(DispatchError::DuplicateRegistration {
                    name: row.name.clone(),
                    version: version.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.functions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FunctionLookup for FunctionRegistry {
    fn get(&self, name: &str, version: Option<&str>) -> Result<DispatchFn> {
        FunctionRegistry::get(self, name, version)
    }

    fn list_versions(&self, name: &str) -> Vec<String> {
        FunctionRegistry::list_versions(self, name)
    }

    fn contains(&self, name: &str) -> bool {
        self.functions.get(name).is_some_and(|v| !v.is_empty())
    }

    fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }
}

/// Imports each unit and registers its declarations into a fresh registry.
///
/// A unit is checked as a whole before any of its rows are registered, so
/// a failing unit contributes nothing. Units without registrations are skipped.
///
/// # Errors
///
/// - [`DispatchError::UnknownAdapter`] for an unregistered adapter name
/// - [`DispatchError::ModuleImportFailure`] for an unknown locator
/// - [`DispatchError::UnsupportedRegistryTarget`] for a non-default target
/// - [`DispatchError::InvalidVersion`] / [`DispatchError::DuplicateRegistration`]
pub fn build_registry<S: AsRef<str>>(
    locators: &[S],
    adapter: Option<&str>,
    catalog: &ModuleCatalog,
    adapters: &AdapterRegistry,
) -> Result<FunctionRegistry> {
    let mut registry = FunctionRegistry::new(adapter, adapters)?;
    for locator in locators {
        let locator = locator.as_ref();
        let table = catalog.import(locator)?;
        if table.is_empty() {
            debug!(module = locator, "module declares no functions, skipping");
            continue;
        }
        table.validate_targets()?;
        registry.check_unit(table.rows())?;
        for row in table {
            registry.register(&row.name, &row.version, row.implementation)?;
        }
    }
    info!(
        functions = registry.len(),
        adapter = registry.adapter.name(),
        "function registry built"
    );
    Ok(registry)
}
