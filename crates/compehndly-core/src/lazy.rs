//! Manifest-driven registry.
//!
//! Functions are looked up in a persisted [`Manifest`] and imported only on
//! first use. Resolved functions are cached per `(name, version)` and never
//! evicted. Concurrent first resolutions of the same key are serialized, so
//! each locator is imported and bound at most once.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::adapters::{AdapterRegistry, ArrayAdapter};
use crate::config::RegistryConfig;
use crate::conversion::{DispatchFn, wrap};
use crate::error::{DispatchError, Result};
use crate::manifest::{Manifest, ManifestEntry, build_manifest, manifest_build_in_progress};
use crate::module::ModuleCatalog;
use crate::registry::{FunctionLookup, select};
use crate::version::Version;

/// Registry that binds functions on demand from a manifest.
pub struct LazyRegistry {
    index: HashMap<String, BTreeMap<Version, ManifestEntry>>,
    catalog: ModuleCatalog,
    adapter: Arc<dyn ArrayAdapter>,
    cache: DashMap<(String, Version), DispatchFn>,
}

impl LazyRegistry {
    /// Builds the lookup index from an in-memory manifest.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ManifestMissingOrInvalid`] when a version key
    /// does not parse or two keys normalize to the same version.
    pub fn from_manifest(
        manifest: &Manifest,
        source: &Path,
        adapter: Arc<dyn ArrayAdapter>,
        catalog: ModuleCatalog,
    ) -> Result<Self> {
        let mut index: HashMap<String, BTreeMap<Version, ManifestEntry>> = HashMap::new();
        for (name, versions) in manifest.iter() {
            let parsed = index.entry(name.to_string()).or_default();
            for (text, entry) in versions {
                let version =
                    Version::parse(text).map_err(|e| DispatchError::manifest(source, e))?;
                if parsed.insert(version, entry.clone()).is_some() {
                    return Err(DispatchError::manifest(
                        source,
                        format!("function '{name}' lists version {version} twice"),
                    ));
                }
            }
        }
        Ok(Self {
            index,
            catalog,
            adapter,
            cache: DashMap::new(),
        })
    }

    /// Loads the manifest at `path`.
    ///
    /// The adapter is resolved first, so an unknown adapter is reported as
    /// such even when the manifest is missing.
    pub fn load(
        path: &Path,
        adapter: Option<&str>,
        catalog: ModuleCatalog,
        adapters: &AdapterRegistry,
    ) -> Result<Self> {
        let adapter = adapters.resolve(adapter)?;
        let manifest = Manifest::load(path)?;
        debug!(path = %path.display(), functions = manifest.len(), "manifest loaded");
        Self::from_manifest(&manifest, path, adapter, catalog)
    }

    /// Number of functions bound so far.
    pub fn resolved_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_resolved(&self, name: &str, version: &str) -> bool {
        Version::parse(version)
            .map(|v| self.cache.contains_key(&(name.to_string(), v)))
            .unwrap_or(false)
    }

    fn bind(&self, name: &str, version: Version, entry: &ManifestEntry) -> Result<DispatchFn> {
        let table = self.catalog.import(&entry.module)?;
        let registration = table
            .find(name, version, &entry.function)
            .ok_or_else(|| DispatchError::MissingSymbol {
                module: entry.module.clone(),
                symbol: entry.function.clone(),
            })?;
        debug!(function = name, %version, module = %entry.module, "bound function on first use");
        Ok(wrap(
            Arc::clone(&registration.implementation),
            Arc::clone(&self.adapter),
        ))
    }
}

impl FunctionLookup for LazyRegistry {
    fn get(&self, name: &str, version: Option<&str>) -> Result<DispatchFn> {
        let versions = self
            .index
            .get(name)
            .filter(|versions| !versions.is_empty())
            .ok_or_else(|| DispatchError::UnknownFunction {
                name: name.to_string(),
            })?;
        let (version, entry) = select(name, versions, version)?;
        let key = (name.to_string(), version);
        if let Some(cached) = self.cache.get(&key).map(|slot| slot.value().clone()) {
            return Ok(cached);
        }
        let slot = self
            .cache
            .entry(key)
            .or_try_insert_with(|| self.bind(name, version, entry))?;
        Ok(slot.value().clone())
    }

    fn list_versions(&self, name: &str) -> Vec<String> {
        self.index
            .get(name)
            .map(|versions| versions.keys().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    fn contains(&self, name: &str) -> bool {
        self.index.get(name).is_some_and(|v| !v.is_empty())
    }

    fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.keys().cloned().collect();
        names.sort();
        names
    }

    fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }
}

/// Loads the configured manifest, rebuilding it once if it is missing or invalid.
///
/// No rebuild happens while a manifest build is already running or when
/// `config.no_manifest_rebuild` is set; the load error is returned instead.
pub fn bootstrap(
    config: &RegistryConfig,
    catalog: ModuleCatalog,
    adapters: &AdapterRegistry,
) -> Result<LazyRegistry> {
    let path: &PathBuf = &config.manifest_path;
    match LazyRegistry::load(path, config.adapter_name(), catalog.clone(), adapters) {
        Err(error @ DispatchError::ManifestMissingOrInvalid { .. }) => {
            if config.no_manifest_rebuild || manifest_build_in_progress() {
                return Err(error);
            }
            warn!(%error, "rebuilding manifest");
            build_manifest(&catalog, path)?;
            let registry = LazyRegistry::load(path, config.adapter_name(), catalog, adapters)?;
            info!(path = %path.display(), "manifest rebuilt");
            Ok(registry)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::adapters::BaseAdapter;
    use crate::module::{FunctionModule, RegistrationTable};
    use crate::value::{Args, Value};

    fn declare(table: &mut RegistrationTable) {
        table.register("neg", "1.0.0", "neg", |args: &Args| {
            Ok(Value::from(args.get(0).and_then(Value::as_f64).map(|v| -v)))
        });
    }

    fn catalog() -> ModuleCatalog {
        ModuleCatalog::new().with_module(FunctionModule {
            path: "units::neg",
            declare,
        })
    }

    thread_local! {
        static NESTED_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
        static NESTED_OUTCOME: RefCell<Option<Result<Vec<String>>>> = const { RefCell::new(None) };
    }

    /// A unit that bootstraps a lazy registry while it is being imported.
    fn declare_nested(table: &mut RegistrationTable) {
        if let Some(path) = NESTED_PATH.with_borrow(Clone::clone) {
            let config = RegistryConfig::default().with_manifest_path(path);
            let outcome = bootstrap(&config, catalog(), &AdapterRegistry::with_base())
                .map(|registry| registry.function_names());
            NESTED_OUTCOME.set(Some(outcome));
        }
        declare(table);
    }

    fn manifest(function: &str) -> Manifest {
        let mut manifest = Manifest::new();
        manifest
            .insert(
                "neg",
                "1.0",
                ManifestEntry {
                    module: "units::neg".to_string(),
                    function: function.to_string(),
                },
            )
            .unwrap();
        manifest
    }

    fn lazy(manifest: &Manifest) -> LazyRegistry {
        LazyRegistry::from_manifest(manifest, Path::new("m.json"), Arc::new(BaseAdapter), catalog())
            .unwrap()
    }

    #[test]
    fn binds_on_first_use_and_caches() {
        let registry = lazy(&manifest("neg"));
        assert_eq!(registry.resolved_len(), 0);
        let first = registry.get("neg", None).unwrap();
        assert_eq!(first.call_with([2.0]).unwrap(), Value::Float(-2.0));
        let second = registry.get("neg", Some("1.0.0")).unwrap();
        assert!(first.same_implementation(&second));
        assert_eq!(registry.resolved_len(), 1);
        assert!(registry.is_resolved("neg", "1"));
    }

    #[test]
    fn missing_symbol_is_fatal_and_not_cached() {
        let registry = lazy(&manifest("renamed"));
        assert!(matches!(
            registry.get("neg", None),
            Err(DispatchError::MissingSymbol { .. })
        ));
        assert_eq!(registry.resolved_len(), 0);
    }

    #[test]
    fn unknown_module_is_an_import_failure() {
        let mut m = Manifest::new();
        m.insert(
            "neg",
            "1.0.0",
            ManifestEntry {
                module: "units::gone".to_string(),
                function: "neg".to_string(),
            },
        )
        .unwrap();
        assert!(matches!(
            lazy(&m).get("neg", None),
            Err(DispatchError::ModuleImportFailure { .. })
        ));
    }

    #[test]
    fn concurrent_first_use_binds_once() {
        let registry = Arc::new(lazy(&manifest("neg")));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get("neg", None).unwrap())
            })
            .collect();
        let resolved: Vec<DispatchFn> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(resolved.windows(2).all(|w| w[0].same_implementation(&w[1])));
        assert_eq!(registry.resolved_len(), 1);
    }

    #[test]
    fn bootstrap_rebuilds_missing_manifest_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::default().with_manifest_path(dir.path().join("m.json"));
        let registry = bootstrap(&config, catalog(), &AdapterRegistry::with_base()).unwrap();
        assert_eq!(registry.list_versions("neg"), vec!["1.0.0"]);
        assert!(config.manifest_path.exists());
    }

    #[test]
    fn bootstrap_respects_rebuild_suppression() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::default()
            .with_manifest_path(dir.path().join("m.json"))
            .with_no_manifest_rebuild(true);
        let err = bootstrap(&config, catalog(), &AdapterRegistry::with_base())
            .err()
            .unwrap();
        assert!(matches!(err, DispatchError::ManifestMissingOrInvalid { .. }));
        assert!(!config.manifest_path.exists());
    }

    #[test]
    fn bootstrap_inside_a_manifest_build_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested.json");
        let outer = dir.path().join("outer.json");
        let catalog = ModuleCatalog::new().with_module(FunctionModule {
            path: "units::nested",
            declare: declare_nested,
        });

        NESTED_PATH.set(Some(nested.clone()));
        let manifest = build_manifest(&catalog, &outer).unwrap();
        NESTED_PATH.set(None);

        let outcome = NESTED_OUTCOME.take().unwrap();
        assert!(matches!(
            outcome,
            Err(DispatchError::ManifestMissingOrInvalid { .. })
        ));
        assert!(!nested.exists());
        assert!(outer.exists());
        assert!(manifest.get("neg").is_some());
        assert!(!manifest_build_in_progress());
    }
}
