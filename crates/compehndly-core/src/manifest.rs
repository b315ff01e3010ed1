//! Persisted function manifest.
//!
//! The manifest maps each function name to its versions and, for each
//! version, the unit that declares it:
//!
//! ```json
//! {
//!   "add_one": {
//!     "0.0.1": { "module": "compehndly_derived::example", "function": "add_one_v0_0_1" }
//!   }
//! }
//! ```
//!
//! [`build_manifest`] is the build-time step that writes this file; the
//! [`LazyRegistry`](crate::lazy::LazyRegistry) reads it.

#![deny(unsafe_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DispatchError, Result};
use crate::module::ModuleCatalog;
use crate::version::Version;

/// Locator of one function version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub module: String,
    pub function: String,
}

/// Name → version text → locator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    functions: BTreeMap<String, BTreeMap<String, ManifestEntry>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and decodes a manifest file.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ManifestMissingOrInvalid`] when the file cannot
    /// be read or is not a manifest.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DispatchError::manifest(path, e))?;
        serde_json::from_str(&text).map_err(|e| DispatchError::manifest(path, e))
    }

    /// Writes the manifest as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_error = |source: std::io::Error| DispatchError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_error(std::io::Error::other(e)))?;
        fs::write(path, json).map_err(write_error)?;
        info!(path = %path.display(), functions = self.len(), "manifest written");
        Ok(())
    }

    /// Adds a locator; `version` is stored in normalized form.
    ///
    /// # Errors
    ///
    /// Fails with [`DispatchError::DuplicateRegistration`] if the pair exists.
    pub fn insert(&mut self, name: &str, version: &str, entry: ManifestEntry) -> Result<()> {
        let version = Version::parse(version)?.to_string();
        let versions = self.functions.entry(name.to_string()).or_default();
        if versions.contains_key(&version) {
            return Err(DispatchError::DuplicateRegistration {
                name: name.to_string(),
                version,
            });
        }
        versions.insert(version, entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, ManifestEntry>> {
        self.functions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, ManifestEntry>)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of function names.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

thread_local! {
    static BUILD_IN_PROGRESS: Cell<bool> = const { Cell::new(false) };
}

/// True while [`build_manifest`] is running on the current thread.
pub fn manifest_build_in_progress() -> bool {
    BUILD_IN_PROGRESS.with(Cell::get)
}

struct BuildGuard {
    previous: bool,
}

impl BuildGuard {
    fn enter() -> Self {
        Self {
            previous: BUILD_IN_PROGRESS.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILD_IN_PROGRESS.with(|flag| flag.set(self.previous));
    }
}

/// Imports every unit in `catalog` and records their registrations.
///
/// Nothing is written when any unit fails.
pub fn collect_manifest(catalog: &ModuleCatalog) -> Result<Manifest> {
    let mut manifest = Manifest::new();
    for locator in catalog.modules() {
        let table = catalog.import(locator)?;
        table.validate_targets()?;
        for row in table.rows() {
            debug!(function = %row.name, version = %row.version, module = locator, "recording function");
            manifest.insert(
                &row.name,
                &row.version,
                ManifestEntry {
                    module: locator.to_string(),
                    function: row.symbol.clone(),
                },
            )?;
        }
    }
    Ok(manifest)
}

/// Walks every unit in `catalog` and persists the manifest to `path`.
///
/// Sets the build flag for the current thread while it runs, which keeps the
/// lazy bootstrap from starting a nested rebuild.
pub fn build_manifest(catalog: &ModuleCatalog, path: &Path) -> Result<Manifest> {
    let _guard = BuildGuard::enter();
    info!(path = %path.display(), modules = catalog.len(), "building manifest");
    let manifest = collect_manifest(catalog)?;
    manifest.save(path)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(module: &str, function: &str) -> ManifestEntry {
        ManifestEntry {
            module: module.to_string(),
            function: function.to_string(),
        }
    }

    #[test]
    fn insert_normalizes_and_rejects_duplicates() {
        let mut manifest = Manifest::new();
        manifest.insert("f", "0.1", entry("m", "f1")).unwrap();
        assert!(manifest.get("f").unwrap().contains_key("0.1.0"));
        assert!(matches!(
            manifest.insert("f", "0.1.0", entry("m", "f2")),
            Err(DispatchError::DuplicateRegistration { .. })
        ));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("manifest.json");
        let mut manifest = Manifest::new();
        manifest.insert("f", "1.0.0", entry("units::a", "f_v1")).unwrap();
        manifest.insert("g", "0.0.2", entry("units::b", "g")).unwrap();
        manifest.save(&path).unwrap();
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn missing_and_malformed_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            Manifest::load(&missing),
            Err(DispatchError::ManifestMissingOrInvalid { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, r#"{"f": {"1.0.0": {"module": "m"}}}"#).unwrap();
        assert!(matches!(
            Manifest::load(&broken),
            Err(DispatchError::ManifestMissingOrInvalid { .. })
        ));
    }
}
