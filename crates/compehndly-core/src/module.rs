//! Function units and the catalog that finds them.
//!
//! A function unit is a [`FunctionModule`]: a locator plus a `declare`
//! function that appends registrations to a [`RegistrationTable`] passed to
//! it. Nothing is registered as a side effect of linking; the build step
//! imports units through a [`ModuleCatalog`] and collects their tables.
//!
//! Units publish themselves with `inventory`:
//!
//! ```ignore
//! fn declare(table: &mut RegistrationTable) {
//!     table.register("add_one", "0.0.1", "add_one_v1", add_one_v1);
//! }
//!
//! inventory::submit! {
//!     FunctionModule { path: "my_crate::example", declare }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::conversion::CanonicalFn;
use crate::error::{DispatchError, Result};
use crate::value::{Args, Value};
use crate::version::Version;

/// The only registry target recognized by the build step.
pub const DEFAULT_TARGET: &str = "default";

/// A unit of domain functions discoverable by the build step.
#[derive(Clone, Copy)]
pub struct FunctionModule {
    /// Module locator, recorded in manifests.
    pub path: &'static str,
    /// Appends this unit's registrations to the table.
    pub declare: fn(&mut RegistrationTable),
}

inventory::collect!(FunctionModule);

impl FunctionModule {
    /// Runs `declare` into a fresh table.
    pub fn registrations(&self) -> RegistrationTable {
        let mut table = RegistrationTable::new(self.path);
        (self.declare)(&mut table);
        table
    }
}

impl fmt::Debug for FunctionModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionModule")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// One declared `(target, name, version, symbol, implementation)` row.
#[derive(Clone)]
pub struct Registration {
    pub target: String,
    pub name: String,
    pub version: String,
    /// Unit-local function locator.
    pub symbol: String,
    pub implementation: CanonicalFn,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("target", &self.target)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("symbol", &self.symbol)
            .finish_non_exhaustive()
    }
}

/// Ordered registrations declared by one unit.
#[derive(Debug, Clone)]
pub struct RegistrationTable {
    module: String,
    rows: Vec<Registration>,
}

impl RegistrationTable {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            rows: Vec::new(),
        }
    }

    /// Declares a function in the default target.
    pub fn register<F>(&mut self, name: &str, version: &str, symbol: &str, implementation: F)
    where
        F: Fn(&Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register_in(DEFAULT_TARGET, name, version, symbol, implementation);
    }

    /// Declares a function in an explicit target.
    pub fn register_in<F>(
        &mut self,
        target: &str,
        name: &str,
        version: &str,
        symbol: &str,
        implementation: F,
    ) where
        F: Fn(&Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.rows.push(Registration {
            target: target.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            symbol: symbol.to_string(),
            implementation: Arc::new(implementation),
        });
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn rows(&self) -> &[Registration] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fails with [`DispatchError::UnsupportedRegistryTarget`] on the first
    /// row outside the default target.
    pub fn validate_targets(&self) -> Result<()> {
        match self.rows.iter().find(|row| row.target != DEFAULT_TARGET) {
            Some(row) => Err(DispatchError::UnsupportedRegistryTarget {
                target: row.target.clone(),
                module: self.module.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Finds the row declaring `name` at `version` under `symbol`.
    ///
    /// Symbols may repeat across versions, so all three must agree.
    pub fn find(&self, name: &str, version: Version, symbol: &str) -> Option<&Registration> {
        self.rows.iter().find(|row| {
            row.symbol == symbol
                && row.name == name
                && Version::parse(&row.version).is_ok_and(|v| v == version)
        })
    }
}

impl IntoIterator for RegistrationTable {
    type Item = Registration;
    type IntoIter = std::vec::IntoIter<Registration>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Maps module locators to function units.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: BTreeMap<&'static str, FunctionModule>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every unit submitted with `inventory::submit!` in linked crates.
    pub fn discover() -> Self {
        let mut catalog = Self::new();
        for module in inventory::iter::<FunctionModule> {
            catalog.insert(*module);
        }
        debug!(modules = catalog.len(), "discovered function modules");
        catalog
    }

    #[must_use]
    pub fn with_module(mut self, module: FunctionModule) -> Self {
        self.insert(module);
        self
    }

    pub fn insert(&mut self, module: FunctionModule) {
        self.modules.insert(module.path, module);
    }

    /// Imports the unit at `locator` and returns its declared registrations.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ModuleImportFailure`] when no unit has this locator.
    pub fn import(&self, locator: &str) -> Result<RegistrationTable> {
        let module = self
            .modules
            .get(locator)
            .ok_or_else(|| DispatchError::ModuleImportFailure {
                module: locator.to_string(),
                reason: "no function module with this path is linked".to_string(),
            })?;
        debug!(module = locator, "importing function module");
        Ok(module.registrations())
    }

    /// Locators of every known unit, sorted.
    pub fn modules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modules.keys().copied()
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.modules.contains_key(locator)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declare_pair(table: &mut RegistrationTable) {
        table.register("twice", "1.0.0", "twice", |args: &Args| {
            Ok(Value::from(args.get(0).and_then(Value::as_f64).map(|v| v * 2.0)))
        });
        table.register_in("extra", "noop", "0.1", "noop", |_: &Args| Ok(Value::Null));
    }

    fn declare_nothing(_: &mut RegistrationTable) {}

    #[test]
    fn import_runs_declare_into_fresh_table() {
        let catalog = ModuleCatalog::new().with_module(FunctionModule {
            path: "units::pair",
            declare: declare_pair,
        });
        let table = catalog.import("units::pair").unwrap();
        assert_eq!(table.module(), "units::pair");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].target, DEFAULT_TARGET);
        let v01 = Version::parse("0.1").unwrap();
        assert!(table.find("noop", v01, "noop").is_some());
        assert!(table.find("noop", v01, "missing").is_none());
        assert!(table.find("twice", v01, "twice").is_none());

        // importing twice yields independent tables
        assert_eq!(catalog.import("units::pair").unwrap().len(), 2);
    }

    #[test]
    fn non_default_target_is_rejected() {
        let table = FunctionModule {
            path: "units::pair",
            declare: declare_pair,
        }
        .registrations();
        let err = table.validate_targets().unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnsupportedRegistryTarget { ref target, ref module }
                if target == "extra" && module == "units::pair"
        ));
    }

    #[test]
    fn unknown_locator_fails_import() {
        let catalog = ModuleCatalog::new().with_module(FunctionModule {
            path: "units::empty",
            declare: declare_nothing,
        });
        assert!(catalog.import("units::empty").unwrap().is_empty());
        assert!(matches!(
            catalog.import("units::absent"),
            Err(DispatchError::ModuleImportFailure { .. })
        ));
    }
}
