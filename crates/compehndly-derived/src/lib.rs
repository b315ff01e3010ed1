//! Derived variables for human biomonitoring data.
//!
//! Each module is a function unit: it declares its functions into a
//! [`RegistrationTable`](compehndly_core::RegistrationTable) and publishes
//! itself for discovery by the registry build step. Implementations only see
//! canonical values, so they work unchanged behind any array adapter.
//!
//! # Example
//!
//! ```
//! use compehndly_core::{AdapterRegistry, Value, build_registry};
//!
//! let catalog = compehndly_derived::catalog();
//! let locators: Vec<&str> = catalog.modules().collect();
//! let registry = build_registry(&locators, None, &catalog, &AdapterRegistry::with_base())?;
//! let out = registry.get("standardize", None)?.call_with([5.0, 200.0]).unwrap();
//! assert_eq!(out, Value::Float(2.5));
//! # Ok::<(), compehndly_core::DispatchError>(())
//! ```

pub mod correction;
pub mod example;
pub mod imputation;
pub mod summation;

use compehndly_core::{FunctionModule, ModuleCatalog};

/// Every unit defined in this crate.
pub const MODULES: [FunctionModule; 4] = [
    correction::MODULE,
    example::MODULE,
    imputation::MODULE,
    summation::MODULE,
];

/// Catalog of this crate's units.
///
/// Unlike [`ModuleCatalog::discover`], the result does not depend on which
/// other unit crates are linked into the binary.
pub fn catalog() -> ModuleCatalog {
    MODULES
        .into_iter()
        .fold(ModuleCatalog::new(), ModuleCatalog::with_module)
}
