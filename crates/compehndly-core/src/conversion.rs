//! Boundary conversion around canonical implementations.
//!
//! [`wrap`] binds an implementation to an adapter: each positional and
//! keyword value goes through `to_canonical`, the implementation runs, and
//! its single result goes through `from_canonical`. Errors from any of the
//! three steps are returned as-is.

use std::fmt;
use std::sync::Arc;

use crate::adapters::ArrayAdapter;
use crate::error::CallError;
use crate::value::{Args, Value};

/// An implementation written against canonical values.
pub type CanonicalFn = Arc<dyn Fn(&Args) -> anyhow::Result<Value> + Send + Sync>;

/// A canonical implementation bound to one adapter.
///
/// Holds no mutable state; clones share the implementation and adapter.
#[derive(Clone)]
pub struct DispatchFn {
    implementation: CanonicalFn,
    adapter: Arc<dyn ArrayAdapter>,
}

impl DispatchFn {
    /// Converts `args`, invokes the implementation and converts the result.
    pub fn call(&self, args: Args) -> Result<Value, CallError> {
        let converted = args.try_map(|value| self.adapter.to_canonical(value))?;
        let result = (self.implementation)(&converted).map_err(CallError::Function)?;
        Ok(self.adapter.from_canonical(result)?)
    }

    /// Shorthand for a call with positional arguments only.
    pub fn call_with<I, V>(&self, values: I) -> Result<Value, CallError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.call(values.into_iter().map(Into::into).collect())
    }

    pub fn adapter_name(&self) -> &'static str {
        self.adapter.name()
    }

    /// Returns true when both handles share the same implementation.
    pub fn same_implementation(&self, other: &DispatchFn) -> bool {
        Arc::ptr_eq(&self.implementation, &other.implementation)
    }
}

impl fmt::Debug for DispatchFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchFn")
            .field("adapter", &self.adapter.name())
            .finish_non_exhaustive()
    }
}

/// Wraps `implementation` so it accepts and returns the adapter's native values.
pub fn wrap(implementation: CanonicalFn, adapter: Arc<dyn ArrayAdapter>) -> DispatchFn {
    DispatchFn {
        implementation,
        adapter,
    }
}
