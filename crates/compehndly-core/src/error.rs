//! Error types for registry construction, lookup and invocation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or querying a function registry.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A version string could not be parsed.
    #[error("invalid version '{text}': {reason}")]
    InvalidVersion { text: String, reason: String },

    /// The same `(name, version)` pair was registered twice.
    #[error("function {name} version {version} already registered")]
    DuplicateRegistration { name: String, version: String },

    /// No function is registered under this name.
    #[error("no function registered with name '{name}'")]
    UnknownFunction { name: String },

    /// The function exists but not in the requested version.
    #[error("function '{name}' has no version {version} (available: {available})")]
    UnknownVersion {
        name: String,
        version: String,
        available: String,
    },

    /// The requested adapter was never registered.
    #[error("unknown adapter '{name}'. Available: {available}")]
    UnknownAdapter { name: String, available: String },

    /// A unit declared a registration for a registry other than `default`.
    #[error("unsupported registry name '{target}' in module '{module}'")]
    UnsupportedRegistryTarget { target: String, module: String },

    /// A function module could not be imported.
    #[error("failed to import module '{module}': {reason}")]
    ModuleImportFailure { module: String, reason: String },

    /// The module was imported but does not declare the requested function.
    #[error("module '{module}' has no function '{symbol}'")]
    MissingSymbol { module: String, symbol: String },

    /// The manifest file is absent or cannot be decoded.
    #[error("manifest {path} is missing or invalid: {reason}")]
    ManifestMissingOrInvalid { path: PathBuf, reason: String },

    /// The manifest could not be persisted.
    #[error("failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An adapter provider failed to load.
    #[error("failed to load adapter provider '{provider}': {reason}")]
    PluginLoadFailure { provider: String, reason: String },

    /// A configuration value could not be interpreted.
    #[error("invalid configuration {key}={value}: {reason}")]
    InvalidConfig {
        key: String,
        value: String,
        reason: String,
    },
}

impl DispatchError {
    pub(crate) fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ManifestMissingOrInvalid {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for the build-time failures (import, symbol, target and manifest errors).
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            Self::ModuleImportFailure { .. }
                | Self::MissingSymbol { .. }
                | Self::UnsupportedRegistryTarget { .. }
                | Self::ManifestMissingOrInvalid { .. }
                | Self::ManifestWrite { .. }
        )
    }
}

/// Errors raised by an adapter while converting a value.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The adapter does not know how to convert this native type.
    #[error("adapter '{adapter}' cannot convert values of type {type_name}")]
    Unsupported {
        adapter: &'static str,
        type_name: &'static str,
    },

    /// The canonical array has a dtype the adapter cannot express natively.
    #[error("adapter '{adapter}' cannot produce a native value from dtype {dtype}")]
    UnsupportedDtype { adapter: &'static str, dtype: String },

    /// The underlying columnar library rejected the conversion.
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Errors raised by the null-aware compute kernels.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Two array operands have different lengths.
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// An operand is not numeric.
    #[error("expected a numeric operand, got {found}")]
    NotNumeric { found: String },

    /// A required argument is absent.
    #[error("missing argument '{name}'")]
    MissingArgument { name: String },

    /// The underlying columnar library rejected the operation.
    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Errors surfaced when invoking a wrapped function.
///
/// Every variant is transparent so the original failure reaches the caller untouched.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Function(anyhow::Error),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl CallError {
    /// Returns the implementation error, if the call failed inside the function body.
    pub fn as_function_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Function(error) => Some(error),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
