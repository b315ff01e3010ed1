//! Registry configuration.
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `COMPEHNDLY_REGISTRY` | `eager` or `lazy` |
//! | `COMPEHNDLY_ADAPTER` | adapter name; unset selects `base` |
//! | `COMPEHNDLY_MANIFEST` | manifest path for the lazy registry |
//! | `COMPEHNDLY_NO_MANIFEST_REBUILD` | boolean; suppresses rebuild-on-missing |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{DispatchError, Result};

pub const REGISTRY_ENV_VAR: &str = "COMPEHNDLY_REGISTRY";
pub const ADAPTER_ENV_VAR: &str = "COMPEHNDLY_ADAPTER";
pub const MANIFEST_ENV_VAR: &str = "COMPEHNDLY_MANIFEST";
pub const NO_REBUILD_ENV_VAR: &str = "COMPEHNDLY_NO_MANIFEST_REBUILD";

/// Manifest file name used when none is configured.
pub const DEFAULT_MANIFEST_PATH: &str = "compehndly-manifest.json";

/// How the process-wide registry is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryStrategy {
    /// Import every unit up front.
    #[default]
    Eager,
    /// Resolve functions from the manifest on first use.
    Lazy,
}

impl FromStr for RegistryStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "lazy" | "manifest" => Ok(Self::Lazy),
            _ => Err("expected 'eager' or 'lazy'".to_string()),
        }
    }
}

impl fmt::Display for RegistryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eager => write!(f, "eager"),
            Self::Lazy => write!(f, "lazy"),
        }
    }
}

/// Settings for building a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub strategy: RegistryStrategy,
    /// Adapter name; `None` selects the base adapter.
    pub adapter: Option<String>,
    pub manifest_path: PathBuf,
    /// Units imported by the eager build; empty means every discovered unit.
    pub modules: Vec<String>,
    /// Treat a missing manifest as fatal instead of rebuilding it.
    pub no_manifest_rebuild: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strategy: RegistryStrategy::default(),
            adapter: None,
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            modules: Vec::new(),
            no_manifest_rebuild: false,
        }
    }
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: RegistryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    #[must_use]
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    #[must_use]
    pub fn with_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_no_manifest_rebuild(mut self, enabled: bool) -> Self {
        self.no_manifest_rebuild = enabled;
        self
    }

    pub fn adapter_name(&self) -> Option<&str> {
        self.adapter.as_deref()
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`; unset or empty values keep the default.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidConfig`] for an unrecognized strategy
    /// or boolean.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(REGISTRY_ENV_VAR) {
            config.strategy = value
                .parse()
                .map_err(|reason| invalid(REGISTRY_ENV_VAR, &value, reason))?;
        }
        if let Some(value) = get(ADAPTER_ENV_VAR) {
            config.adapter = Some(value.trim().to_string());
        }
        if let Some(value) = get(MANIFEST_ENV_VAR) {
            config.manifest_path = PathBuf::from(value);
        }
        if let Some(value) = get(NO_REBUILD_ENV_VAR) {
            config.no_manifest_rebuild = parse_flag(&value)
                .ok_or_else(|| invalid(NO_REBUILD_ENV_VAR, &value, "expected a boolean".to_string()))?;
        }
        Ok(config)
    }
}

fn invalid(key: &str, value: &str, reason: String) -> DispatchError {
    DispatchError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = RegistryConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.strategy, RegistryStrategy::Eager);
        assert_eq!(config.manifest_path, PathBuf::from("compehndly-manifest.json"));
    }

    #[test]
    fn reads_every_variable() {
        let config = RegistryConfig::from_lookup(lookup(&[
            ("COMPEHNDLY_REGISTRY", "Lazy"),
            ("COMPEHNDLY_ADAPTER", "polars"),
            ("COMPEHNDLY_MANIFEST", "/tmp/m.json"),
            ("COMPEHNDLY_NO_MANIFEST_REBUILD", "1"),
        ]))
        .unwrap();
        assert_eq!(config.strategy, RegistryStrategy::Lazy);
        assert_eq!(config.adapter_name(), Some("polars"));
        assert_eq!(config.manifest_path, PathBuf::from("/tmp/m.json"));
        assert!(config.no_manifest_rebuild);
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config = RegistryConfig::from_lookup(lookup(&[("COMPEHNDLY_ADAPTER", "  ")])).unwrap();
        assert_eq!(config.adapter, None);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = RegistryConfig::from_lookup(lookup(&[("COMPEHNDLY_REGISTRY", "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig { ref key, .. } if key == "COMPEHNDLY_REGISTRY"));

        let err = RegistryConfig::from_lookup(lookup(&[("COMPEHNDLY_NO_MANIFEST_REBUILD", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig { .. }));
    }
}
