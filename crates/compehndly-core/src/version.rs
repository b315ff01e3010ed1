//! Semantic version identifiers and "latest" selection.
//!
//! A [`Version`] is a `(major, minor, patch)` triple ordered component-wise,
//! most significant first. Parsing accepts one to three dotted numeric
//! components; missing trailing components are zero, so `"0.1"`, `"0.1.0"`
//! and `"0.01.00"` all parse to the same value and display as `0.1.0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DispatchError, Result};

const MAX_COMPONENTS: usize = 3;

/// A parsed semantic version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a dotted version string.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidVersion`] when a component is empty or
    /// non-numeric, or when there are more than three components.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: String| DispatchError::InvalidVersion {
            text: text.to_string(),
            reason,
        };

        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() > MAX_COMPONENTS {
            return Err(invalid(format!(
                "expected at most {MAX_COMPONENTS} components, found {}",
                parts.len()
            )));
        }

        let mut components = [0u64; MAX_COMPONENTS];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("component '{part}' is not a number")));
            }
            *slot = part
                .parse::<u64>()
                .map_err(|e| invalid(format!("component '{part}': {e}")))?;
        }

        Ok(Self::new(components[0], components[1], components[2]))
    }

    /// Returns the greatest version, or `None` for an empty input.
    pub fn latest<'a, I>(versions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().max().copied()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_triple() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn short_forms_normalize() {
        assert_eq!(Version::parse("0.1").unwrap(), Version::parse("0.1.0").unwrap());
        assert_eq!(Version::parse("2").unwrap(), Version::new(2, 0, 0));
        assert_eq!(Version::parse("0.01.00").unwrap().to_string(), "0.1.0");
    }

    #[test]
    fn rejects_malformed() {
        for text in ["", "1.", ".1", "1.2.3.4", "a.b.c", "1.-2.0", "1.2.x", " 1.2.3"] {
            assert!(
                matches!(
                    Version::parse(text),
                    Err(DispatchError::InvalidVersion { .. })
                ),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn orders_numerically_not_lexically() {
        let a = Version::parse("0.10.0").unwrap();
        let b = Version::parse("0.9.5").unwrap();
        assert!(a > b);
    }

    #[test]
    fn latest_picks_max() {
        let versions = [
            Version::parse("0.0.1").unwrap(),
            Version::parse("0.1.0").unwrap(),
            Version::parse("0.0.9").unwrap(),
        ];
        assert_eq!(Version::latest(&versions), Some(Version::new(0, 1, 0)));
        assert_eq!(Version::latest(&[]), None);
    }

    #[test]
    fn serde_uses_dotted_text() {
        let json = serde_json::to_string(&Version::new(1, 0, 2)).unwrap();
        assert_eq!(json, "\"1.0.2\"");
        let back: Version = serde_json::from_str("\"1.0\"").unwrap();
        assert_eq!(back, Version::new(1, 0, 0));
    }
}
