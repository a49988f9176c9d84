//! Semantic version triple used for IR schema and protocol versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version `{0}`: expected MAJOR.MINOR.PATCH")]
pub struct VersionParseError(pub String);

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Wire compatibility: major and minor must match, patch may differ.
    ///
    /// A minor mismatch is rejected rather than degraded.
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32, VersionParseError> {
            parts.next().ok_or_else(err)?.parse().map_err(|_| err())
        };
        let version = Self::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(version)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v: Version = "1.12.3".parse().unwrap();
        assert_eq!(v, Version::new(1, 12, 3));
        assert_eq!(v.to_string(), "1.12.3");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("1.2".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
        assert!("a.b.c".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(1, 2, 0) > Version::new(1, 1, 9));
        assert!(Version::new(2, 0, 0) > Version::new(1, 99, 99));
    }

    #[test]
    fn test_compatibility_only_tolerates_patch() {
        let ours = Version::new(1, 0, 0);
        assert!(ours.is_compatible_with(&Version::new(1, 0, 7)));
        assert!(!ours.is_compatible_with(&Version::new(1, 1, 0)));
        assert!(!ours.is_compatible_with(&Version::new(2, 0, 0)));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Version::new(1, 2, 0)).unwrap();
        assert_eq!(json, r#""1.2.0""#);
        let parsed: Version = serde_json::from_str(r#""3.0.1""#).unwrap();
        assert_eq!(parsed, Version::new(3, 0, 1));
        assert!(serde_json::from_str::<Version>(r#""3.0""#).is_err());
    }
}
