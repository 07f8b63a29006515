//! Producer version stamps (`group:artifact:version`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity and version of the tool that produced an artifact.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionStamp {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl VersionStamp {
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// The stamp of this crate build.
    pub fn current() -> Self {
        Self::new("org.yangkit", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Leading numeric component of the version (`"2.1.0-rc1"` → 2).
    pub fn major(&self) -> Option<u64> {
        let head = self.version.split(['.', '-', '+']).next()?;
        head.parse().ok()
    }

    /// Artifacts are readable when they come from the same tool with the
    /// same major version.
    pub fn is_compatible_with(&self, producer: &VersionStamp) -> bool {
        self.group == producer.group
            && self.artifact == producer.artifact
            && self.major().is_some()
            && self.major() == producer.major()
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl FromStr for VersionStamp {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut parts = text.trim().split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(a), Some(v), None) if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Ok(Self::new(g, a, v))
            }
            _ => Err(Error::corrupt(format!("'{text}' is not a version stamp"))),
        }
    }
}

impl TryFrom<String> for VersionStamp {
    type Error = Error;

    fn try_from(text: String) -> Result<Self> {
        text.parse()
    }
}

impl From<VersionStamp> for String {
    fn from(stamp: VersionStamp) -> String {
        stamp.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_and_display() {
        let stamp: VersionStamp = "org.onos:yang-plugin:2.1.0".parse().unwrap();
        assert_eq!(stamp.group, "org.onos");
        assert_eq!(stamp.major(), Some(2));
        assert_eq!(stamp.to_string(), "org.onos:yang-plugin:2.1.0");
    }

    #[rstest]
    #[case("")]
    #[case("a:b")]
    #[case("a::c")]
    #[case("a:b:c:d")]
    fn test_parse_rejects(#[case] text: &str) {
        assert!(matches!(
            text.parse::<VersionStamp>(),
            Err(Error::CorruptArtifact { .. })
        ));
    }

    #[rstest]
    #[case("g:a:1.0.0", "g:a:1.4.2", true)]
    #[case("g:a:1.0.0", "g:a:2.0.0", false)]
    #[case("g:a:1.0.0", "g:other:1.0.0", false)]
    #[case("g:a:snapshot", "g:a:snapshot", false)]
    fn test_compatibility(#[case] current: &str, #[case] producer: &str, #[case] expected: bool) {
        let current: VersionStamp = current.parse().unwrap();
        let producer: VersionStamp = producer.parse().unwrap();
        assert_eq!(current.is_compatible_with(&producer), expected);
    }
}
