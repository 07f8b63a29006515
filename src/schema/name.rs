//! Prefixed node identifiers (`prefix:name`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{Error, Result};

/// A node identifier as written in schema text, optionally prefixed with
/// the prefix of the module that declares the target.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct QualifiedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<SmolStr>,
    pub name: SmolStr,
}

impl QualifiedName {
    pub fn new(prefix: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            name: name.into(),
        }
    }

    /// An unprefixed identifier, resolved in the referencing module.
    pub fn local(name: impl Into<SmolStr>) -> Self {
        Self {
            prefix: None,
            name: name.into(),
        }
    }

    /// Parse `name` or `prefix:name`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (prefix, name) = match text.split_once(':') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, text),
        };
        if name.is_empty() || prefix.is_some_and(str::is_empty) {
            return Err(Error::malformed(format!("'{text}' is not a node identifier")));
        }
        if name.contains(['/', '[', ']', '=', ':']) {
            return Err(Error::malformed(format!("'{text}' is not a node identifier")));
        }
        Ok(Self {
            prefix: prefix.map(SmolStr::new),
            name: SmolStr::new(name),
        })
    }
}

impl FromStr for QualifiedName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_prefixed() {
        let q = QualifiedName::parse("col:base-color").unwrap();
        assert_eq!(q.prefix.as_deref(), Some("col"));
        assert_eq!(q.name, "base-color");
        assert_eq!(q.to_string(), "col:base-color");
    }

    #[test]
    fn test_parse_local() {
        let q: QualifiedName = "name".parse().unwrap();
        assert_eq!(q, QualifiedName::local("name"));
    }

    #[rstest]
    #[case("")]
    #[case(":name")]
    #[case("pfx:")]
    #[case("a/b")]
    #[case("a:b:c")]
    fn test_parse_rejects(#[case] text: &str) {
        let err = QualifiedName::parse(text).unwrap_err();
        assert!(matches!(err, Error::MalformedPathExpression { .. }));
    }
}
