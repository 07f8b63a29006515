//! Build configuration threaded through resolution, emission and linking.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::link::VersionStamp;

/// What a multi-unit build does after one unit fails.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failed unit; every unit not yet built is skipped.
    #[default]
    AbortAll,
    /// Keep building units that do not depend on a failed unit.
    ContinueIndependent,
}

/// Settings for one build.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Package every generated package is nested under.
    pub base_package: String,
    /// Root of the generated source tree and resources.
    pub output_dir: PathBuf,
    /// Stamp written into produced artifacts; also decides which
    /// dependency artifacts are accepted.
    pub producer: VersionStamp,
    pub failure_policy: FailurePolicy,
    /// Generated lines longer than this are reported as warnings.
    pub max_line_length: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_package: "org.yangkit.generated".to_string(),
            output_dir: PathBuf::from("target/generated-sources"),
            producer: VersionStamp::current(),
            failure_policy: FailurePolicy::default(),
            max_line_length: 120,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; absent fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
            reason: e.to_string(),
        })
    }

    pub fn with_base_package(mut self, package: impl Into<String>) -> Self {
        self.base_package = package.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_producer(mut self, producer: VersionStamp) -> Self {
        self.producer = producer;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let config = BuildConfig::from_json(
            r#"{"base_package": "com.example", "failure_policy": "continue-independent"}"#,
        )
        .unwrap();
        assert_eq!(config.base_package, "com.example");
        assert_eq!(config.failure_policy, FailurePolicy::ContinueIndependent);
        assert_eq!(config.max_line_length, 120);
        assert_eq!(config.producer, VersionStamp::current());
    }

    #[test]
    fn test_from_json_producer_stamp() {
        let config = BuildConfig::from_json(r#"{"producer": "org.yangkit:yangkit-base:3.1.0"}"#)
            .unwrap();
        assert_eq!(config.producer.major(), Some(3));
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let err = BuildConfig::from_json(r#"{"failure_policy": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_builders() {
        let config = BuildConfig::new()
            .with_base_package("a.b")
            .with_output_dir("/tmp/out")
            .with_max_line_length(80);
        assert_eq!(config.base_package, "a.b");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.max_line_length, 80);
    }
}
