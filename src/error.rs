//! Error kinds raised by construction, resolution, linking and emission.
//!
//! Every error that concerns a schema node carries the node's declaration
//! [`Location`] when one is known. Errors are never downgraded to warnings:
//! one fault aborts the node (and the compilation unit) that raised it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::base::Location;

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes, one per error kind.
pub mod codes {
    /// Path predicate or path text violates the operand invariants.
    pub const MALFORMED_PATH_EXPRESSION: &str = "E0001";
    /// Name not found in the unit or any dependency artifact.
    pub const UNRESOLVED_REFERENCE: &str = "E0002";
    /// Name found, but it denotes the wrong kind of construct.
    pub const INVALID_REFERENCE_KIND: &str = "E0003";
    /// Identity base, typedef or leafref chain loops back on itself.
    pub const CYCLIC_REFERENCE: &str = "E0004";
    /// A dependency has no generation metadata yet.
    pub const MISSING_DEPENDENCY_INFO: &str = "E0005";
    /// Artifact produced by an unsupported tool version.
    pub const INCOMPATIBLE_ARTIFACT_VERSION: &str = "E0006";
    /// Artifact bytes are not a valid artifact.
    pub const CORRUPT_ARTIFACT: &str = "E0007";
    /// Two generated files map to the same path.
    pub const OUTPUT_COLLISION: &str = "E0008";
    /// Tree construction or write-once invariant violated.
    pub const INVALID_TREE: &str = "E0009";
    /// Read/write failure.
    pub const IO_FAILURE: &str = "E0010";
    /// Build configuration could not be loaded.
    pub const INVALID_CONFIG: &str = "E0011";
}

/// Errors produced by the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed path expression: {reason}{}", at(.location))]
    MalformedPathExpression {
        reason: String,
        location: Option<Location>,
    },

    #[error("unresolved reference '{name}'{}", at(.location))]
    UnresolvedReference {
        name: String,
        location: Option<Location>,
    },

    #[error("'{name}' is a {found}, expected {expected}{}", at(.location))]
    InvalidReferenceKind {
        name: String,
        expected: &'static str,
        found: &'static str,
        location: Option<Location>,
    },

    #[error("cyclic reference chain: {}{}", .cycle.join(" -> "), at(.location))]
    CyclicReference {
        cycle: Vec<String>,
        location: Option<Location>,
    },

    #[error("'{node}' depends on '{dependency}' which has no generation metadata{}", at(.location))]
    MissingDependencyInfo {
        node: String,
        dependency: String,
        location: Option<Location>,
    },

    #[error("artifact produced by '{found}' is not supported (expected '{supported}')")]
    IncompatibleArtifactVersion { found: String, supported: String },

    #[error("corrupt artifact: {reason}")]
    CorruptArtifact { reason: String },

    #[error("generated file '{}' collides with a file emitted earlier in this build", .path.display())]
    OutputCollision { path: PathBuf },

    #[error("invalid schema tree: {reason}{}", at(.location))]
    InvalidTree {
        reason: String,
        location: Option<Location>,
    },

    #[error("invalid build configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O failure while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

fn at(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" at {loc}"),
        None => String::new(),
    }
}

impl Error {
    /// Wrap an I/O error with what was being attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::CorruptArtifact {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedPathExpression {
            reason: reason.into(),
            location: None,
        }
    }

    /// The diagnostic code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedPathExpression { .. } => codes::MALFORMED_PATH_EXPRESSION,
            Error::UnresolvedReference { .. } => codes::UNRESOLVED_REFERENCE,
            Error::InvalidReferenceKind { .. } => codes::INVALID_REFERENCE_KIND,
            Error::CyclicReference { .. } => codes::CYCLIC_REFERENCE,
            Error::MissingDependencyInfo { .. } => codes::MISSING_DEPENDENCY_INFO,
            Error::IncompatibleArtifactVersion { .. } => codes::INCOMPATIBLE_ARTIFACT_VERSION,
            Error::CorruptArtifact { .. } => codes::CORRUPT_ARTIFACT,
            Error::OutputCollision { .. } => codes::OUTPUT_COLLISION,
            Error::InvalidTree { .. } => codes::INVALID_TREE,
            Error::InvalidConfig { .. } => codes::INVALID_CONFIG,
            Error::Io { .. } => codes::IO_FAILURE,
        }
    }

    /// The declaration position of the offending node, if known.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::MalformedPathExpression { location, .. }
            | Error::UnresolvedReference { location, .. }
            | Error::InvalidReferenceKind { location, .. }
            | Error::CyclicReference { location, .. }
            | Error::MissingDependencyInfo { location, .. }
            | Error::InvalidTree { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// Attach a location if the error does not carry one yet.
    pub(crate) fn with_location(mut self, loc: Location) -> Self {
        match &mut self {
            Error::MalformedPathExpression { location, .. }
            | Error::UnresolvedReference { location, .. }
            | Error::InvalidReferenceKind { location, .. }
            | Error::CyclicReference { location, .. }
            | Error::MissingDependencyInfo { location, .. }
            | Error::InvalidTree { location, .. } => {
                if location.is_none() {
                    *location = Some(loc);
                }
            }
            _ => {}
        }
        self
    }
}
