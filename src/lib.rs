//! # yangkit-base
//!
//! Resolution, cross-artifact linking and code emission for YANG-like
//! schema trees.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! driver   → Compilation units and multi-unit workspaces
//!   ↓
//! codegen  → Two-phase emitter, import registry, output sinks
//!   ↓
//! link     → Versioned artifacts carrying resolved trees between builds
//!   ↓
//! resolve  → Module scopes, reference resolution, base-first ordering
//!   ↓
//! schema   → Node forest, path expressions, generation metadata
//!   ↓
//! base     → Primitives (FileId, SourcePos, SourceMap)
//! ```
//!
//! `error` and `config` are shared by every layer.
//!
//! Parsing schema text is out of scope: callers build a [`SchemaForest`]
//! from their parser's output.

/// Foundation types: FileId, positions, source map
pub mod base;

/// Error kinds and diagnostic codes
pub mod error;

/// Build configuration
pub mod config;

/// Schema data model
pub mod schema;

/// Reference resolution
pub mod resolve;

/// Artifact encoding and compatibility checks
pub mod link;

/// Code emission
pub mod codegen;

/// Pipeline orchestration
pub mod driver;

pub use config::{BuildConfig, FailurePolicy};
pub use driver::{BuildOutput, Compilation, UnitOutcome, Workspace, WorkspaceReport};
pub use error::{Error, Result};
pub use link::{ArtifactLinker, VersionStamp};
pub use resolve::{Resolution, Resolver};
pub use schema::{NodeId, NodeKind, SchemaForest};
