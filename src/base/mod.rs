//! Foundation types for the yangkit engine.
//!
//! - [`FileId`] - Schema file identifiers
//! - [`SourcePos`], [`Location`] - Declaration positions for diagnostics
//! - [`SourceMap`] - Path ↔ FileId registry
//!
//! This module has NO dependencies on other yangkit modules.

mod file_id;
mod source;
mod span;

pub use file_id::FileId;
pub use source::SourceMap;
pub use span::{Location, SourcePos};
