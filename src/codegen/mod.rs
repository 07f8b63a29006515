//! Code emission: resolved schema nodes to generated source files.
//!
//! ## Key Data Structures
//!
//! - [`CodeEmitter`] - Traverses a resolved forest, dispatching on node kind
//! - [`EmitTable`] / [`EmitHandler`] - Entry/exit functions keyed by kind
//! - [`ImportRegistry`] - Per-file short name bookkeeping
//! - [`SourceSink`] - Where finished files go ([`DirectorySink`], [`MemorySink`])

mod emitter;
mod file;
mod handlers;
mod imports;
pub mod names;
mod sink;
mod types;

pub use emitter::{
    CodeEmitter, EmitContext, EmitFn, EmitHandler, EmitReport, EmitTable, ReferenceRecord, skip,
};
pub(crate) use emitter::discard;
pub use file::SourceFile;
pub use imports::{ImportDecision, ImportRegistry};
pub use sink::{DirectorySink, MemorySink, SourceSink};
pub use types::{TargetType, builtin as builtin_type};

#[cfg(test)]
mod tests;
