//! Schema data model: the resolved-or-not AST the engine operates on.
//!
//! ## Key Data Structures
//!
//! - [`SchemaForest`] - Arena of module trees (unit and external)
//! - [`SchemaNode`] / [`NodeKind`] - One construct and its kind-specific data
//! - [`PathExpression`] / [`PathPredicate`] - Leafref paths
//! - [`GenerationMetadata`] - Output location attached during emission

mod forest;
mod ids;
mod metadata;
mod name;
mod node;
mod path;

pub use forest::SchemaForest;
pub use ids::{NodeId, Origin};
pub use metadata::{GeneratedFileKind, GenerationMetadata, MetadataTable};
pub use name::QualifiedName;
pub use node::{BuiltinType, KindTag, LeafType, ModuleImport, NodeKind, SchemaNode};
pub use path::{
    PathExpression, PathOperand, PathOperator, PathPredicate, PathSegment, PredicateBuilder,
    RelativePath,
};
