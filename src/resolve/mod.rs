//! Reference resolution: linking identities, types, groupings and leafref
//! paths to the nodes they name.
//!
//! # Architecture
//!
//! 1. **Scopes** - [`ScopeIndex`] maps each module name to its declared names,
//!    unit modules first, then modules grafted from dependency artifacts
//! 2. **Reference pass** - every reference inside a unit module is looked up
//!    through the referencing module's prefix table; leafref paths are walked
//!    step by step down the schema tree
//! 3. **Leafref chains** - a leafref whose target is itself a leafref must
//!    end at a concrete type; loops are rejected
//! 4. **Ordering** - unit identities and typedefs are sorted base-first, so the
//!    emitter can rely on a base's generation metadata being fixed before its
//!    derivations
//!
//! External nodes are trusted as already resolved: their references are not
//! revisited, but an external base identity must carry generation metadata.

mod order;
mod scope;

pub use order::topological_order;
pub use scope::{ModuleScope, ScopeIndex};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::schema::{
    KindTag, LeafType, NodeId, NodeKind, PathExpression, PathOperand, PathSegment, QualifiedName,
    RelativePath, SchemaForest,
};

// ============================================================================
// RESOLUTION RESULT
// ============================================================================

/// A path operand or segment identifier bound to the node it names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperandBinding {
    pub identifier: QualifiedName,
    pub node: NodeId,
}

/// A leafref path with every identifier bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The leaf or leaf-list the path designates.
    pub target: NodeId,
    /// Segment and predicate identifiers, in textual order.
    pub bindings: Vec<OperandBinding>,
}

/// Everything the resolver linked for one compilation unit.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    identity_order: Vec<NodeId>,
    typedef_order: Vec<NodeId>,
    bases: FxHashMap<NodeId, NodeId>,
    typedefs: FxHashMap<NodeId, NodeId>,
    identityrefs: FxHashMap<NodeId, NodeId>,
    groupings: FxHashMap<NodeId, NodeId>,
    leafrefs: IndexMap<NodeId, ResolvedPath>,
}

impl Resolution {
    /// Unit identities, every one after its base.
    pub fn identity_order(&self) -> &[NodeId] {
        &self.identity_order
    }

    /// Unit typedefs, every one after the typedef it derives from.
    pub fn typedef_order(&self) -> &[NodeId] {
        &self.typedef_order
    }

    /// The base identity of a unit identity.
    pub fn base_of(&self, identity: NodeId) -> Option<NodeId> {
        self.bases.get(&identity).copied()
    }

    /// The typedef named by a leaf, leaf-list or typedef's type.
    pub fn typedef_of(&self, node: NodeId) -> Option<NodeId> {
        self.typedefs.get(&node).copied()
    }

    /// The base identity of an identityref-typed node.
    pub fn identityref_of(&self, node: NodeId) -> Option<NodeId> {
        self.identityrefs.get(&node).copied()
    }

    /// The grouping a `uses` node expands.
    pub fn grouping_of(&self, uses: NodeId) -> Option<NodeId> {
        self.groupings.get(&uses).copied()
    }

    pub fn leafref(&self, node: NodeId) -> Option<&ResolvedPath> {
        self.leafrefs.get(&node)
    }

    /// The typedef a typedef's value type comes from: its derived type, or
    /// the typedef of the node at the end of its leafref chain.
    fn typedef_dependency(&self, typedef: NodeId) -> Option<NodeId> {
        let mut current = typedef;
        // chains are acyclic once resolved, so they visit each leafref once
        for _ in 0..=self.leafrefs.len() {
            if let Some(base) = self.typedef_of(current) {
                return Some(base);
            }
            current = self.leafref(current)?.target;
        }
        None
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves the unit modules of a forest against unit and external scopes.
#[derive(Debug)]
pub struct Resolver<'a> {
    forest: &'a SchemaForest,
    scopes: ScopeIndex,
}

impl<'a> Resolver<'a> {
    /// Index the forest's modules. Fails on malformed roots or duplicate
    /// unit modules.
    pub fn new(forest: &'a SchemaForest) -> Result<Self> {
        Ok(Self {
            forest,
            scopes: ScopeIndex::build(forest)?,
        })
    }

    pub fn scopes(&self) -> &ScopeIndex {
        &self.scopes
    }

    /// Resolve every reference in the unit modules.
    ///
    /// Stops at the first failure, reporting the referencing node's
    /// position.
    pub fn resolve(&self) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        let mut identities = Vec::new();
        let mut typedefs = Vec::new();

        for root in self.forest.unit_roots() {
            for node in self.forest.descendants(root) {
                self.resolve_node(node, &mut resolution)
                    .map_err(|e| e.with_location(self.forest.location(node)))?;
                match self.forest.node(node).tag() {
                    KindTag::Identity => identities.push(node),
                    KindTag::Typedef => typedefs.push(node),
                    _ => {}
                }
            }
        }

        self.check_leafref_chains(&resolution)?;

        let order = topological_order(&identities, |n| resolution.base_of(n))
            .map_err(|cycle| self.cycle_error(&cycle))?;
        resolution.identity_order = order;

        let order = topological_order(&typedefs, |n| resolution.typedef_dependency(n))
            .map_err(|cycle| self.cycle_error(&cycle))?;
        resolution.typedef_order = order;

        tracing::info!(
            "resolved {} identities, {} typedef refs, {} leafrefs, {} uses",
            resolution.identity_order.len(),
            resolution.typedefs.len(),
            resolution.leafrefs.len(),
            resolution.groupings.len()
        );
        Ok(resolution)
    }

    fn cycle_error(&self, cycle: &[NodeId]) -> Error {
        Error::CyclicReference {
            cycle: cycle
                .iter()
                .map(|&n| self.forest.qualified_id(n).to_string())
                .collect(),
            location: cycle.first().map(|&n| self.forest.location(n)),
        }
    }

    /// Every leafref chain, unit or external, must end at a node that is not
    /// a leafref.
    fn check_leafref_chains(&self, resolution: &Resolution) -> Result<()> {
        let mut settled: FxHashSet<NodeId> = FxHashSet::default();
        for &start in resolution.leafrefs.keys() {
            let mut chain: IndexSet<NodeId> = IndexSet::new();
            let mut current = start;
            while !settled.contains(&current) {
                if !chain.insert(current) {
                    let from = chain.get_index_of(&current).unwrap_or(0);
                    let mut cycle: Vec<NodeId> = chain.iter().copied().skip(from).collect();
                    cycle.push(current);
                    return Err(self.cycle_error(&cycle));
                }
                match resolution.leafref(current) {
                    Some(resolved) => current = resolved.target,
                    None => break,
                }
            }
            settled.extend(chain);
        }
        Ok(())
    }

    fn resolve_node(&self, node: NodeId, out: &mut Resolution) -> Result<()> {
        match self.forest.node(node).kind() {
            NodeKind::Identity { base: Some(base) } => {
                let target = self.resolve_identity(node, base)?;
                tracing::trace!(
                    "[RESOLVE] identity '{}' has base '{}'",
                    self.forest.qualified_id(node),
                    self.forest.qualified_id(target)
                );
                out.bases.insert(node, target);
            }
            NodeKind::Uses { grouping } => {
                let target = self.expect_kind(node, grouping, KindTag::Grouping)?;
                out.groupings.insert(node, target);
            }
            kind => {
                if let Some(ty) = kind.leaf_type() {
                    self.resolve_type(node, ty, out)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_type(&self, node: NodeId, ty: &LeafType, out: &mut Resolution) -> Result<()> {
        match ty {
            LeafType::Builtin(_) => {}
            LeafType::Derived(name) => {
                let target = self.expect_kind(node, name, KindTag::Typedef)?;
                if target == node {
                    return Err(Error::CyclicReference {
                        cycle: vec![name.to_string(), name.to_string()],
                        location: None,
                    });
                }
                out.typedefs.insert(node, target);
            }
            LeafType::Identityref(base) => {
                let target = self.resolve_identity(node, base)?;
                out.identityrefs.insert(node, target);
            }
            LeafType::Leafref(path) => {
                let resolved = self.resolve_path(node, path)?;
                tracing::trace!(
                    "[RESOLVE] leafref '{}' targets '{}'",
                    self.forest.qualified_id(node),
                    self.forest.qualified_id(resolved.target)
                );
                let target = resolved.target;
                out.leafrefs.insert(node, resolved);
                self.resolve_external_target(target, out)?;
            }
        }
        Ok(())
    }

    /// Unit leafref targets are resolved by the main pass; an external
    /// target's type is resolved here so the emitter can map it. Follows
    /// external leafref chains until a resolved or non-leafref node.
    fn resolve_external_target(&self, target: NodeId, out: &mut Resolution) -> Result<()> {
        let mut next = target;
        loop {
            let node = self.forest.node(next);
            if !node.origin().is_external() || out.leafrefs.contains_key(&next) {
                return Ok(());
            }
            let Some(ty) = node.kind().leaf_type() else {
                return Ok(());
            };
            match ty {
                LeafType::Leafref(path) => {
                    let resolved = self.resolve_path(next, path)?;
                    let following = resolved.target;
                    out.leafrefs.insert(next, resolved);
                    next = following;
                }
                other => return self.resolve_type(next, other, out),
            }
        }
    }

    /// Resolve a base identity reference. External bases must already carry
    /// generation metadata.
    fn resolve_identity(&self, node: NodeId, base: &QualifiedName) -> Result<NodeId> {
        let target = self.expect_kind(node, base, KindTag::Identity)?;
        let external = self.forest.node(target).origin().is_external();
        if external && self.forest.metadata(target).is_none() {
            return Err(Error::MissingDependencyInfo {
                node: self.forest.qualified_id(node).to_string(),
                dependency: base.to_string(),
                location: None,
            });
        }
        Ok(target)
    }

    // ------------------------------------------------------------------
    // Leafref paths
    // ------------------------------------------------------------------

    /// Walk `path` from `context`, the node holding it. Absolute paths start
    /// at the root of the module their first prefix names; relative paths
    /// climb `ascend` parents from `context` first.
    fn resolve_path(&self, context: NodeId, path: &PathExpression) -> Result<ResolvedPath> {
        let mut bindings = Vec::new();
        let target = match path {
            PathExpression::Absolute(segments) => {
                let Some(first) = segments.first() else {
                    return Err(Error::malformed(format!("path '{path}' names no node")));
                };
                let root = self.scope_for(context, &first.identifier)?.module();
                self.walk(context, root, segments, &mut bindings)?
            }
            PathExpression::Relative(rel) => self.walk_relative(context, rel, &mut bindings)?,
        };

        let tag = self.forest.node(target).tag();
        if !matches!(tag, KindTag::Leaf | KindTag::LeafList) {
            return Err(Error::InvalidReferenceKind {
                name: self.forest.qualified_id(target).to_string(),
                expected: "leaf or leaf-list",
                found: tag.as_str(),
                location: None,
            });
        }
        Ok(ResolvedPath { target, bindings })
    }

    fn walk_relative(
        &self,
        context: NodeId,
        rel: &RelativePath,
        out: &mut Vec<OperandBinding>,
    ) -> Result<NodeId> {
        if rel.descendants.is_empty() {
            return Err(Error::malformed(format!("relative path '{rel}' names no node")));
        }
        let mut current = context;
        for _ in 0..rel.ascend {
            current = self
                .forest
                .node(current)
                .parent()
                .ok_or_else(|| Error::UnresolvedReference {
                    name: rel.to_string(),
                    location: None,
                })?;
        }
        self.walk(context, current, &rel.descendants, out)
    }

    /// Step from `start` through `segments`, one child per segment. A
    /// segment's predicate keys are children of the node it selects;
    /// relative operands are walked from `context`.
    fn walk(
        &self,
        context: NodeId,
        start: NodeId,
        segments: &[PathSegment],
        out: &mut Vec<OperandBinding>,
    ) -> Result<NodeId> {
        let mut current = start;
        for segment in segments {
            current = self.data_child(context, current, &segment.identifier)?;
            out.push(OperandBinding {
                identifier: segment.identifier.clone(),
                node: current,
            });
            for predicate in &segment.predicates {
                self.bind_operand(context, current, predicate.left(), out)?;
                self.bind_operand(context, current, predicate.right(), out)?;
            }
        }
        Ok(current)
    }

    fn bind_operand(
        &self,
        context: NodeId,
        selected: NodeId,
        operand: &PathOperand,
        out: &mut Vec<OperandBinding>,
    ) -> Result<()> {
        match operand {
            PathOperand::NodeIdentifier(id) => {
                let key = self.data_child(context, selected, id)?;
                out.push(OperandBinding {
                    identifier: id.clone(),
                    node: key,
                });
                Ok(())
            }
            PathOperand::RelativePath(rel) => self.walk_relative(context, rel, out).map(|_| ()),
        }
    }

    /// The data node child of `parent` named by `id`. The prefix must name
    /// a module visible from `context`.
    fn data_child(&self, context: NodeId, parent: NodeId, id: &QualifiedName) -> Result<NodeId> {
        self.scope_for(context, id)?;
        let mut other_kind = None;
        for &child in self.forest.children(parent) {
            let node = self.forest.node(child);
            if node.name() != id.name.as_str() {
                continue;
            }
            if node.tag().is_data_node() {
                return Ok(child);
            }
            other_kind.get_or_insert(node.tag());
        }
        match other_kind {
            Some(found) => Err(Error::InvalidReferenceKind {
                name: id.to_string(),
                expected: "data node",
                found: found.as_str(),
                location: None,
            }),
            None => Err(Error::UnresolvedReference {
                name: id.to_string(),
                location: None,
            }),
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// The scope a prefixed name refers to, seen from `from`'s module.
    fn scope_for(&self, from: NodeId, name: &QualifiedName) -> Result<&ModuleScope> {
        let root = self.forest.module_of(from);
        let own = self
            .scopes
            .scope_of_root(root)
            .ok_or_else(|| Error::UnresolvedReference {
                name: name.to_string(),
                location: None,
            })?;

        let module = match name.prefix.as_deref() {
            None => return Ok(own),
            Some(prefix) if prefix == own.prefix() => return Ok(own),
            Some(prefix) => own
                .imported_module(prefix)
                .ok_or_else(|| Error::UnresolvedReference {
                    name: name.to_string(),
                    location: None,
                })?,
        };
        self.scopes
            .module(module)
            .ok_or_else(|| Error::UnresolvedReference {
                name: name.to_string(),
                location: None,
            })
    }

    fn expect_kind(&self, from: NodeId, name: &QualifiedName, kind: KindTag) -> Result<NodeId> {
        let scope = self.scope_for(from, name)?;
        if let Some(found) = scope.lookup_kind(kind, &name.name) {
            return Ok(found);
        }
        match scope.lookup_any(&name.name) {
            Some(other) => Err(Error::InvalidReferenceKind {
                name: name.to_string(),
                expected: kind.as_str(),
                found: self.forest.node(other).tag().as_str(),
                location: None,
            }),
            None => Err(Error::UnresolvedReference {
                name: name.to_string(),
                location: None,
            }),
        }
    }
}
