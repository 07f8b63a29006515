//! The schema forest: an arena of nodes holding one tree per module.

use std::sync::Arc;

use smol_str::SmolStr;

use super::{
    GenerationMetadata, KindTag, MetadataTable, ModuleImport, NodeId, NodeKind, Origin,
    QualifiedName, SchemaNode,
};
use crate::base::{FileId, Location, SourceMap, SourcePos};
use crate::error::{Error, Result};

/// All schema nodes known to one build: the unit's own modules plus any
/// modules grafted in from dependency artifacts.
///
/// Nodes are never removed, and node ids are never reused.
#[derive(Clone, Debug, Default)]
pub struct SchemaForest {
    nodes: Vec<SchemaNode>,
    roots: Vec<NodeId>,
    sources: SourceMap,
    metadata: MetadataTable,
}

impl SchemaForest {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Register a schema file path for use in [`SourcePos`].
    pub fn file_id(&mut self, path: &str) -> FileId {
        self.sources.file_id(path)
    }

    /// Add a module root declared by the unit being compiled.
    pub fn add_module(
        &mut self,
        name: impl Into<SmolStr>,
        kind: NodeKind,
        pos: SourcePos,
    ) -> Result<NodeId> {
        if kind.tag() != KindTag::Module {
            return Err(Error::InvalidTree {
                reason: format!("a {} cannot be a root", kind.tag()),
                location: Some(self.sources.location(pos)),
            });
        }
        let id = self.push(name.into(), kind, pos, Origin::Unit);
        self.roots.push(id);
        Ok(id)
    }

    /// Record an `import` statement on a module root.
    pub fn add_import(&mut self, module: NodeId, import: ModuleImport) -> Result<()> {
        let slot = self.slot(module)?;
        let location = self.location(module);
        match &mut self.nodes[slot].kind {
            NodeKind::Module { imports, .. } => {
                imports.push(import);
                Ok(())
            }
            other => Err(Error::InvalidTree {
                reason: format!("imports belong to modules, not to a {}", other.tag()),
                location: Some(location),
            }),
        }
    }

    /// Append a new child to `parent`, after its existing children.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<SmolStr>,
        kind: NodeKind,
        pos: SourcePos,
    ) -> Result<NodeId> {
        let parent_slot = self.slot(parent)?;
        self.check_containment(parent_slot, kind.tag(), pos)?;
        let origin = self.nodes[parent_slot].origin;
        let id = self.push(name.into(), kind, pos, origin);
        self.nodes[id.slot()].parent = Some(parent);
        self.nodes[parent_slot].children.push(id);
        Ok(id)
    }

    /// Create a node that is not yet part of any tree. Use [`attach`] to
    /// give it a parent.
    ///
    /// [`attach`]: SchemaForest::attach
    pub fn add_detached(
        &mut self,
        name: impl Into<SmolStr>,
        kind: NodeKind,
        pos: SourcePos,
    ) -> NodeId {
        self.push(name.into(), kind, pos, Origin::Unit)
    }

    /// Make a detached node (with its subtree) the last child of `parent`.
    ///
    /// Rejects nodes that already have a parent, roots, and any edit that
    /// would place a node under itself or under one of its descendants.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_slot = self.slot(parent)?;
        let child_slot = self.slot(child)?;
        let child_node = &self.nodes[child_slot];
        let (pos, tag) = (child_node.pos, child_node.tag());
        if child_node.parent.is_some() || self.roots.contains(&child) {
            return Err(self.tree_error(child, "node already belongs to a tree"));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(self.tree_error(child, "node cannot be attached under itself"));
        }
        self.check_containment(parent_slot, tag, pos)?;
        self.nodes[child_slot].parent = Some(parent);
        self.nodes[parent_slot].children.push(child);
        Ok(())
    }

    /// Slot of `id`, or an error when `id` was issued by another forest.
    fn slot(&self, id: NodeId) -> Result<usize> {
        if id.slot() < self.nodes.len() {
            Ok(id.slot())
        } else {
            Err(Error::InvalidTree {
                reason: format!("{id:?} does not belong to this forest"),
                location: None,
            })
        }
    }

    fn push(&mut self, name: SmolStr, kind: NodeKind, pos: SourcePos, origin: Origin) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode {
            name,
            kind,
            pos,
            parent: None,
            children: Vec::new(),
            origin,
        });
        id
    }

    fn check_containment(&self, parent_slot: usize, child: KindTag, pos: SourcePos) -> Result<()> {
        let parent_tag = self.nodes[parent_slot].tag();
        let allowed = parent_tag.has_children()
            && match child {
                KindTag::Module => false,
                KindTag::Identity | KindTag::Augment => parent_tag == KindTag::Module,
                _ => true,
            };
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidTree {
                reason: format!("a {parent_tag} cannot contain a {child}"),
                location: Some(self.sources.location(pos)),
            })
        }
    }

    fn tree_error(&self, node: NodeId, reason: &str) -> Error {
        Error::InvalidTree {
            reason: format!("'{}': {reason}", self.nodes[node.slot()].name),
            location: Some(self.location(node)),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Get a node. Panics if `id` was issued by another forest.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.slot()]
    }

    pub fn get(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.slot())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.slot()].children
    }

    /// All module roots, unit and external, in insertion order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn unit_roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots
            .iter()
            .copied()
            .filter(|&r| !self.node(r).origin.is_external())
    }

    pub fn external_roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots
            .iter()
            .copied()
            .filter(|&r| self.node(r).origin.is_external())
    }

    /// Parent chain, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |&p| self.node(p).parent)
    }

    /// `id` and its whole subtree in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// The module at the top of `id`'s tree.
    pub fn module_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// The prefix of the module declaring `id`.
    pub fn module_prefix(&self, id: NodeId) -> Option<&SmolStr> {
        match &self.node(self.module_of(id)).kind {
            NodeKind::Module { prefix, .. } => Some(prefix),
            _ => None,
        }
    }

    /// `prefix:name` of a node, prefixed by its module's prefix.
    pub fn qualified_id(&self, id: NodeId) -> QualifiedName {
        let name = self.node(id).name.clone();
        match self.module_prefix(id) {
            Some(prefix) => QualifiedName::new(prefix.clone(), name),
            None => QualifiedName::local(name),
        }
    }

    pub fn location(&self, id: NodeId) -> Location {
        self.sources.location(self.node(id).pos)
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Generation metadata
    // ------------------------------------------------------------------

    pub fn metadata(&self, id: NodeId) -> Option<Arc<GenerationMetadata>> {
        self.metadata.get(id)
    }

    /// Attach metadata once. A second attach is an error, not an update.
    pub fn attach_metadata(
        &self,
        id: NodeId,
        metadata: GenerationMetadata,
    ) -> Result<Arc<GenerationMetadata>> {
        self.metadata.attach(id, metadata).map_err(|existing| Error::InvalidTree {
            reason: format!(
                "'{}' already carries generation metadata ({})",
                self.node(id).name,
                existing.qualified()
            ),
            location: Some(self.location(id)),
        })
    }

    // ------------------------------------------------------------------
    // Grafting
    // ------------------------------------------------------------------

    /// Move every node of `other` into this forest, marking its roots as
    /// supplied by dependency artifact `dependency`. Metadata carried by
    /// `other` is kept as-is. Returns the new ids of `other`'s roots.
    pub fn graft(&mut self, other: SchemaForest, dependency: usize) -> Vec<NodeId> {
        let offset = self.nodes.len() as u32;
        let remap = |id: NodeId| NodeId(id.0 + offset);

        let files: Vec<FileId> = other
            .sources
            .paths()
            .map(|path| self.sources.file_id(path))
            .collect();

        for (index, node) in other.nodes.into_iter().enumerate() {
            let old = NodeId(index as u32);
            if let Some(meta) = other.metadata.get(old) {
                // Slots past `offset` are fresh, so this attach cannot collide.
                let _ = self.metadata.attach(remap(old), (*meta).clone());
            }
            let file = files
                .get(node.pos.file.index() as usize)
                .copied()
                .unwrap_or(node.pos.file);
            let origin = match node.origin {
                Origin::Unit => Origin::External(dependency),
                external => external,
            };
            self.nodes.push(SchemaNode {
                pos: SourcePos::new(file, node.pos.line, node.pos.col),
                parent: node.parent.map(remap),
                children: node.children.into_iter().map(remap).collect(),
                origin,
                ..node
            });
        }

        let roots: Vec<NodeId> = other.roots.into_iter().map(remap).collect();
        self.roots.extend(roots.iter().copied());
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BuiltinType, LeafType};

    fn pos(forest: &mut SchemaForest, line: u32) -> SourcePos {
        let file = forest.file_id("test.yang");
        SourcePos::new(file, line, 1)
    }

    fn module(forest: &mut SchemaForest) -> NodeId {
        let p = pos(forest, 1);
        forest
            .add_module("test", NodeKind::module("urn:test", "t"), p)
            .unwrap()
    }

    #[test]
    fn test_children_keep_declaration_order() {
        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        let p = pos(&mut forest, 2);
        let a = forest.add_child(m, "a", NodeKind::Container, p).unwrap();
        let b = forest.add_child(m, "b", NodeKind::Grouping, p).unwrap();
        let c = forest.add_child(m, "c", NodeKind::identity(None), p).unwrap();

        assert_eq!(forest.children(m), &[a, b, c]);
        assert_eq!(forest.node(b).parent(), Some(m));
        assert_eq!(forest.qualified_id(c).to_string(), "t:c");
    }

    #[test]
    fn test_attach_rejects_cycle() {
        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        let p = pos(&mut forest, 3);
        let outer = forest.add_detached("outer", NodeKind::Container, p);
        let inner = forest.add_detached("inner", NodeKind::Container, p);

        forest.attach(outer, inner).unwrap();
        let err = forest.attach(inner, outer).unwrap_err();
        assert!(matches!(err, Error::InvalidTree { .. }));

        let err = forest.attach(outer, outer).unwrap_err();
        assert!(err.to_string().contains("under itself"));

        forest.attach(m, outer).unwrap();
        assert_eq!(forest.module_of(inner), m);
    }

    #[test]
    fn test_attach_rejects_second_parent() {
        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        let p = pos(&mut forest, 4);
        let a = forest.add_child(m, "a", NodeKind::Container, p).unwrap();
        let b = forest.add_child(m, "b", NodeKind::Container, p).unwrap();

        let err = forest.attach(b, a).unwrap_err();
        assert!(err.to_string().contains("already belongs"));
    }

    #[test]
    fn test_containment_rules() {
        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        let p = pos(&mut forest, 5);
        let leaf = forest
            .add_child(m, "x", NodeKind::leaf(LeafType::Builtin(BuiltinType::String)), p)
            .unwrap();
        let c = forest.add_child(m, "c", NodeKind::Container, p).unwrap();

        assert!(forest.add_child(leaf, "y", NodeKind::Container, p).is_err());
        assert!(forest.add_child(c, "id", NodeKind::identity(None), p).is_err());
        assert!(forest
            .add_child(c, "m", NodeKind::module("urn:x", "x"), p)
            .is_err());
        assert!(forest
            .add_module("bad", NodeKind::Container, p)
            .is_err());
    }

    #[test]
    fn test_foreign_ids_rejected() {
        let mut other = SchemaForest::new();
        let om = module(&mut other);
        let p = pos(&mut other, 2);
        let foreign = other.add_child(om, "deep", NodeKind::Container, p).unwrap();

        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        let p = pos(&mut forest, 2);
        assert!(matches!(
            forest.add_child(foreign, "x", NodeKind::Container, p),
            Err(Error::InvalidTree { .. })
        ));
        assert!(matches!(forest.attach(m, foreign), Err(Error::InvalidTree { .. })));
        assert!(matches!(forest.attach(foreign, m), Err(Error::InvalidTree { .. })));
        assert!(forest
            .add_import(foreign, ModuleImport::new("x", "x"))
            .is_err());
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn test_descendants_pre_order() {
        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        let p = pos(&mut forest, 6);
        let a = forest.add_child(m, "a", NodeKind::Container, p).unwrap();
        let a1 = forest
            .add_child(a, "a1", NodeKind::leaf(LeafType::Builtin(BuiltinType::Int8)), p)
            .unwrap();
        let b = forest.add_child(m, "b", NodeKind::Container, p).unwrap();

        assert_eq!(forest.descendants(m), vec![m, a, a1, b]);
    }

    #[test]
    fn test_graft_remaps_ids_files_and_metadata() {
        let mut dep = SchemaForest::new();
        let dep_file = dep.file_id("dep.yang");
        let dm = dep
            .add_module("dep", NodeKind::module("urn:dep", "d"), SourcePos::new(dep_file, 1, 1))
            .unwrap();
        let di = dep
            .add_child(dm, "base", NodeKind::identity(None), SourcePos::new(dep_file, 2, 3))
            .unwrap();
        dep.attach_metadata(di, GenerationMetadata::new("org.dep", "Base"))
            .unwrap();

        let mut host = SchemaForest::new();
        let host_module = module(&mut host);
        let roots = host.graft(dep, 0);

        assert_eq!(roots.len(), 1);
        assert_eq!(host.roots(), &[host_module, roots[0]]);
        assert_eq!(host.external_roots().collect::<Vec<_>>(), roots);

        let base = host.children(roots[0])[0];
        assert_eq!(host.node(base).origin(), Origin::External(0));
        assert_eq!(host.metadata(base).unwrap().name, "Base");
        assert_eq!(host.location(base).to_string(), "dep.yang:2:3");
    }

    #[test]
    fn test_metadata_write_once() {
        let mut forest = SchemaForest::new();
        let m = module(&mut forest);
        forest
            .attach_metadata(m, GenerationMetadata::new("org.test", "Test"))
            .unwrap();
        let err = forest
            .attach_metadata(m, GenerationMetadata::new("org.test", "Other"))
            .unwrap_err();
        assert!(err.to_string().contains("already carries"));
    }
}
