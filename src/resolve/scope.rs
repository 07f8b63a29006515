//! Per-module name tables.
//!
//! Every root module (unit or external) gets a [`ModuleScope`] that maps
//! names to the nodes that declare them. The [`ScopeIndex`] finds a module's
//! scope by module name, looking at the compilation unit first and at
//! dependency artifacts afterwards, in dependency declaration order.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::error::{Error, Result};
use crate::schema::{KindTag, NodeId, NodeKind, Origin, SchemaForest};

// ============================================================================
// MODULE SCOPE
// ============================================================================

/// Names visible inside one module.
#[derive(Clone, Debug)]
pub struct ModuleScope {
    module: NodeId,
    name: SmolStr,
    prefix: SmolStr,
    origin: Origin,
    /// Import prefix → imported module name.
    imports: FxHashMap<SmolStr, SmolStr>,
    /// (kind, name) → first declaring node.
    by_kind: FxHashMap<(KindTag, SmolStr), NodeId>,
    /// name → first declaring node of any kind, in declaration order.
    any: IndexMap<SmolStr, NodeId>,
}

impl ModuleScope {
    /// Collect the names declared anywhere in `module`'s tree.
    pub fn build(forest: &SchemaForest, module: NodeId) -> Result<Self> {
        let node = forest.node(module);
        let NodeKind::Module {
            prefix, imports, ..
        } = node.kind()
        else {
            return Err(Error::InvalidTree {
                reason: format!("root '{}' is a {}, not a module", node.name(), node.tag()),
                location: Some(forest.location(module)),
            });
        };

        let mut scope = Self {
            module,
            name: SmolStr::new(node.name()),
            prefix: prefix.clone(),
            origin: node.origin(),
            imports: imports
                .iter()
                .map(|i| (i.prefix.clone(), i.module.clone()))
                .collect(),
            by_kind: FxHashMap::default(),
            any: IndexMap::new(),
        };

        for id in forest.descendants(module).into_iter().skip(1) {
            let child = forest.node(id);
            let name = SmolStr::new(child.name());
            scope.by_kind.entry((child.tag(), name.clone())).or_insert(id);
            scope.any.entry(name).or_insert(id);
        }
        Ok(scope)
    }

    pub fn module(&self) -> NodeId {
        self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Module name bound to an import prefix.
    pub fn imported_module(&self, prefix: &str) -> Option<&SmolStr> {
        self.imports.get(prefix)
    }

    /// Look up a name declared with a specific kind.
    pub fn lookup_kind(&self, kind: KindTag, name: &str) -> Option<NodeId> {
        self.by_kind.get(&(kind, SmolStr::new(name))).copied()
    }

    /// Look up a name regardless of kind (first declaration wins).
    pub fn lookup_any(&self, name: &str) -> Option<NodeId> {
        self.any.get(name).copied()
    }

    /// Number of named nodes in this module.
    pub fn len(&self) -> usize {
        self.any.len()
    }

    pub fn is_empty(&self) -> bool {
        self.any.is_empty()
    }
}

// ============================================================================
// SCOPE INDEX
// ============================================================================

/// Module scopes of one forest, unit scopes shadowing external ones.
#[derive(Clone, Debug, Default)]
pub struct ScopeIndex {
    unit: IndexMap<SmolStr, ModuleScope>,
    external: IndexMap<SmolStr, ModuleScope>,
    by_root: FxHashMap<NodeId, SmolStr>,
}

impl ScopeIndex {
    /// Build scopes for every root of the forest.
    ///
    /// Two unit modules with the same name are an error. For external
    /// modules, the earliest dependency wins and later copies are ignored.
    pub fn build(forest: &SchemaForest) -> Result<Self> {
        let mut index = Self::default();

        for &root in forest.roots() {
            let scope = ModuleScope::build(forest, root)?;
            let name = scope.name.clone();
            index.by_root.insert(root, name.clone());

            if scope.origin.is_external() {
                if index.external.contains_key(&name) {
                    tracing::debug!(
                        "[SCOPE] module '{}' supplied by several dependencies; keeping the first",
                        name
                    );
                    continue;
                }
                index.external.insert(name, scope);
            } else {
                if index.unit.contains_key(&name) {
                    return Err(Error::InvalidTree {
                        reason: format!("module '{name}' is declared twice"),
                        location: Some(forest.location(root)),
                    });
                }
                if index.external.contains_key(&name) {
                    tracing::debug!(
                        "[SCOPE] unit module '{}' shadows a dependency module",
                        name
                    );
                }
                index.unit.insert(name, scope);
            }
        }

        tracing::debug!(
            "[SCOPE] built {} unit and {} external module scopes",
            index.unit.len(),
            index.external.len()
        );
        Ok(index)
    }

    /// Find a module by name, current unit first.
    pub fn module(&self, name: &str) -> Option<&ModuleScope> {
        self.unit.get(name).or_else(|| self.external.get(name))
    }

    /// The scope that `root` contributed, if any.
    pub fn scope_of_root(&self, root: NodeId) -> Option<&ModuleScope> {
        let name = self.by_root.get(&root)?;
        self.module(name).filter(|s| s.module == root)
    }

    pub fn unit_scopes(&self) -> impl Iterator<Item = &ModuleScope> {
        self.unit.values()
    }

    pub fn external_scopes(&self) -> impl Iterator<Item = &ModuleScope> {
        self.external.values()
    }

    pub fn len(&self) -> usize {
        self.unit.len() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unit.is_empty() && self.external.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourcePos;
    use crate::schema::ModuleImport;

    fn forest_with(name: &str, prefix: &str) -> (SchemaForest, NodeId) {
        let mut forest = SchemaForest::new();
        let file = forest.file_id(&format!("{name}.yang"));
        let m = forest
            .add_module(name, NodeKind::module(format!("urn:{name}"), prefix), SourcePos::new(file, 1, 1))
            .unwrap();
        (forest, m)
    }

    #[test]
    fn test_module_scope_lookup() {
        let (mut forest, m) = forest_with("colors", "col");
        let p = forest.node(m).pos();
        forest
            .add_import(m, ModuleImport::new("types", "t"))
            .unwrap();
        let red = forest.add_child(m, "red", NodeKind::identity(None), p).unwrap();
        let c = forest.add_child(m, "red", NodeKind::Container, p).unwrap();

        let scope = ModuleScope::build(&forest, m).unwrap();
        assert_eq!(scope.lookup_kind(KindTag::Identity, "red"), Some(red));
        assert_eq!(scope.lookup_kind(KindTag::Container, "red"), Some(c));
        assert_eq!(scope.lookup_any("red"), Some(red));
        assert_eq!(scope.imported_module("t").map(|s| s.as_str()), Some("types"));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_unit_shadows_external() {
        let (mut dep, dm) = forest_with("shared", "s");
        let p = dep.node(dm).pos();
        dep.add_child(dm, "from-dep", NodeKind::identity(None), p)
            .unwrap();

        let (mut forest, _unit) = forest_with("shared", "s");
        forest.graft(dep, 0);

        let index = ScopeIndex::build(&forest).unwrap();
        let scope = index.module("shared").unwrap();
        assert_eq!(scope.origin(), Origin::Unit);
        assert!(scope.lookup_any("from-dep").is_none());
        assert_eq!(index.external_scopes().count(), 1);
    }

    #[test]
    fn test_duplicate_unit_module_fails() {
        let (mut forest, m) = forest_with("dup", "d");
        let p = forest.node(m).pos();
        forest
            .add_module("dup", NodeKind::module("urn:dup", "d"), p)
            .unwrap();

        let err = ScopeIndex::build(&forest).unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }
}
