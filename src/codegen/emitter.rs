//! The two-phase emission driver.
//!
//! Every node is visited twice: `on_entry` in pre-order and `on_exit` in
//! post-order. What a visit does is looked up by node kind in an
//! [`EmitTable`], so new kinds (or replacement output for existing ones)
//! are plugged in without touching the traversal.
//!
//! Traversal order:
//!
//! 1. unit identities, base first
//! 2. unit typedefs, base typedef first
//! 3. each unit module tree, skipping the nodes above
//!
//! A node's entry validates that everything its header references already
//! carries generation metadata, so steps 1 and 2 make every cross-tree
//! reference of step 3 point backwards.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::file::SourceFile;
use super::imports::ImportDecision;
use super::names;
use super::sink::SourceSink;
use super::types;
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::resolve::Resolution;
use crate::schema::{GenerationMetadata, KindTag, LeafType, NodeId, SchemaForest};

// ============================================================================
// CAPABILITY TABLE
// ============================================================================

/// One phase of a kind's emission.
pub type EmitFn = fn(&mut EmitContext<'_>, NodeId) -> Result<()>;

/// Entry and exit behavior for one node kind.
#[derive(Copy, Clone)]
pub struct EmitHandler {
    pub on_entry: EmitFn,
    pub on_exit: EmitFn,
}

impl EmitHandler {
    pub const fn new(on_entry: EmitFn, on_exit: EmitFn) -> Self {
        Self { on_entry, on_exit }
    }

    /// Produces nothing in either phase.
    pub const fn none() -> Self {
        Self::new(skip, skip)
    }
}

impl std::fmt::Debug for EmitHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitHandler").finish_non_exhaustive()
    }
}

/// No-op phase.
pub fn skip(_: &mut EmitContext<'_>, _: NodeId) -> Result<()> {
    Ok(())
}

/// Handlers keyed by node kind. Kinds without an entry emit nothing.
#[derive(Clone, Debug, Default)]
pub struct EmitTable {
    handlers: FxHashMap<KindTag, EmitHandler>,
}

impl EmitTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Java-style output for every kind.
    pub fn standard() -> Self {
        super::handlers::standard_table()
    }

    pub fn with(mut self, kind: KindTag, handler: EmitHandler) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn handler(&self, kind: KindTag) -> EmitHandler {
        self.handlers
            .get(&kind)
            .copied()
            .unwrap_or(EmitHandler::none())
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// A cross-file reference written into generated code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Node whose file holds the reference.
    pub from: NodeId,
    /// Node whose generated type is referenced.
    pub to: NodeId,
    pub decision: ImportDecision,
    /// The text written (short or qualified name).
    pub text: String,
}

/// What one emission pass did.
#[derive(Clone, Debug, Default)]
pub struct EmitReport {
    /// Nodes in the order their entry phase ran.
    pub entered: Vec<NodeId>,
    /// Files written, relative to the sink root, in write order.
    pub files: Vec<PathBuf>,
    pub references: Vec<ReferenceRecord>,
}

impl EmitReport {
    /// References written from `from`'s file to `to`'s type.
    pub fn references_between(&self, from: NodeId, to: NodeId) -> Vec<&ReferenceRecord> {
        self.references
            .iter()
            .filter(|r| r.from == from && r.to == to)
            .collect()
    }
}

// ============================================================================
// CONTEXT
// ============================================================================

/// State of one emission pass, handed to every handler.
///
/// Open files and staged output belong to the pass and are dropped with it.
pub struct EmitContext<'a> {
    forest: &'a SchemaForest,
    resolution: &'a Resolution,
    config: &'a BuildConfig,
    banner: String,
    open: FxHashMap<NodeId, SourceFile>,
    staged: IndexMap<PathBuf, String>,
    report: EmitReport,
}

impl<'a> EmitContext<'a> {
    fn new(forest: &'a SchemaForest, resolution: &'a Resolution, config: &'a BuildConfig) -> Self {
        Self {
            forest,
            resolution,
            config,
            banner: format!("Generated by {}. Do not edit.", config.producer),
            open: FxHashMap::default(),
            staged: IndexMap::new(),
            report: EmitReport::default(),
        }
    }

    pub fn forest(&self) -> &'a SchemaForest {
        self.forest
    }

    pub fn resolution(&self) -> &'a Resolution {
        self.resolution
    }

    pub fn config(&self) -> &'a BuildConfig {
        self.config
    }

    /// Package of the code generated for `node`: the base package, the
    /// module, then every enclosing node between the module and `node`.
    pub fn package_of(&self, node: NodeId) -> String {
        let module = self.forest.module_of(node);
        let mut segments: Vec<String> = self
            .forest
            .ancestors(node)
            .take_while(|&a| a != module)
            .map(|a| names::package_segment(self.forest.node(a).name()))
            .collect();
        segments.push(names::package_segment(self.forest.node(module).name()));
        if !self.config.base_package.is_empty() {
            segments.push(self.config.base_package.clone());
        }
        segments.reverse();
        segments.join(".")
    }

    /// Metadata `node` needs from `dependency` before it can be emitted.
    pub fn require_metadata(
        &self,
        node: NodeId,
        dependency: NodeId,
    ) -> Result<Arc<GenerationMetadata>> {
        self.forest
            .metadata(dependency)
            .ok_or_else(|| Error::MissingDependencyInfo {
                node: self.forest.qualified_id(node).to_string(),
                dependency: self.forest.qualified_id(dependency).to_string(),
                location: Some(self.forest.location(node)),
            })
    }

    pub fn attach(
        &self,
        node: NodeId,
        metadata: GenerationMetadata,
    ) -> Result<Arc<GenerationMetadata>> {
        self.forest.attach_metadata(node, metadata)
    }

    /// Hold `file` open until `node`'s exit.
    pub fn open(&mut self, node: NodeId, file: SourceFile) -> Result<()> {
        if self.open.insert(node, file).is_some() {
            return Err(Error::InvalidTree {
                reason: format!("'{}' opened twice", self.forest.node(node).name()),
                location: Some(self.forest.location(node)),
            });
        }
        Ok(())
    }

    pub fn take(&mut self, node: NodeId) -> Result<SourceFile> {
        self.open.remove(&node).ok_or_else(|| Error::InvalidTree {
            reason: format!("'{}' has no open file", self.forest.node(node).name()),
            location: Some(self.forest.location(node)),
        })
    }

    /// Finish a file. It reaches the sink only if the whole pass succeeds.
    pub fn stage(&mut self, file: SourceFile) -> Result<()> {
        if !names::is_identifier(file.name()) {
            return Err(Error::InvalidTree {
                reason: format!("'{}' is not a legal type name", file.name()),
                location: None,
            });
        }
        let path = file.relative_path();
        if self.staged.contains_key(&path) {
            return Err(Error::OutputCollision { path });
        }
        let text = file.render(&self.banner);
        let max = self.config.max_line_length;
        for (index, line) in text.lines().enumerate() {
            let width = line.chars().count();
            if width > max {
                tracing::warn!(
                    "{}:{}: line is {width} columns, limit is {max}",
                    path.display(),
                    index + 1
                );
            }
        }
        self.staged.insert(path, text);
        Ok(())
    }

    /// Write a reference to `target`'s generated type into `file`.
    pub fn reference(
        &mut self,
        file: &mut SourceFile,
        from: NodeId,
        target: NodeId,
        metadata: &GenerationMetadata,
    ) -> String {
        let (decision, text) = file.imports_mut().reference(&metadata.name, &metadata.package);
        tracing::trace!(
            "{} -> {} ({decision:?})",
            self.forest.qualified_id(from),
            metadata.qualified()
        );
        self.report.references.push(ReferenceRecord {
            from,
            to: target,
            decision,
            text: text.clone(),
        });
        text
    }

    /// Target type of a leaf, leaf-list or typedef, as written in `file`.
    pub fn type_of(&mut self, file: &mut SourceFile, owner: NodeId, node: NodeId) -> Result<String> {
        let mut visiting = Vec::new();
        self.type_of_inner(file, owner, node, false, &mut visiting)
    }

    /// Like [`type_of`](Self::type_of), boxing primitives.
    pub fn boxed_type_of(
        &mut self,
        file: &mut SourceFile,
        owner: NodeId,
        node: NodeId,
    ) -> Result<String> {
        let mut visiting = Vec::new();
        self.type_of_inner(file, owner, node, true, &mut visiting)
    }

    fn type_of_inner(
        &mut self,
        file: &mut SourceFile,
        owner: NodeId,
        node: NodeId,
        boxed: bool,
        visiting: &mut Vec<NodeId>,
    ) -> Result<String> {
        let forest = self.forest;
        let unresolved = |name: String| Error::UnresolvedReference {
            name,
            location: Some(forest.location(node)),
        };
        let Some(ty) = forest.node(node).kind().leaf_type() else {
            return Err(Error::InvalidTree {
                reason: format!("'{}' has no type", forest.node(node).name()),
                location: Some(forest.location(node)),
            });
        };
        match ty {
            LeafType::Builtin(builtin) => {
                let mut target = types::builtin(*builtin);
                if boxed {
                    target = target.boxed();
                }
                if target.is_primitive() {
                    Ok(target.name.to_string())
                } else {
                    let (_, text) = file.imports_mut().reference(target.name, target.namespace);
                    Ok(text)
                }
            }
            LeafType::Derived(name) => {
                let typedef = self
                    .resolution
                    .typedef_of(node)
                    .ok_or_else(|| unresolved(name.to_string()))?;
                let meta = self.require_metadata(owner, typedef)?;
                Ok(self.reference(file, owner, typedef, &meta))
            }
            LeafType::Identityref(name) => {
                let identity = self
                    .resolution
                    .identityref_of(node)
                    .ok_or_else(|| unresolved(name.to_string()))?;
                let meta = self.require_metadata(owner, identity)?;
                let text = self.reference(file, owner, identity, &meta);
                Ok(format!("Class<? extends {text}>"))
            }
            LeafType::Leafref(path) => {
                if visiting.contains(&node) {
                    visiting.push(node);
                    return Err(Error::CyclicReference {
                        cycle: visiting
                            .iter()
                            .map(|&n| forest.qualified_id(n).to_string())
                            .collect(),
                        location: Some(forest.location(node)),
                    });
                }
                visiting.push(node);
                let target = self
                    .resolution
                    .leafref(node)
                    .map(|r| r.target)
                    .ok_or_else(|| unresolved(path.to_string()))?;
                self.type_of_inner(file, owner, target, boxed, visiting)
            }
        }
    }
}

// ============================================================================
// EMITTER
// ============================================================================

enum Step {
    Enter(NodeId),
    Exit(NodeId),
}

/// Runs an [`EmitTable`] over the unit modules of a resolved forest.
#[derive(Clone, Debug, Default)]
pub struct CodeEmitter {
    table: EmitTable,
}

impl CodeEmitter {
    pub fn new(table: EmitTable) -> Self {
        Self { table }
    }

    /// Emitter with [`EmitTable::standard`].
    pub fn standard() -> Self {
        Self::new(EmitTable::standard())
    }

    pub fn table(&self) -> &EmitTable {
        &self.table
    }

    /// Emit every unit node, then write the generated files to `sink`.
    ///
    /// On failure nothing is left in the sink: files are only written
    /// after the last node is emitted, and a failed write removes the
    /// files written before it.
    pub fn emit(
        &self,
        forest: &SchemaForest,
        resolution: &Resolution,
        config: &BuildConfig,
        sink: &mut dyn SourceSink,
    ) -> Result<EmitReport> {
        let mut cx = EmitContext::new(forest, resolution, config);
        let mut done: FxHashSet<NodeId> = FxHashSet::default();

        for &node in resolution
            .identity_order()
            .iter()
            .chain(resolution.typedef_order())
        {
            self.enter(&mut cx, node)?;
            self.exit(&mut cx, node)?;
            done.insert(node);
        }

        for root in forest.unit_roots() {
            let mut stack = vec![Step::Enter(root)];
            while let Some(step) = stack.pop() {
                match step {
                    Step::Enter(node) if done.contains(&node) => {}
                    Step::Enter(node) => {
                        self.enter(&mut cx, node)?;
                        stack.push(Step::Exit(node));
                        stack.extend(forest.children(node).iter().rev().map(|&c| Step::Enter(c)));
                    }
                    Step::Exit(node) => self.exit(&mut cx, node)?,
                }
            }
        }

        if let Some(&node) = cx.open.keys().next() {
            return Err(Error::InvalidTree {
                reason: format!("'{}' was never finished", forest.node(node).name()),
                location: Some(forest.location(node)),
            });
        }

        let staged = std::mem::take(&mut cx.staged);
        let mut report = cx.report;
        for (path, text) in staged {
            if let Err(e) = sink.write(&path, text.as_bytes()) {
                discard(sink, &report.files);
                return Err(e);
            }
            report.files.push(path);
        }
        tracing::info!(
            "emitted {} files for {} nodes",
            report.files.len(),
            report.entered.len()
        );
        Ok(report)
    }

    fn enter(&self, cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
        let handler = self.table.handler(cx.forest.node(node).tag());
        cx.report.entered.push(node);
        (handler.on_entry)(cx, node).map_err(|e| e.with_location(cx.forest.location(node)))
    }

    fn exit(&self, cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
        let handler = self.table.handler(cx.forest.node(node).tag());
        (handler.on_exit)(cx, node).map_err(|e| e.with_location(cx.forest.location(node)))
    }
}

/// Best-effort removal of files written before a failure.
pub(crate) fn discard(sink: &mut dyn SourceSink, files: &[PathBuf]) {
    for path in files {
        if let Err(e) = sink.remove(path) {
            tracing::warn!("could not discard {}: {e}", path.display());
        }
    }
}
