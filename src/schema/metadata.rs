//! Generation metadata: where a node's generated code lives.
//!
//! Metadata is absent until the emitter (or the artifact linker, for
//! external nodes) attaches it, and never changes afterwards. The table is
//! shared between readers; each slot has a single writer.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::NodeId;

/// Kinds of source file generated for a node.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratedFileKind {
    /// Constants and member list of a module.
    ModuleClass,
    /// Accessor interface of a container, list or grouping.
    Interface,
    /// Value class wrapping a typedef.
    TypedefClass,
    /// Class representing one identity.
    IdentityClass,
}

/// Output namespace and name of a node's generated code.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub package: SmolStr,
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<GeneratedFileKind>,
}

impl GenerationMetadata {
    pub fn new(package: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, kind: GeneratedFileKind) -> Self {
        if !self.files.contains(&kind) {
            self.files.push(kind);
        }
        self
    }

    /// `package.Name`
    pub fn qualified(&self) -> String {
        if self.package.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Directory of the package relative to the output root.
    pub fn package_dir(&self) -> PathBuf {
        self.package.split('.').filter(|s| !s.is_empty()).collect()
    }
}

/// Write-once side table of metadata, keyed by node identity.
#[derive(Debug, Default)]
pub struct MetadataTable {
    slots: RwLock<FxHashMap<NodeId, Arc<GenerationMetadata>>>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<Arc<GenerationMetadata>> {
        self.slots.read().get(&node).cloned()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.slots.read().contains_key(&node)
    }

    /// Attach metadata to a node. Returns the existing value unchanged as
    /// `Err` if the node already carries metadata.
    pub fn attach(
        &self,
        node: NodeId,
        metadata: GenerationMetadata,
    ) -> std::result::Result<Arc<GenerationMetadata>, Arc<GenerationMetadata>> {
        let mut slots = self.slots.write();
        if let Some(existing) = slots.get(&node) {
            return Err(existing.clone());
        }
        let metadata = Arc::new(metadata);
        slots.insert(node, metadata.clone());
        Ok(metadata)
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for MetadataTable {
    fn clone(&self) -> Self {
        Self {
            slots: RwLock::new(self.slots.read().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_and_dir() {
        let meta = GenerationMetadata::new("org.example.colors", "BaseColor");
        assert_eq!(meta.qualified(), "org.example.colors.BaseColor");
        assert_eq!(meta.package_dir(), PathBuf::from("org/example/colors"));
    }

    #[test]
    fn test_attach_is_write_once() {
        let table = MetadataTable::new();
        let node = NodeId(3);

        assert!(table.attach(node, GenerationMetadata::new("a", "First")).is_ok());
        let existing = table
            .attach(node, GenerationMetadata::new("a", "Second"))
            .unwrap_err();

        assert_eq!(existing.name, "First");
        assert_eq!(table.get(node).unwrap().name, "First");
        assert_eq!(table.len(), 1);
    }
}
