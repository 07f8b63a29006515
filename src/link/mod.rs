//! Artifact linking: carrying resolved schema trees between builds.
//!
//! A build serializes its resolved modules, together with their generation
//! metadata and the producer's [`VersionStamp`], into one self-describing
//! JSON artifact. A downstream build decodes the artifacts of its declared
//! dependencies and grafts them into its own forest, where they satisfy
//! references without re-parsing any schema text.
//!
//! Decoding checks the header first: an artifact from an unsupported
//! producer is rejected before any node is materialized.
//!
//! Nodes are stored as a flat pre-order table with parent indices, so tree
//! depth never turns into JSON nesting. Leafref paths still nest one level
//! per predicate, which is why decoding runs without serde_json's recursion
//! limit.

#[cfg(feature = "archive")]
pub mod archive;
mod records;
mod stamp;

pub use stamp::VersionStamp;

use indexmap::IndexSet;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;

use self::records::{ArtifactHeader, ArtifactRecord, NodeRecord};
use crate::base::SourcePos;
use crate::error::{Error, Result};
use crate::schema::{NodeId, SchemaForest};

/// Value of the `format` field of every artifact.
pub const ARTIFACT_FORMAT: &str = "yangkit-artifact";

/// Layout version of the records in this module.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 2;

/// Where the artifact lives relative to a build's output directory.
pub const ARTIFACT_RESOURCE_PATH: &str = "yang/resources/YangMetaData.json";

/// Where the plain-text stamp lives relative to a build's output directory.
pub const VERSION_RESOURCE_PATH: &str = "yang/resources/VersionMetaData.txt";

/// Encodes and decodes artifacts on behalf of one tool version.
#[derive(Clone, Debug)]
pub struct ArtifactLinker {
    current: VersionStamp,
}

impl ArtifactLinker {
    /// A linker that accepts artifacts compatible with `current`.
    pub fn new(current: VersionStamp) -> Self {
        Self { current }
    }

    pub fn current(&self) -> &VersionStamp {
        &self.current
    }

    /// Encode the trees under `roots`, each root once, in first-seen order.
    pub fn serialize(
        forest: &SchemaForest,
        roots: impl IntoIterator<Item = NodeId>,
        stamp: &VersionStamp,
    ) -> Result<Vec<u8>> {
        let roots: IndexSet<NodeId> = roots.into_iter().collect();
        let mut index: FxHashMap<NodeId, u32> = FxHashMap::default();
        let mut nodes = Vec::new();
        for &root in &roots {
            for id in forest.descendants(root) {
                let parent = match forest.node(id).parent() {
                    Some(p) if id != root => index.get(&p).copied(),
                    _ => None,
                };
                index.insert(id, nodes.len() as u32);
                nodes.push(node_record(forest, id, parent));
            }
        }
        let record = ArtifactRecord {
            format: ARTIFACT_FORMAT.to_string(),
            schema_version: ARTIFACT_SCHEMA_VERSION,
            stamp: stamp.to_string(),
            files: forest.sources().paths().map(str::to_string).collect(),
            nodes,
        };

        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| Error::corrupt(format!("cannot encode artifact: {e}")))?;
        tracing::debug!(
            "[LINK] encoded {} modules, {} nodes ({} bytes) stamped {}",
            roots.len(),
            record.nodes.len(),
            bytes.len(),
            stamp
        );
        Ok(bytes)
    }

    /// Decode one artifact into a fresh forest.
    ///
    /// Fails with `IncompatibleArtifactVersion` when the producer or layout
    /// version is unsupported, and with `CorruptArtifact` on anything that is
    /// not a well-formed artifact.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<(SchemaForest, VersionStamp)> {
        let header: ArtifactHeader = from_slice_unbounded(bytes)
            .map_err(|e| Error::corrupt(format!("unreadable header: {e}")))?;
        if header.format != ARTIFACT_FORMAT {
            return Err(Error::corrupt(format!(
                "unknown artifact format '{}'",
                header.format
            )));
        }
        let stamp: VersionStamp = header.stamp.parse()?;
        if header.schema_version != ARTIFACT_SCHEMA_VERSION
            || !self.current.is_compatible_with(&stamp)
        {
            return Err(Error::IncompatibleArtifactVersion {
                found: format!("{stamp} (layout {})", header.schema_version),
                supported: format!("{} (layout {ARTIFACT_SCHEMA_VERSION})", self.current),
            });
        }

        let record: ArtifactRecord = from_slice_unbounded(bytes)
            .map_err(|e| Error::corrupt(format!("unreadable body: {e}")))?;

        let mut forest = SchemaForest::new();
        for path in &record.files {
            forest.file_id(path);
        }
        let mut ids: Vec<NodeId> = Vec::with_capacity(record.nodes.len());
        for (index, node) in record.nodes.into_iter().enumerate() {
            check_file(&node, record.files.len())?;
            let id = match node.parent {
                None => forest.add_module(node.name, node.kind, node.pos),
                Some(parent) => {
                    let parent = ids.get(parent as usize).copied().ok_or_else(|| {
                        Error::corrupt(format!(
                            "node {index} ('{}') names parent {parent}, which does not precede it",
                            node.name
                        ))
                    })?;
                    forest.add_child(parent, node.name, node.kind, node.pos)
                }
            }
            .map_err(|e| Error::corrupt(e.to_string()))?;
            if let Some(meta) = node.metadata {
                forest.attach_metadata(id, meta)?;
            }
            ids.push(id);
        }

        tracing::debug!(
            "[LINK] decoded {} nodes in {} modules from {}",
            forest.len(),
            forest.roots().len(),
            stamp
        );
        Ok((forest, stamp))
    }

    /// Decode several artifacts in parallel. The result keeps the input
    /// order, and the first failing artifact (in input order) is reported.
    pub fn decode_all<B>(&self, artifacts: &[B]) -> Result<Vec<(SchemaForest, VersionStamp)>>
    where
        B: AsRef<[u8]> + Sync,
    {
        artifacts
            .par_iter()
            .map(|bytes| self.deserialize(bytes.as_ref()))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}

fn node_record(forest: &SchemaForest, id: NodeId, parent: Option<u32>) -> NodeRecord {
    let node = forest.node(id);
    NodeRecord {
        name: node.name().into(),
        kind: node.kind().clone(),
        pos: node.pos(),
        parent,
        metadata: forest.metadata(id).map(|m| (*m).clone()),
    }
}

fn check_file(record: &NodeRecord, files: usize) -> Result<()> {
    let SourcePos { file, .. } = record.pos;
    if (file.index() as usize) < files {
        Ok(())
    } else {
        Err(Error::corrupt(format!(
            "node '{}' refers to unknown source {file}",
            record.name
        )))
    }
}

/// `serde_json::from_slice` without the nesting limit.
fn from_slice_unbounded<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    de.disable_recursion_limit();
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}
