//! On-disk record types of the artifact format.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::base::SourcePos;
use crate::schema::{GenerationMetadata, NodeKind};

/// The fields read before anything else, to decide compatibility.
#[derive(Debug, Deserialize)]
pub(crate) struct ArtifactHeader {
    pub format: String,
    pub schema_version: u32,
    pub stamp: String,
}

/// A whole artifact.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ArtifactRecord {
    pub format: String,
    pub schema_version: u32,
    pub stamp: String,
    /// Schema file paths; `SourcePos::file` indexes into this list.
    pub files: Vec<String>,
    /// Every node in pre-order. Records without a parent are module roots.
    pub nodes: Vec<NodeRecord>,
}

/// One node. `parent` indexes an earlier record of the same table.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct NodeRecord {
    pub name: SmolStr,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub pos: SourcePos,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GenerationMetadata>,
}
