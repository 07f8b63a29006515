//! Schema node variants.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{NodeId, Origin, PathExpression, QualifiedName};
use crate::base::SourcePos;

/// `import <module> { prefix <prefix>; }`
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct ModuleImport {
    pub module: SmolStr,
    pub prefix: SmolStr,
}

impl ModuleImport {
    pub fn new(module: impl Into<SmolStr>, prefix: impl Into<SmolStr>) -> Self {
        Self {
            module: module.into(),
            prefix: prefix.into(),
        }
    }
}

/// YANG built-in types.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    String,
    Boolean,
    Binary,
    Empty,
    InstanceIdentifier,
}

impl BuiltinType {
    /// Look up a built-in by its keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "int8" => BuiltinType::Int8,
            "int16" => BuiltinType::Int16,
            "int32" => BuiltinType::Int32,
            "int64" => BuiltinType::Int64,
            "uint8" => BuiltinType::Uint8,
            "uint16" => BuiltinType::Uint16,
            "uint32" => BuiltinType::Uint32,
            "uint64" => BuiltinType::Uint64,
            "decimal64" => BuiltinType::Decimal64,
            "string" => BuiltinType::String,
            "boolean" => BuiltinType::Boolean,
            "binary" => BuiltinType::Binary,
            "empty" => BuiltinType::Empty,
            "instance-identifier" => BuiltinType::InstanceIdentifier,
            _ => return None,
        })
    }
}

/// The declared type of a leaf, leaf-list or typedef.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeafType {
    Builtin(BuiltinType),
    /// Reference to a typedef.
    Derived(QualifiedName),
    Leafref(PathExpression),
    /// `identityref { base <identity>; }`
    Identityref(QualifiedName),
}

impl LeafType {
    /// Interpret a `type` argument that is not a leafref or identityref.
    pub fn named(name: QualifiedName) -> Self {
        match (&name.prefix, BuiltinType::from_keyword(&name.name)) {
            (None, Some(builtin)) => LeafType::Builtin(builtin),
            _ => LeafType::Derived(name),
        }
    }
}

/// Construct kind plus the data that only that kind carries.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeKind {
    Module {
        namespace: SmolStr,
        prefix: SmolStr,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        imports: Vec<ModuleImport>,
    },
    Container,
    List {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        keys: Vec<SmolStr>,
    },
    Leaf {
        #[serde(rename = "type")]
        ty: LeafType,
    },
    LeafList {
        #[serde(rename = "type")]
        ty: LeafType,
    },
    Typedef {
        #[serde(rename = "type")]
        ty: LeafType,
    },
    Grouping,
    Identity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<QualifiedName>,
    },
    Augment {
        target: SmolStr,
    },
    Uses {
        grouping: QualifiedName,
    },
}

/// Field-less mirror of [`NodeKind`], used as a dispatch key.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum KindTag {
    Module,
    Container,
    List,
    Leaf,
    LeafList,
    Typedef,
    Grouping,
    Identity,
    Augment,
    Uses,
}

impl KindTag {
    pub const ALL: [KindTag; 10] = [
        KindTag::Module,
        KindTag::Container,
        KindTag::List,
        KindTag::Leaf,
        KindTag::LeafList,
        KindTag::Typedef,
        KindTag::Grouping,
        KindTag::Identity,
        KindTag::Augment,
        KindTag::Uses,
    ];

    /// The YANG keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            KindTag::Module => "module",
            KindTag::Container => "container",
            KindTag::List => "list",
            KindTag::Leaf => "leaf",
            KindTag::LeafList => "leaf-list",
            KindTag::Typedef => "typedef",
            KindTag::Grouping => "grouping",
            KindTag::Identity => "identity",
            KindTag::Augment => "augment",
            KindTag::Uses => "uses",
        }
    }

    /// Whether nodes of this kind may own children.
    pub fn has_children(self) -> bool {
        matches!(
            self,
            KindTag::Module
                | KindTag::Container
                | KindTag::List
                | KindTag::Grouping
                | KindTag::Augment
        )
    }

    /// Data nodes are the ones addressable by leafref paths.
    pub fn is_data_node(self) -> bool {
        matches!(
            self,
            KindTag::Container | KindTag::List | KindTag::Leaf | KindTag::LeafList
        )
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl NodeKind {
    pub fn tag(&self) -> KindTag {
        match self {
            NodeKind::Module { .. } => KindTag::Module,
            NodeKind::Container => KindTag::Container,
            NodeKind::List { .. } => KindTag::List,
            NodeKind::Leaf { .. } => KindTag::Leaf,
            NodeKind::LeafList { .. } => KindTag::LeafList,
            NodeKind::Typedef { .. } => KindTag::Typedef,
            NodeKind::Grouping => KindTag::Grouping,
            NodeKind::Identity { .. } => KindTag::Identity,
            NodeKind::Augment { .. } => KindTag::Augment,
            NodeKind::Uses { .. } => KindTag::Uses,
        }
    }

    pub fn module(namespace: impl Into<SmolStr>, prefix: impl Into<SmolStr>) -> Self {
        NodeKind::Module {
            namespace: namespace.into(),
            prefix: prefix.into(),
            imports: Vec::new(),
        }
    }

    pub fn identity(base: Option<QualifiedName>) -> Self {
        NodeKind::Identity { base }
    }

    pub fn leaf(ty: LeafType) -> Self {
        NodeKind::Leaf { ty }
    }

    /// The declared type, for the kinds that have one.
    pub fn leaf_type(&self) -> Option<&LeafType> {
        match self {
            NodeKind::Leaf { ty } | NodeKind::LeafList { ty } | NodeKind::Typedef { ty } => {
                Some(ty)
            }
            _ => None,
        }
    }
}

/// One node of the schema forest.
///
/// The parent owns its children (by id, through the forest arena); the
/// `parent` field is a back-reference used for tree walks only.
#[derive(Clone, Debug)]
pub struct SchemaNode {
    pub(crate) name: SmolStr,
    pub(crate) kind: NodeKind,
    pub(crate) pos: SourcePos,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) origin: Origin,
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn pos(&self) -> SourcePos {
        self.pos
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_type_builtin_vs_derived() {
        assert_eq!(
            LeafType::named(QualifiedName::local("uint64")),
            LeafType::Builtin(BuiltinType::Uint64)
        );
        assert_eq!(
            LeafType::named(QualifiedName::local("percent")),
            LeafType::Derived(QualifiedName::local("percent"))
        );
        // A prefixed name never denotes a built-in.
        assert!(matches!(
            LeafType::named(QualifiedName::new("t", "string")),
            LeafType::Derived(_)
        ));
    }

    #[test]
    fn test_kind_tag_round_trip() {
        let kind = NodeKind::identity(None);
        assert_eq!(kind.tag(), KindTag::Identity);
        assert!(!kind.tag().has_children());
        assert!(KindTag::List.is_data_node());
        assert_eq!(KindTag::LeafList.to_string(), "leaf-list");
    }

    #[test]
    fn test_kind_serde_tagged() {
        let kind = NodeKind::identity(Some(QualifiedName::new("col", "base-color")));
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["kind"], "identity");
        assert_eq!(json["base"]["name"], "base-color");

        let back: NodeKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, kind);
    }
}
