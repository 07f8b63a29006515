//! Node identifiers.

use std::fmt;

/// Identity of a node within one [`SchemaForest`].
///
/// Two nodes are "the same node" exactly when their ids are equal; the
/// forest never hands out the same id twice. This is what deduplicating
/// sets (artifact serialization, emission bookkeeping) hash on.
///
/// [`SchemaForest`]: crate::schema::SchemaForest
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Get the raw index.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Where a root came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Origin {
    /// Declared in the compilation unit being built.
    Unit,
    /// Supplied by the dependency artifact at this declaration index.
    External(usize),
}

impl Origin {
    pub fn is_external(self) -> bool {
        matches!(self, Origin::External(_))
    }
}
