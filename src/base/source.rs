//! Mapping between schema file paths and [`FileId`]s.

use std::sync::Arc;

use indexmap::IndexMap;

use super::{FileId, Location, SourcePos};

/// Assigns stable ids to schema file paths.
///
/// Ids are handed out sequentially in registration order, so the map can be
/// rebuilt from its path list alone (the artifact linker relies on this).
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    /// Path → FileId mapping, in registration order
    files: IndexMap<Arc<str>, FileId>,
}

impl SourceMap {
    /// Create a new empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a FileId for a path.
    pub fn file_id(&mut self, path: &str) -> FileId {
        if let Some(&id) = self.files.get(path) {
            return id;
        }
        let id = FileId::new(self.files.len() as u32);
        self.files.insert(Arc::from(path), id);
        id
    }

    /// Get the path for a FileId.
    pub fn path(&self, file: FileId) -> Option<&str> {
        self.files
            .get_index(file.index() as usize)
            .map(|(path, _)| path.as_ref())
    }

    /// Render a position for diagnostics. Unknown files render as `<unknown>`.
    pub fn location(&self, pos: SourcePos) -> Location {
        let file = self.path(pos.file).unwrap_or("<unknown>");
        Location::new(file, pos.line, pos.col)
    }

    /// Iterate over all registered paths in id order.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.files.keys().map(|p| p.as_ref())
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_map_id_assignment() {
        let mut files = SourceMap::new();

        let id1 = files.file_id("/a.yang");
        let id2 = files.file_id("/b.yang");
        let id3 = files.file_id("/a.yang");

        assert_ne!(id1, id2);
        assert_eq!(id1, id3);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_source_map_location() {
        let mut files = SourceMap::new();
        let id = files.file_id("ietf-types.yang");

        let loc = files.location(SourcePos::new(id, 3, 9));
        assert_eq!(loc.to_string(), "ietf-types.yang:3:9");

        let unknown = files.location(SourcePos::new(FileId::new(42), 1, 1));
        assert_eq!(&*unknown.file, "<unknown>");
    }
}
