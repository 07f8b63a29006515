//! Destinations for generated files.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Receives finished files, keyed by path relative to the output root.
pub trait SourceSink {
    /// Store one complete file. Fails with `OutputCollision` when the path
    /// was already written through this sink.
    fn write(&mut self, relative: &Path, contents: &[u8]) -> Result<()>;

    /// Remove a file written earlier. Missing files are not an error.
    fn remove(&mut self, relative: &Path) -> Result<()>;
}

/// Writes under a root directory. Each file is written to a temporary
/// file in its target directory and renamed into place, so a reader sees
/// either the complete file or none.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    written: IndexSet<PathBuf>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: IndexSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far, relative to the root.
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.written.iter().map(PathBuf::as_path)
    }
}

impl SourceSink for DirectorySink {
    fn write(&mut self, relative: &Path, contents: &[u8]) -> Result<()> {
        if self.written.contains(relative) {
            return Err(Error::OutputCollision {
                path: relative.to_path_buf(),
            });
        }
        let path = self.root.join(relative);
        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir)
            .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;

        let context = || format!("writing {}", path.display());
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(context(), e))?;
        tmp.write_all(contents).map_err(|e| Error::io(context(), e))?;
        tmp.persist(&path).map_err(|e| Error::io(context(), e.error))?;

        tracing::debug!("wrote {}", path.display());
        self.written.insert(relative.to_path_buf());
        Ok(())
    }

    fn remove(&mut self, relative: &Path) -> Result<()> {
        let path = self.root.join(relative);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io(format!("removing {}", path.display()), e)),
        }
        self.written.shift_remove(relative);
        Ok(())
    }
}

/// Keeps files in memory, in write order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    files: IndexMap<PathBuf, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &IndexMap<PathBuf, Vec<u8>> {
        &self.files
    }

    /// Contents of a file as text, if present and UTF-8.
    pub fn text(&self, relative: impl AsRef<Path>) -> Option<&str> {
        let bytes = self.files.get(relative.as_ref())?;
        std::str::from_utf8(bytes).ok()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceSink for MemorySink {
    fn write(&mut self, relative: &Path, contents: &[u8]) -> Result<()> {
        if self.files.contains_key(relative) {
            return Err(Error::OutputCollision {
                path: relative.to_path_buf(),
            });
        }
        self.files.insert(relative.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn remove(&mut self, relative: &Path) -> Result<()> {
        self.files.shift_remove(relative);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_sink_writes_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let rel = Path::new("org/colors/Red.java");

        sink.write(rel, b"class Red {}").unwrap();
        assert_eq!(fs::read(dir.path().join(rel)).unwrap(), b"class Red {}");

        // No temporary files are left next to the output.
        let entries: Vec<_> = fs::read_dir(dir.path().join("org/colors"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("Red.java")]);

        sink.remove(rel).unwrap();
        assert!(!dir.path().join(rel).exists());
        sink.remove(rel).unwrap();
    }

    #[test]
    fn test_directory_sink_collision() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let rel = Path::new("A.java");
        sink.write(rel, b"one").unwrap();
        assert!(matches!(
            sink.write(rel, b"two"),
            Err(Error::OutputCollision { .. })
        ));
        assert_eq!(fs::read(dir.path().join(rel)).unwrap(), b"one");
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write(Path::new("a/B.java"), b"class B {}").unwrap();
        assert_eq!(sink.text("a/B.java"), Some("class B {}"));
        assert!(sink.write(Path::new("a/B.java"), b"").is_err());
        sink.remove(Path::new("a/B.java")).unwrap();
        assert!(sink.is_empty());
    }
}
