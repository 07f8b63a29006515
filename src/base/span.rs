//! Source positions attached to schema nodes.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::FileId;

/// Where a schema construct was declared.
///
/// Line and column are 1-based, as reported by the schema parser.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct SourcePos {
    pub file: FileId,
    pub line: u32,
    pub col: u32,
}

impl SourcePos {
    #[inline]
    pub const fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }
}

/// A [`SourcePos`] with the file id replaced by the file's path.
///
/// Errors carry this form so they stay readable after the forest that
/// produced them is gone.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}
