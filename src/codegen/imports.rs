//! Per-file import bookkeeping.
//!
//! A generated file may refer to a type either by its short name (after an
//! `import`, or because it lives in the file's own namespace) or by its
//! fully qualified name. The first namespace to claim a short name keeps
//! it; every later claimant is referenced qualified. The file's own type
//! name is claimed up front, so a foreign type of the same name can never
//! shadow it.

use indexmap::IndexMap;
use smol_str::SmolStr;

/// How a reference must be written in the generated file.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ImportDecision {
    /// Short name; an `import` line is added when the namespace differs.
    Unqualified,
    /// Fully qualified name, no import.
    Qualified,
}

/// Namespace that needs neither an import nor qualification.
const IMPLICIT_NAMESPACE: &str = "java.lang";

/// Import decisions for one generated file.
#[derive(Clone, Debug)]
pub struct ImportRegistry {
    file_namespace: SmolStr,
    /// short name → namespace that owns it in this file
    bound: IndexMap<SmolStr, SmolStr>,
}

impl ImportRegistry {
    /// A registry for a file in `file_namespace` declaring `own_name`.
    pub fn new(file_namespace: impl Into<SmolStr>, own_name: impl Into<SmolStr>) -> Self {
        let file_namespace = file_namespace.into();
        let mut bound = IndexMap::new();
        bound.insert(own_name.into(), file_namespace.clone());
        Self {
            file_namespace,
            bound,
        }
    }

    pub fn file_namespace(&self) -> &str {
        &self.file_namespace
    }

    /// Decide how `short_name` from `namespace` is written in this file.
    ///
    /// Binding the same pair twice returns the same decision.
    pub fn bind(&mut self, short_name: &str, namespace: &str) -> ImportDecision {
        match self.bound.get(short_name) {
            Some(owner) if owner == namespace => ImportDecision::Unqualified,
            Some(_) => ImportDecision::Qualified,
            None => {
                self.bound.insert(short_name.into(), namespace.into());
                ImportDecision::Unqualified
            }
        }
    }

    /// Bind and render the reference text.
    pub fn reference(&mut self, short_name: &str, namespace: &str) -> (ImportDecision, String) {
        let decision = self.bind(short_name, namespace);
        let text = match decision {
            ImportDecision::Qualified if !namespace.is_empty() => {
                format!("{namespace}.{short_name}")
            }
            _ => short_name.to_string(),
        };
        (decision, text)
    }

    /// `import` lines this file needs, sorted.
    pub fn imports(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .bound
            .iter()
            .filter(|(_, ns)| {
                !ns.is_empty() && *ns != &self.file_namespace && ns.as_str() != IMPLICIT_NAMESPACE
            })
            .map(|(short, ns)| format!("{ns}.{short}"))
            .collect();
        out.sort();
        out
    }
}
