//! An output file under construction.

use std::path::PathBuf;

use smol_str::SmolStr;

use super::imports::ImportRegistry;

const INDENT: &str = "    ";

/// One generated source file, buffered until its node's emission is
/// finished. Nothing reaches a sink before the whole pass succeeds.
#[derive(Clone, Debug)]
pub struct SourceFile {
    package: SmolStr,
    name: SmolStr,
    header: String,
    imports: ImportRegistry,
    body: Vec<String>,
}

impl SourceFile {
    /// A file declaring type `name` in `package`. The header is the type
    /// declaration line without its opening brace.
    pub fn new(package: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        let package = package.into();
        let name = name.into();
        Self {
            imports: ImportRegistry::new(package.clone(), name.clone()),
            header: format!("public final class {name}"),
            package,
            name,
            body: Vec::new(),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn imports(&self) -> &ImportRegistry {
        &self.imports
    }

    pub fn imports_mut(&mut self) -> &mut ImportRegistry {
        &mut self.imports
    }

    pub fn set_header(&mut self, header: impl Into<String>) {
        self.header = header.into();
    }

    /// Append a body line; an empty string is a blank line.
    pub fn push(&mut self, line: impl Into<String>) {
        self.body.push(line.into());
    }

    /// `org/example/Name.java`
    pub fn relative_path(&self) -> PathBuf {
        let mut path: PathBuf = self.package.split('.').filter(|s| !s.is_empty()).collect();
        path.push(format!("{}.java", self.name));
        path
    }

    pub fn render(&self, banner: &str) -> String {
        let mut out = format!("// {banner}\n");
        if !self.package.is_empty() {
            out.push_str(&format!("package {};\n", self.package));
        }
        let imports = self.imports.imports();
        if !imports.is_empty() {
            out.push('\n');
            for import in imports {
                out.push_str(&format!("import {import};\n"));
            }
        }
        out.push('\n');
        out.push_str(&self.header);
        out.push_str(" {\n");
        for line in &self.body {
            if !line.is_empty() {
                out.push_str(INDENT);
                out.push_str(line);
            }
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}
