//! Java-style output, one entry/exit pair per node kind.
//!
//! | kind                      | entry                       | exit                   |
//! |---------------------------|-----------------------------|------------------------|
//! | module                    | metadata, open class        | constants, members     |
//! | container, list, grouping | metadata, open interface    | accessors              |
//! | typedef                   | value class                 | -                      |
//! | identity                  | abstract class `extends` base | -                    |
//! | leaf, leaf-list           | metadata                    | -                      |
//! | augment, uses             | -                           | -                      |

use super::emitter::{EmitContext, EmitHandler, EmitTable};
use super::file::SourceFile;
use super::names;
use crate::error::{Error, Result};
use crate::schema::{GeneratedFileKind, GenerationMetadata, KindTag, NodeId, NodeKind};

pub(super) fn standard_table() -> EmitTable {
    let interface = EmitHandler::new(interface_entry, interface_exit);
    EmitTable::empty()
        .with(KindTag::Module, EmitHandler::new(module_entry, module_exit))
        .with(KindTag::Container, interface)
        .with(KindTag::List, interface)
        .with(KindTag::Grouping, interface)
        .with(KindTag::Typedef, EmitHandler::new(typedef_entry, super::emitter::skip))
        .with(KindTag::Identity, EmitHandler::new(identity_entry, super::emitter::skip))
        .with(KindTag::Leaf, EmitHandler::new(member_entry, super::emitter::skip))
        .with(KindTag::LeafList, EmitHandler::new(member_entry, super::emitter::skip))
}

fn quoted(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn module_constants(cx: &EmitContext<'_>, node: NodeId) -> Result<(String, String)> {
    let forest = cx.forest();
    match forest.node(forest.module_of(node)).kind() {
        NodeKind::Module {
            namespace, prefix, ..
        } => Ok((namespace.to_string(), prefix.to_string())),
        other => Err(Error::InvalidTree {
            reason: format!("a {} is not a module", other.tag()),
            location: Some(forest.location(node)),
        }),
    }
}

// ----------------------------------------------------------------------------
// module
// ----------------------------------------------------------------------------

fn module_entry(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let name = names::class_name(cx.forest().node(node).name());
    let meta = GenerationMetadata::new(cx.package_of(node), name)
        .with_file(GeneratedFileKind::ModuleClass);
    let meta = cx.attach(node, meta)?;
    cx.open(node, SourceFile::new(meta.package.clone(), meta.name.clone()))
}

fn module_exit(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let mut file = cx.take(node)?;
    let forest = cx.forest();
    let (namespace, prefix) = module_constants(cx, node)?;

    file.push(format!(
        "public static final String NAME = {};",
        quoted(forest.node(node).name())
    ));
    file.push(format!("public static final String NAMESPACE = {};", quoted(&namespace)));
    file.push(format!("public static final String PREFIX = {};", quoted(&prefix)));

    let mut members = Vec::new();
    for &child in forest.children(node) {
        let Some(meta) = forest.metadata(child) else {
            continue;
        };
        if meta.files.is_empty() {
            continue;
        }
        members.push(format!("{}.class", cx.reference(&mut file, node, child, &meta)));
    }
    if !members.is_empty() {
        let (_, list) = file.imports_mut().reference("List", "java.util");
        file.push("");
        file.push(format!("public static final {list}<Class<?>> MEMBERS = {list}.of("));
        let last = members.len() - 1;
        for (i, member) in members.iter().enumerate() {
            let sep = if i == last { "" } else { "," };
            file.push(format!("        {member}{sep}"));
        }
        file.push(");");
    }

    file.push("");
    file.push(format!("private {}() {{}}", file.name()));
    cx.stage(file)
}

// ----------------------------------------------------------------------------
// container, list, grouping
// ----------------------------------------------------------------------------

fn interface_entry(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let name = names::class_name(cx.forest().node(node).name());
    let meta = GenerationMetadata::new(cx.package_of(node), name)
        .with_file(GeneratedFileKind::Interface);
    let meta = cx.attach(node, meta)?;
    let mut file = SourceFile::new(meta.package.clone(), meta.name.clone());
    file.set_header(format!("public interface {}", meta.name));
    cx.open(node, file)
}

/// Accessors need the children's types, so the body is written on exit.
fn interface_exit(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let mut file = cx.take(node)?;
    let forest = cx.forest();

    if let NodeKind::List { keys } = forest.node(node).kind() {
        if !keys.is_empty() {
            let (_, list) = file.imports_mut().reference("List", "java.util");
            let keys: Vec<String> = keys.iter().map(|k| quoted(k)).collect();
            file.push(format!("{list}<String> KEYS = {list}.of({});", keys.join(", ")));
            file.push("");
        }
    }

    for &child in forest.children(node) {
        let member = names::member_name(forest.node(child).name());
        let line = match forest.node(child).tag() {
            KindTag::Leaf => format!("{} {member}();", cx.type_of(&mut file, node, child)?),
            KindTag::LeafList => {
                let ty = cx.boxed_type_of(&mut file, node, child)?;
                let (_, list) = file.imports_mut().reference("List", "java.util");
                format!("{list}<{ty}> {member}();")
            }
            KindTag::Container => {
                let meta = cx.require_metadata(node, child)?;
                format!("{} {member}();", cx.reference(&mut file, node, child, &meta))
            }
            KindTag::List => {
                let meta = cx.require_metadata(node, child)?;
                let ty = cx.reference(&mut file, node, child, &meta);
                let (_, list) = file.imports_mut().reference("List", "java.util");
                format!("{list}<{ty}> {member}();")
            }
            _ => continue,
        };
        file.push(line);
    }
    cx.stage(file)
}

// ----------------------------------------------------------------------------
// typedef
// ----------------------------------------------------------------------------

fn typedef_entry(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let name = names::class_name(cx.forest().node(node).name());
    let mut file = SourceFile::new(cx.package_of(node), name.clone());
    // Fails before any metadata is attached if the base typedef is missing.
    let ty = cx.type_of(&mut file, node, node)?;

    let meta = GenerationMetadata::new(file.package(), name.clone())
        .with_file(GeneratedFileKind::TypedefClass);
    cx.attach(node, meta)?;

    file.push(format!("private final {ty} value;"));
    file.push("");
    file.push(format!("public {name}({ty} value) {{"));
    file.push("    this.value = value;");
    file.push("}");
    file.push("");
    file.push(format!("public {ty} value() {{"));
    file.push("    return value;");
    file.push("}");
    cx.stage(file)
}

// ----------------------------------------------------------------------------
// identity
// ----------------------------------------------------------------------------

/// Everything an identity generates is known at entry.
fn identity_entry(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let forest = cx.forest();
    let name = names::class_name(forest.node(node).name());
    let mut file = SourceFile::new(cx.package_of(node), name.clone());

    let mut header = format!("public abstract class {name}");
    if let Some(base) = cx.resolution().base_of(node) {
        let base_meta = cx.require_metadata(node, base)?;
        let base_ref = cx.reference(&mut file, node, base, &base_meta);
        header.push_str(&format!(" extends {base_ref}"));
    }
    file.set_header(header);

    let meta = GenerationMetadata::new(file.package(), name.clone())
        .with_file(GeneratedFileKind::IdentityClass);
    cx.attach(node, meta)?;

    let (namespace, _) = module_constants(cx, node)?;
    file.push(format!(
        "public static final String NAME = {};",
        quoted(forest.node(node).name())
    ));
    file.push(format!("public static final String NAMESPACE = {};", quoted(&namespace)));
    file.push("");
    file.push(format!("protected {name}() {{}}"));
    cx.stage(file)
}

// ----------------------------------------------------------------------------
// leaf, leaf-list
// ----------------------------------------------------------------------------

/// Leaves are members of their parent's type; they get no file.
fn member_entry(cx: &mut EmitContext<'_>, node: NodeId) -> Result<()> {
    let forest = cx.forest();
    let owner = forest
        .node(node)
        .parent()
        .and_then(|p| forest.metadata(p))
        .map(|m| m.qualified())
        .unwrap_or_else(|| cx.package_of(node));
    let name = names::member_name(forest.node(node).name());
    cx.attach(node, GenerationMetadata::new(owner, name))?;
    Ok(())
}
