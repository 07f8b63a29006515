use std::path::{Path, PathBuf};

use super::*;
use crate::base::SourcePos;
use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::resolve::Resolver;
use crate::schema::{
    BuiltinType, GenerationMetadata, LeafType, ModuleImport, NodeId, NodeKind, QualifiedName,
    SchemaForest,
};

struct Fixture {
    forest: SchemaForest,
    pos: SourcePos,
}

impl Fixture {
    fn new() -> Self {
        let mut forest = SchemaForest::new();
        let file = forest.file_id("unit.yang");
        Self {
            forest,
            pos: SourcePos::new(file, 1, 1),
        }
    }

    fn module(&mut self, name: &str, prefix: &str) -> NodeId {
        self.forest
            .add_module(name, NodeKind::module(format!("urn:{name}"), prefix), self.pos)
            .unwrap()
    }

    fn child(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> NodeId {
        self.forest.add_child(parent, name, kind, self.pos).unwrap()
    }

    fn leaf(&mut self, parent: NodeId, name: &str, ty: LeafType) -> NodeId {
        self.child(parent, name, NodeKind::leaf(ty))
    }

    fn identity(&mut self, parent: NodeId, name: &str, base: Option<&str>) -> NodeId {
        let base = base.map(|b| QualifiedName::parse(b).unwrap());
        self.child(parent, name, NodeKind::identity(base))
    }

    fn emit(&self) -> (Result<EmitReport>, MemorySink) {
        let mut sink = MemorySink::new();
        let config = BuildConfig::new().with_base_package("org.test");
        let result = Resolver::new(&self.forest)
            .and_then(|r| r.resolve())
            .and_then(|resolution| {
                CodeEmitter::standard().emit(&self.forest, &resolution, &config, &mut sink)
            });
        (result, sink)
    }
}

fn builtin(ty: BuiltinType) -> LeafType {
    LeafType::Builtin(ty)
}

/// A dependency module holding one identity, with or without metadata.
fn dependency_identity(module: &str, prefix: &str, package: Option<&str>) -> SchemaForest {
    let mut dep = Fixture::new();
    let m = dep.module(module, prefix);
    let status = dep.identity(m, "status", None);
    if let Some(package) = package {
        dep.forest
            .attach_metadata(status, GenerationMetadata::new(package, "Status"))
            .unwrap();
    }
    dep.forest
}

#[test]
fn test_identities_emitted_base_first_unqualified() {
    let mut fx = Fixture::new();
    let m = fx.module("colors", "col");
    let red = fx.identity(m, "red", Some("base-color"));
    let base = fx.identity(m, "base-color", None);

    let (report, sink) = fx.emit();
    let report = report.unwrap();

    assert_eq!(&report.entered[..2], &[base, red]);
    let refs = report.references_between(red, base);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].decision, ImportDecision::Unqualified);
    assert_eq!(refs[0].text, "BaseColor");

    let red_java = sink.text("org/test/colors/Red.java").unwrap();
    assert!(red_java.contains("package org.test.colors;"));
    assert!(red_java.contains("public abstract class Red extends BaseColor {"));
    assert!(!red_java.contains("import"));
    assert_eq!(
        *fx.forest.metadata(red).unwrap(),
        GenerationMetadata::new("org.test.colors", "Red")
            .with_file(crate::schema::GeneratedFileKind::IdentityClass)
    );
}

#[test]
fn test_same_short_name_from_two_namespaces() {
    let mut fx = Fixture::new();
    let m = fx.module("mixed", "m");
    fx.forest.add_import(m, ModuleImport::new("pkg-a", "a")).unwrap();
    fx.forest.add_import(m, ModuleImport::new("pkg-b", "b")).unwrap();
    let holder = fx.child(m, "holder", NodeKind::Container);
    fx.leaf(holder, "first", LeafType::Identityref(QualifiedName::new("a", "status")));
    fx.leaf(holder, "second", LeafType::Identityref(QualifiedName::new("b", "status")));

    let a_root = fx.forest.graft(dependency_identity("pkg-a", "a", Some("pkg.a")), 0)[0];
    let b_root = fx.forest.graft(dependency_identity("pkg-b", "b", Some("pkg.b")), 1)[0];
    let status_a = fx.forest.children(a_root)[0];
    let status_b = fx.forest.children(b_root)[0];

    let (report, sink) = fx.emit();
    let report = report.unwrap();

    assert_eq!(
        report.references_between(holder, status_a)[0].decision,
        ImportDecision::Unqualified
    );
    assert_eq!(
        report.references_between(holder, status_b)[0].decision,
        ImportDecision::Qualified
    );

    let holder_java = sink.text("org/test/mixed/Holder.java").unwrap();
    assert!(holder_java.contains("import pkg.a.Status;"));
    assert!(!holder_java.contains("import pkg.b.Status;"));
    assert!(holder_java.contains("Class<? extends Status> first();"));
    assert!(holder_java.contains("Class<? extends pkg.b.Status> second();"));
}

#[test]
fn test_nested_packages_and_members() {
    let mut fx = Fixture::new();
    let m = fx.module("net", "n");
    let interfaces = fx.child(m, "interfaces", NodeKind::Container);
    let list = fx.child(
        interfaces,
        "interface",
        NodeKind::List {
            keys: vec!["name".into()],
        },
    );
    fx.leaf(list, "name", builtin(BuiltinType::String));
    fx.leaf(list, "mtu", builtin(BuiltinType::Uint64));
    fx.child(list, "tags", NodeKind::LeafList { ty: builtin(BuiltinType::Int32) });

    let (report, sink) = fx.emit();
    let report = report.unwrap();
    assert_eq!(
        report.files,
        vec![
            PathBuf::from("org/test/net/interfaces/Interface.java"),
            PathBuf::from("org/test/net/Interfaces.java"),
            PathBuf::from("org/test/net/Net.java"),
        ]
    );

    let interface = sink.text("org/test/net/interfaces/Interface.java").unwrap();
    assert!(interface.contains("package org.test.net.interfaces;"));
    assert!(interface.contains("import java.math.BigInteger;"));
    assert!(interface.contains("import java.util.List;"));
    assert!(interface.contains("List<String> KEYS = List.of(\"name\");"));
    assert!(interface.contains("String name();"));
    assert!(interface.contains("BigInteger mtu();"));
    assert!(interface.contains("List<Integer> tags();"));

    let interfaces_java = sink.text("org/test/net/Interfaces.java").unwrap();
    assert!(interfaces_java.contains("import org.test.net.interfaces.Interface;"));
    assert!(interfaces_java.contains("List<Interface> interface_();"));

    let net = sink.text("org/test/net/Net.java").unwrap();
    assert!(net.contains("public static final String NAMESPACE = \"urn:net\";"));
    assert!(net.contains("Interfaces.class"));

    assert_eq!(
        fx.forest.metadata(list).unwrap().qualified(),
        "org.test.net.interfaces.Interface"
    );
}

#[test]
fn test_typedef_chain_and_leafref_types() {
    let mut fx = Fixture::new();
    let m = fx.module("sys", "s");
    let percent = fx.child(
        m,
        "percent",
        NodeKind::Typedef {
            ty: LeafType::named(QualifiedName::local("small")),
        },
    );
    let small = fx.child(
        m,
        "small",
        NodeKind::Typedef {
            ty: builtin(BuiltinType::Uint8),
        },
    );
    let port = fx.child(m, "port", NodeKind::List { keys: vec!["id".into()] });
    fx.leaf(port, "id", builtin(BuiltinType::Uint16));
    fx.leaf(port, "load", LeafType::named(QualifiedName::new("s", "percent")));
    let cfg = fx.child(m, "cfg", NodeKind::Container);
    let path = "/s:port/s:id".parse().unwrap();
    fx.leaf(cfg, "primary", LeafType::Leafref(path));

    let (report, sink) = fx.emit();
    let report = report.unwrap();
    let small_pos = report.entered.iter().position(|&n| n == small).unwrap();
    let percent_pos = report.entered.iter().position(|&n| n == percent).unwrap();
    assert!(small_pos < percent_pos);

    let percent_java = sink.text("org/test/sys/Percent.java").unwrap();
    assert!(percent_java.contains("private final Small value;"));
    let small_java = sink.text("org/test/sys/Small.java").unwrap();
    assert!(small_java.contains("public short value() {"));

    let port_java = sink.text("org/test/sys/Port.java").unwrap();
    assert!(port_java.contains("Percent load();"));
    let cfg_java = sink.text("org/test/sys/Cfg.java").unwrap();
    assert!(cfg_java.contains("int primary();"));
}

#[test]
fn test_leafref_type_follows_path_not_name() {
    let mut fx = Fixture::new();
    let m = fx.module("m", "m");
    let a = fx.child(m, "a", NodeKind::Container);
    let b = fx.child(m, "b", NodeKind::Container);
    fx.leaf(a, "id", builtin(BuiltinType::String));
    fx.leaf(b, "id", builtin(BuiltinType::Uint32));
    fx.leaf(a, "ref", LeafType::Leafref("/m:b/m:id".parse().unwrap()));

    let (report, sink) = fx.emit();
    report.unwrap();
    let a_java = sink.text("org/test/m/A.java").unwrap();
    assert!(a_java.contains("long ref();"));
}

#[test]
fn test_leafref_loop_emits_nothing() {
    let mut fx = Fixture::new();
    let m = fx.module("m", "m");
    fx.leaf(m, "a", LeafType::Leafref("/m:b".parse().unwrap()));
    fx.leaf(m, "b", LeafType::Leafref("/m:a".parse().unwrap()));

    let (result, sink) = fx.emit();
    assert!(matches!(result, Err(Error::CyclicReference { .. })));
    assert!(sink.is_empty());
}

#[test]
fn test_typedef_through_leafref_entered_after_target_typedef() {
    let mut fx = Fixture::new();
    let m = fx.module("m", "m");
    let t1 = fx.child(
        m,
        "t1",
        NodeKind::Typedef {
            ty: LeafType::Leafref("/m:x".parse().unwrap()),
        },
    );
    fx.leaf(m, "x", LeafType::named(QualifiedName::local("t2")));
    let t2 = fx.child(
        m,
        "t2",
        NodeKind::Typedef {
            ty: builtin(BuiltinType::String),
        },
    );

    let (report, sink) = fx.emit();
    let report = report.unwrap();
    let t1_pos = report.entered.iter().position(|&n| n == t1).unwrap();
    let t2_pos = report.entered.iter().position(|&n| n == t2).unwrap();
    assert!(t2_pos < t1_pos);

    let t1_java = sink.text("org/test/m/T1.java").unwrap();
    assert!(t1_java.contains("private final T2 value;"));
}

#[test]
fn test_external_typedef_without_metadata_fails() {
    let mut fx = Fixture::new();
    let m = fx.module("user", "u");
    fx.forest.add_import(m, ModuleImport::new("types", "t")).unwrap();
    let stats = fx.child(m, "stats", NodeKind::Container);
    fx.leaf(stats, "size", LeafType::named(QualifiedName::new("t", "bytes")));

    let mut dep = Fixture::new();
    let dm = dep.module("types", "t");
    dep.child(dm, "bytes", NodeKind::Typedef { ty: builtin(BuiltinType::Uint32) });
    fx.forest.graft(dep.forest, 0);

    let (result, sink) = fx.emit();
    let err = result.unwrap_err();
    assert!(matches!(err, Error::MissingDependencyInfo { ref dependency, .. } if dependency == "t:bytes"));
    assert!(err.location().is_some());
    assert!(sink.is_empty());
}

#[test]
fn test_output_collision_writes_nothing() {
    let mut fx = Fixture::new();
    let m = fx.module("colors", "c");
    fx.identity(m, "red", None);
    fx.child(m, "colors", NodeKind::Container);

    let (result, sink) = fx.emit();
    assert!(matches!(
        result,
        Err(Error::OutputCollision { ref path }) if path == Path::new("org/test/colors/Colors.java")
    ));
    assert!(sink.is_empty());
}

#[test]
fn test_emitting_twice_is_rejected() {
    let mut fx = Fixture::new();
    let m = fx.module("colors", "c");
    fx.identity(m, "red", None);

    let (first, _) = fx.emit();
    first.unwrap();
    let (second, sink) = fx.emit();
    assert!(matches!(second, Err(Error::InvalidTree { .. })));
    assert!(sink.is_empty());
}

#[test]
fn test_empty_table_emits_nothing() {
    let mut fx = Fixture::new();
    let m = fx.module("colors", "c");
    let red = fx.identity(m, "red", None);

    let resolution = Resolver::new(&fx.forest).unwrap().resolve().unwrap();
    let mut sink = MemorySink::new();
    let report = CodeEmitter::new(EmitTable::empty())
        .emit(&fx.forest, &resolution, &BuildConfig::new(), &mut sink)
        .unwrap();

    assert_eq!(report.entered, vec![red, m]);
    assert!(report.files.is_empty());
    assert!(sink.is_empty());
    assert!(fx.forest.metadata(red).is_none());
}

/// Accepts one file, then fails.
#[derive(Default)]
struct FlakySink {
    inner: MemorySink,
    removed: Vec<PathBuf>,
}

impl SourceSink for FlakySink {
    fn write(&mut self, relative: &Path, contents: &[u8]) -> Result<()> {
        if !self.inner.is_empty() {
            return Err(Error::io("writing", std::io::Error::other("disk full")));
        }
        self.inner.write(relative, contents)
    }

    fn remove(&mut self, relative: &Path) -> Result<()> {
        self.removed.push(relative.to_path_buf());
        self.inner.remove(relative)
    }
}

#[test]
fn test_failed_write_discards_earlier_files() {
    let mut fx = Fixture::new();
    let m = fx.module("colors", "c");
    fx.identity(m, "red", None);
    fx.identity(m, "blue", None);

    let resolution = Resolver::new(&fx.forest).unwrap().resolve().unwrap();
    let mut sink = FlakySink::default();
    let err = CodeEmitter::standard()
        .emit(&fx.forest, &resolution, &BuildConfig::new(), &mut sink)
        .unwrap_err();

    assert!(matches!(err, Error::Io { .. }));
    assert!(sink.inner.is_empty());
    assert_eq!(sink.removed.len(), 1);
}
