//! Build orchestration: one compilation unit, or a workspace of units that
//! depend on each other's artifacts.
//!
//! A unit runs the fixed pipeline decode → graft → resolve → emit → link.
//! The first error aborts the unit, and the unit leaves no generated files
//! behind.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use smol_str::SmolStr;

use crate::codegen::{CodeEmitter, DirectorySink, EmitReport, EmitTable, SourceSink, discard};
use crate::config::{BuildConfig, FailurePolicy};
use crate::error::{Error, Result};
use crate::link::{ARTIFACT_RESOURCE_PATH, ArtifactLinker, VERSION_RESOURCE_PATH, VersionStamp};
use crate::resolve::{Resolution, Resolver};
use crate::schema::SchemaForest;

// ============================================================================
// COMPILATION
// ============================================================================

/// What a successful unit build produced.
#[derive(Debug)]
pub struct BuildOutput {
    /// The unit's forest with dependencies grafted and metadata attached.
    pub forest: SchemaForest,
    pub resolution: Resolution,
    pub report: EmitReport,
    /// The artifact downstream units consume.
    pub artifact: Vec<u8>,
    /// Stamps of the dependency artifacts, in declaration order.
    pub dependency_stamps: Vec<VersionStamp>,
}

impl BuildOutput {
    /// The artifact wrapped in a distributable archive.
    #[cfg(feature = "archive")]
    pub fn package(&self, stamp: &VersionStamp) -> Result<Vec<u8>> {
        crate::link::archive::package(&self.artifact, stamp)
    }
}

/// One compilation unit: parsed modules plus dependency artifacts.
#[derive(Debug)]
pub struct Compilation {
    config: BuildConfig,
    forest: SchemaForest,
    dependencies: Vec<Vec<u8>>,
    emitter: CodeEmitter,
}

impl Compilation {
    /// A unit over `forest`, whose roots are the unit's parsed modules.
    pub fn new(config: BuildConfig, forest: SchemaForest) -> Self {
        Self {
            config,
            forest,
            dependencies: Vec::new(),
            emitter: CodeEmitter::standard(),
        }
    }

    pub fn with_emit_table(mut self, table: EmitTable) -> Self {
        self.emitter = CodeEmitter::new(table);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Add a dependency artifact. Dependencies are consulted in the order
    /// they are added.
    pub fn add_dependency(&mut self, artifact: impl Into<Vec<u8>>) {
        self.dependencies.push(artifact.into());
    }

    /// Add the artifact packaged in a dependency archive. Returns `false`
    /// for archives without schema content.
    #[cfg(feature = "archive")]
    pub fn add_dependency_archive(&mut self, archive: &[u8]) -> Result<bool> {
        match crate::link::archive::read_artifact(archive)? {
            Some(artifact) => {
                self.add_dependency(artifact);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Build into the configured output directory.
    pub fn build_to_dir(self) -> Result<BuildOutput> {
        let mut sink = DirectorySink::new(self.config.output_dir.clone());
        self.build(&mut sink)
    }

    /// Run the pipeline, writing generated sources, the artifact and its
    /// stamp to `sink`.
    pub fn build(self, sink: &mut dyn SourceSink) -> Result<BuildOutput> {
        let Compilation {
            config,
            mut forest,
            dependencies,
            emitter,
        } = self;

        let linker = ArtifactLinker::new(config.producer.clone());
        let decoded = linker.decode_all(&dependencies)?;
        let mut dependency_stamps = Vec::with_capacity(decoded.len());
        for (index, (external, stamp)) in decoded.into_iter().enumerate() {
            forest.graft(external, index);
            dependency_stamps.push(stamp);
        }

        let resolution = Resolver::new(&forest)?.resolve()?;
        let report = emitter.emit(&forest, &resolution, &config, sink)?;

        let unit_roots: Vec<_> = forest.unit_roots().collect();
        let artifact = ArtifactLinker::serialize(&forest, unit_roots, &config.producer)
            .and_then(|artifact| {
                write_resources(sink, &artifact, &config.producer)?;
                Ok(artifact)
            })
            .inspect_err(|_| discard(sink, &report.files))?;

        tracing::info!(
            "built {} modules with {} dependencies, stamped {}",
            forest.unit_roots().count(),
            dependency_stamps.len(),
            config.producer
        );
        Ok(BuildOutput {
            forest,
            resolution,
            report,
            artifact,
            dependency_stamps,
        })
    }
}

fn write_resources(sink: &mut dyn SourceSink, artifact: &[u8], stamp: &VersionStamp) -> Result<()> {
    let artifact_path = Path::new(ARTIFACT_RESOURCE_PATH);
    sink.write(artifact_path, artifact)?;
    if let Err(e) = sink.write(Path::new(VERSION_RESOURCE_PATH), stamp.to_string().as_bytes()) {
        discard(sink, &[artifact_path.to_path_buf()]);
        return Err(e);
    }
    Ok(())
}

// ============================================================================
// WORKSPACE
// ============================================================================

/// How one unit of a workspace build ended.
#[derive(Debug)]
pub enum UnitOutcome {
    Built(Box<BuildOutput>),
    Failed(Error),
    /// Not attempted, because of the failure of the named unit.
    Skipped { cause: SmolStr },
}

impl UnitOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, UnitOutcome::Built(_))
    }

    pub fn output(&self) -> Option<&BuildOutput> {
        match self {
            UnitOutcome::Built(output) => Some(output.as_ref()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            UnitOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of every unit, in build order.
#[derive(Debug, Default)]
pub struct WorkspaceReport {
    outcomes: IndexMap<SmolStr, UnitOutcome>,
}

impl WorkspaceReport {
    pub fn outcome(&self, unit: &str) -> Option<&UnitOutcome> {
        self.outcomes.get(unit)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &UnitOutcome)> {
        self.outcomes.iter().map(|(name, o)| (name.as_str(), o))
    }

    /// Units in the order they were considered.
    pub fn order(&self) -> Vec<&str> {
        self.outcomes.keys().map(SmolStr::as_str).collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(UnitOutcome::is_built)
    }
}

#[derive(Debug)]
struct Unit {
    forest: SchemaForest,
    dependencies: Vec<SmolStr>,
    external: Vec<Vec<u8>>,
}

/// Several units, each consuming the artifacts of the units it depends on.
#[derive(Debug)]
pub struct Workspace {
    config: BuildConfig,
    units: IndexMap<SmolStr, Unit>,
}

impl Workspace {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            units: IndexMap::new(),
        }
    }

    /// Declare a unit and the workspace units it depends on.
    pub fn add_unit(
        &mut self,
        name: &str,
        forest: SchemaForest,
        dependencies: &[&str],
    ) -> Result<()> {
        if self.units.contains_key(name) {
            return Err(Error::InvalidTree {
                reason: format!("unit '{name}' declared twice"),
                location: None,
            });
        }
        self.units.insert(
            name.into(),
            Unit {
                forest,
                dependencies: dependencies.iter().copied().map(SmolStr::from).collect(),
                external: Vec::new(),
            },
        );
        Ok(())
    }

    /// Give a unit an artifact that comes from outside the workspace. It
    /// is consulted before the artifacts of workspace dependencies.
    pub fn add_external_dependency(&mut self, unit: &str, artifact: Vec<u8>) -> Result<()> {
        let Some(entry) = self.units.get_mut(unit) else {
            return Err(Error::UnresolvedReference {
                name: unit.to_string(),
                location: None,
            });
        };
        entry.external.push(artifact);
        Ok(())
    }

    /// Build every unit, each under `output_dir/<unit>`.
    pub fn build(self) -> WorkspaceReport {
        let root = self.config.output_dir.clone();
        self.build_with(|unit| DirectorySink::new(root.join(unit)))
    }

    /// Build every unit into the sink `sink_for` returns for it.
    pub fn build_with<S, F>(self, mut sink_for: F) -> WorkspaceReport
    where
        S: SourceSink,
        F: FnMut(&str) -> S,
    {
        let policy = self.config.failure_policy;
        let (order, mut report) = build_order(&self.units);
        let mut units = self.units;
        let mut artifacts: IndexMap<SmolStr, Vec<u8>> = IndexMap::new();
        // unit → every workspace unit it depends on, directly or not
        let mut closures: IndexMap<SmolStr, IndexSet<SmolStr>> = IndexMap::new();
        let mut aborted: Option<SmolStr> = match policy {
            FailurePolicy::AbortAll => report.outcomes.keys().next().cloned(),
            FailurePolicy::ContinueIndependent => None,
        };

        for name in order {
            let Some(unit) = units.shift_remove(&name) else {
                continue;
            };
            if let Some(cause) = &aborted {
                report.outcomes.insert(name, UnitOutcome::Skipped { cause: cause.clone() });
                continue;
            }
            if let Some(cause) = failed_dependency(&unit, &report) {
                tracing::debug!("skipping unit '{name}': dependency '{cause}' did not build");
                report.outcomes.insert(name, UnitOutcome::Skipped { cause });
                continue;
            }

            let mut compilation = Compilation::new(
                self.config
                    .clone()
                    .with_output_dir(self.config.output_dir.join(name.as_str())),
                unit.forest,
            );
            for artifact in unit.external {
                compilation.add_dependency(artifact);
            }
            let mut closure = IndexSet::new();
            for dependency in &unit.dependencies {
                closure.insert(dependency.clone());
                if let Some(inner) = closures.get(dependency) {
                    closure.extend(inner.iter().cloned());
                }
            }
            for dependency in &closure {
                if let Some(artifact) = artifacts.get(dependency) {
                    compilation.add_dependency(artifact.clone());
                }
            }
            closures.insert(name.clone(), closure);

            let mut sink = sink_for(&name);
            let outcome = match compilation.build(&mut sink) {
                Ok(output) => {
                    artifacts.insert(name.clone(), output.artifact.clone());
                    UnitOutcome::Built(Box::new(output))
                }
                Err(e) => {
                    tracing::warn!("unit '{name}' failed: {e}");
                    if policy == FailurePolicy::AbortAll {
                        aborted = Some(name.clone());
                    }
                    UnitOutcome::Failed(e)
                }
            };
            report.outcomes.insert(name, outcome);
        }
        report
    }
}

/// Units ordered so that each follows its dependencies; ties keep
/// declaration order. Units on a dependency cycle or naming an unknown unit
/// are reported as failed up front. Units that only depend on a cycle are
/// still ordered, and get skipped when their turn comes.
fn build_order(units: &IndexMap<SmolStr, Unit>) -> (Vec<SmolStr>, WorkspaceReport) {
    let mut report = WorkspaceReport::default();
    let mut placed: IndexSet<SmolStr> = IndexSet::new();

    for (name, unit) in units {
        if let Some(missing) = unit.dependencies.iter().find(|d| !units.contains_key(*d)) {
            report.outcomes.insert(
                name.clone(),
                UnitOutcome::Failed(Error::UnresolvedReference {
                    name: missing.to_string(),
                    location: None,
                }),
            );
        }
    }

    place_ready(units, &mut placed, &report);

    let mut cyclic: IndexSet<SmolStr> = units
        .keys()
        .filter(|n| !placed.contains(*n) && !report.outcomes.contains_key(*n))
        .cloned()
        .collect();
    // peel off units nothing else in the stuck set depends on
    loop {
        let downstream = cyclic
            .iter()
            .find(|n| !cyclic.iter().any(|m| units[m].dependencies.contains(*n)))
            .cloned();
        match downstream {
            Some(name) => {
                cyclic.shift_remove(&name);
            }
            None => break,
        }
    }

    if let Some(first) = cyclic.first().cloned() {
        let mut cycle: Vec<String> = cyclic.iter().map(SmolStr::to_string).collect();
        cycle.push(first.to_string());
        for name in cyclic {
            report.outcomes.insert(
                name,
                UnitOutcome::Failed(Error::CyclicReference {
                    cycle: cycle.clone(),
                    location: None,
                }),
            );
        }
        place_ready(units, &mut placed, &report);
    }

    (placed.into_iter().collect(), report)
}

/// Repeatedly place the first unit whose dependencies are all placed or
/// already failed.
fn place_ready(
    units: &IndexMap<SmolStr, Unit>,
    placed: &mut IndexSet<SmolStr>,
    report: &WorkspaceReport,
) {
    loop {
        let next = units.iter().find(|(name, unit)| {
            !placed.contains(*name)
                && !report.outcomes.contains_key(*name)
                && unit
                    .dependencies
                    .iter()
                    .all(|d| placed.contains(d) || report.outcomes.contains_key(d))
        });
        match next {
            Some((name, _)) => {
                placed.insert(name.clone());
            }
            None => break,
        }
    }
}

/// The first dependency of `unit` that is known not to have built.
fn failed_dependency(unit: &Unit, report: &WorkspaceReport) -> Option<SmolStr> {
    unit.dependencies
        .iter()
        .find(|d| report.outcome(d).is_some_and(|o| !o.is_built()))
        .cloned()
}
