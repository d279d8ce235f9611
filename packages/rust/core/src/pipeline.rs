//! End-to-end conversion: package → index → hierarchy → graph → validation.

use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use casegraph_shared::{CaseGraphError, CasePackage, ConvertConfig, Item, ItemKind, Result};

use crate::graph::{
    self, AssembleContext, CourseGraph, EntityKind, LearningProgramEntity,
};
use crate::hierarchy;
use crate::identifier::{extract_ctid, normalize_references};
use crate::index::PackageIndex;
use crate::report::{Anomaly, ValidationReport};
use crate::validate::Validator;

/// Run options with organization references already resolved to registry URIs.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Registry base URI, always ending in `/`.
    pub registry_base: String,
    pub publisher: Vec<String>,
    pub owned_by: Vec<String>,
    /// `None` unless offerers were requested.
    pub offered_by: Option<Vec<String>>,
}

impl BuildOptions {
    /// Build from merged config/flags. CTIDs become registry URIs.
    pub fn from_config(config: &ConvertConfig) -> Result<Self> {
        config.validate()?;

        let registry_base = if config.registry_base.ends_with('/') {
            config.registry_base.clone()
        } else {
            format!("{}/", config.registry_base)
        };

        let publisher = normalize_references(&config.publisher, &registry_base);
        let owned_by = normalize_references(&config.owned_by, &registry_base);
        let offered_by = config
            .offered_by
            .as_deref()
            .map(|refs| normalize_references(refs, &registry_base));

        if publisher.is_empty() {
            warn!("no publisher configured; frameworks will fail validation");
        }

        Ok(Self {
            registry_base,
            publisher,
            owned_by,
            offered_by,
        })
    }

    /// CTID of the first publisher, used as the publishing organization.
    pub fn publisher_ctid(&self) -> Option<String> {
        self.publisher.first().map(|uri| extract_ctid(uri))
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each course is converted (or failed).
    fn course_built(&self, name: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, output: &BuildOutput);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn course_built(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _output: &BuildOutput) {}
}

/// Everything one run produced.
#[derive(Debug)]
pub struct BuildOutput {
    /// One entry per successfully converted course, in source order.
    pub courses: Vec<CourseGraph>,
    pub learning_programs: Vec<LearningProgramEntity>,
    pub report: ValidationReport,
}

/// Convert a parsed package into course/framework graphs and learning programs.
///
/// 1. Index items and associations
/// 2. For each course: resolve its tree, assemble, validate
/// 3. For each pathway: assemble a learning program, validate
///
/// A failing course is logged, reported as an anomaly and skipped. Only
/// contract violations abort the run.
#[instrument(skip_all, fields(items = package.items.len(), associations = package.associations.len()))]
pub fn build_graphs(
    package: &CasePackage,
    options: &BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<BuildOutput> {
    let start = Instant::now();
    let mut report = ValidationReport::new();

    // --- Phase 1: Index ---
    progress.phase("Indexing package");
    let index = PackageIndex::build(package);
    for anomaly in index.anomalies() {
        report.add_anomaly(anomaly.clone());
    }
    if let Err(e) = index.check_references() {
        warn!(error = %e, "continuing without dangling associations");
    }
    if !has_any_language(package, &index) {
        warn!("package declares no language; text will not be language-tagged");
        report.add_anomaly(Anomaly::MissingLanguage);
    }

    let ctx = AssembleContext {
        document: &package.document,
        registry_base: &options.registry_base,
        publisher: &options.publisher,
        owned_by: &options.owned_by,
        offered_by: options.offered_by.as_deref(),
    };
    let validator = Validator::new(&options.registry_base);

    // --- Phase 2: Courses ---
    progress.phase("Building course graphs");
    let courses: Vec<&Item> = index.items_of_kind(ItemKind::Course).collect();
    let total = courses.len();
    let mut graphs = Vec::with_capacity(total);

    for (i, course) in courses.iter().enumerate() {
        let name = course.label().unwrap_or(course.identifier.as_str());
        match build_course(&index, course, &ctx, &validator) {
            Ok((course_graph, course_report)) => {
                graphs.push(course_graph);
                report.merge(course_report);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(course = %course.identifier, error = %e, "course failed, skipping");
                report.add_anomaly(Anomaly::CourseFailed {
                    course: course.identifier.clone(),
                    error: e.to_string(),
                });
            }
        }
        progress.course_built(name, i + 1, total);
    }

    // --- Phase 3: Learning programs ---
    progress.phase("Building learning programs");
    let mut learning_programs = Vec::new();
    for pathway in index.items_of_kind(ItemKind::Pathway) {
        let related = hierarchy::related_courses(&index, &pathway.identifier);
        let program = graph::assemble_learning_program(pathway, &related, &ctx);
        report.record(EntityKind::LearningProgram, validator.validate(&program));
        debug!(pathway = %pathway.identifier, courses = related.len(), "learning program built");
        learning_programs.push(program);
    }

    let output = BuildOutput {
        courses: graphs,
        learning_programs,
        report,
    };

    info!(
        courses = output.courses.len(),
        learning_programs = output.learning_programs.len(),
        failed_courses = total - output.courses.len(),
        has_errors = output.report.has_errors(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "conversion complete"
    );

    progress.done(&output);
    Ok(output)
}

/// Resolve, assemble and validate one course into its own report.
fn build_course(
    index: &PackageIndex<'_>,
    course: &Item,
    ctx: &AssembleContext<'_>,
    validator: &Validator,
) -> Result<(CourseGraph, ValidationReport)> {
    let tree = hierarchy::resolve(index, &course.identifier)?;
    let mut report = ValidationReport::new();

    for edge in tree.dropped_edges() {
        report.add_anomaly(Anomaly::DroppedEdge {
            root: course.identifier.clone(),
            parent: edge.parent.clone(),
            child: edge.child.clone(),
        });
    }

    let course_graph = graph::assemble(&tree, ctx)?;
    if course_graph.framework.has_top_child.is_empty() {
        debug!(course = %course.identifier, "course has no competencies");
    }

    report.record(EntityKind::Course, validator.validate(&course_graph.course));
    report.record(
        EntityKind::CompetencyFramework,
        validator.validate(&course_graph.framework),
    );
    for competency in &course_graph.competencies {
        report.record(EntityKind::Competency, validator.validate(competency));
    }

    Ok((course_graph, report))
}

fn has_any_language(package: &CasePackage, index: &PackageIndex<'_>) -> bool {
    let declared = |lang: Option<&str>| graph::normalize_language(lang).is_some();
    declared(package.document.language.as_deref())
        || index.items().any(|item| declared(item.language.as_deref()))
}

/// Fail when no course could be converted from a package that has courses.
pub fn ensure_some_output(output: &BuildOutput) -> Result<()> {
    let failed = output
        .report
        .anomalies()
        .iter()
        .filter(|a| matches!(a, Anomaly::CourseFailed { .. }))
        .count();
    if output.courses.is_empty() && failed > 0 {
        return Err(CaseGraphError::validation(format!(
            "all {failed} course(s) failed to convert"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
