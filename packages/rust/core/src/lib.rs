//! Conversion core for casegraph.
//!
//! Indexes a parsed CASE package, rebuilds each course's competency tree,
//! assembles CTDL/CTDL-ASN entities and validates them (see [`pipeline::build_graphs`]).

pub mod graph;
pub mod hierarchy;
pub mod identifier;
pub mod index;
pub mod pipeline;
pub mod report;
pub mod validate;

pub use graph::{CourseGraph, EntityKind, GraphEntity, LearningProgramEntity};
pub use pipeline::{BuildOptions, BuildOutput, ProgressReporter, SilentProgress, build_graphs};
pub use report::{Anomaly, ReportDocument, ReportSummary, ValidationReport};
pub use validate::{ValidationRecord, Validator};
