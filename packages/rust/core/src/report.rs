//! Report aggregator.
//!
//! Collects validation records per entity type across a whole run, counts the
//! entities checked, and carries input anomalies. Purely additive.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::EntityKind;
use crate::validate::ValidationRecord;

/// An input defect or an isolated per-course failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Anomaly {
    /// Item at `position` in the source list has no identifier.
    EmptyIdentifier { position: usize },
    /// More than one item declared the same identifier.
    DuplicateItem { identifier: String },
    /// Association with an endpoint that is not a known item.
    DanglingReference {
        origin: String,
        destination: String,
        missing: Vec<String>,
    },
    /// Neither the document nor any item declares a language.
    MissingLanguage,
    /// Hierarchical edge skipped while resolving the tree of `root`.
    DroppedEdge {
        root: String,
        parent: String,
        child: String,
    },
    /// A course that could not be converted.
    CourseFailed { course: String, error: String },
}

/// Aggregated validation results for one run.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    records: BTreeMap<EntityKind, Vec<ValidationRecord>>,
    checked: BTreeMap<EntityKind, usize>,
    anomalies: Vec<Anomaly>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one checked entity and keep its record when it failed.
    pub fn record(&mut self, kind: EntityKind, record: Option<ValidationRecord>) {
        *self.checked.entry(kind).or_default() += 1;
        if let Some(record) = record {
            self.push(record);
        }
    }

    /// Append a failed record without counting a check.
    pub fn push(&mut self, record: ValidationRecord) {
        self.records.entry(record.kind).or_default().push(record);
    }

    pub fn add_anomaly(&mut self, anomaly: Anomaly) {
        self.anomalies.push(anomaly);
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        for (kind, records) in other.records {
            self.records.entry(kind).or_default().extend(records);
        }
        for (kind, count) in other.checked {
            *self.checked.entry(kind).or_default() += count;
        }
        self.anomalies.extend(other.anomalies);
    }

    pub fn records(&self, kind: EntityKind) -> &[ValidationRecord] {
        self.records.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of failed records of one type.
    pub fn error_count(&self, kind: EntityKind) -> usize {
        self.records(kind).len()
    }

    /// Number of entities of one type that went through validation.
    pub fn checked_count(&self, kind: EntityKind) -> usize {
        self.checked.get(&kind).copied().unwrap_or(0)
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn has_errors(&self) -> bool {
        self.records.values().any(|records| !records.is_empty())
    }

    pub fn summary(&self) -> ReportSummary {
        let counts = |kind| (self.checked_count(kind), self.error_count(kind));
        let (framework_count, framework_error_count) = counts(EntityKind::CompetencyFramework);
        let (competency_count, competency_error_count) = counts(EntityKind::Competency);
        let (course_count, course_error_count) = counts(EntityKind::Course);
        let (learning_program_count, learning_program_error_count) =
            counts(EntityKind::LearningProgram);

        ReportSummary {
            framework_count,
            framework_error_count,
            competency_count,
            competency_error_count,
            course_count,
            course_error_count,
            learning_program_count,
            learning_program_error_count,
            anomaly_count: self.anomalies.len(),
        }
    }

    /// Serializable form, stamped with `generated_at`.
    pub fn document(&self, generated_at: DateTime<Utc>) -> ReportDocument<'_> {
        ReportDocument {
            generated_at,
            frameworks: self.records(EntityKind::CompetencyFramework),
            competencies: self.records(EntityKind::Competency),
            courses: self.records(EntityKind::Course),
            learning_programs: self.records(EntityKind::LearningProgram),
            anomalies: &self.anomalies,
            summary: self.summary(),
        }
    }
}

/// Per-type totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub framework_count: usize,
    pub framework_error_count: usize,
    pub competency_count: usize,
    pub competency_error_count: usize,
    pub course_count: usize,
    pub course_error_count: usize,
    pub learning_program_count: usize,
    pub learning_program_error_count: usize,
    pub anomaly_count: usize,
}

/// The validations file as written to disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument<'r> {
    pub generated_at: DateTime<Utc>,
    pub frameworks: &'r [ValidationRecord],
    pub competencies: &'r [ValidationRecord],
    pub courses: &'r [ValidationRecord],
    pub learning_programs: &'r [ValidationRecord],
    pub anomalies: &'r [Anomaly],
    pub summary: ReportSummary,
}
