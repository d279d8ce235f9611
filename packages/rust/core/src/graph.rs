//! Graph assembler.
//!
//! Turns a resolved [`Hierarchy`] into the linked-data entities published to
//! the registry: one course (CTDL), one synthesized competency framework and
//! its competencies (CTDL-ASN). Pathway items become CTDL learning programs.
//!
//! Field names are the schema-qualified JSON-LD terms; everything here is
//! pure, nothing touches the filesystem.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument};

use casegraph_shared::{CaseDocument, Item, Result};

use crate::hierarchy::{Hierarchy, HierarchyNode};
use crate::identifier::{checked_ctid, ctid_for, derive_framework_ctid, registry_uri};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Text that is either language-tagged (`{"en": "…"}`) or plain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LangString {
    Plain(String),
    Tagged(BTreeMap<String, String>),
}

impl LangString {
    /// Tag `text` with `lang` when a language is known.
    pub fn new(lang: Option<&str>, text: impl Into<String>) -> Self {
        match lang {
            Some(lang) => Self::Tagged(BTreeMap::from([(lang.to_string(), text.into())])),
            None => Self::Plain(text.into()),
        }
    }

    /// The text, whichever form it is in.
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Tagged(map) => map.values().next().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// Entity types that are validated and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    #[serde(rename = "ceasn:CompetencyFramework")]
    CompetencyFramework,
    #[serde(rename = "ceasn:Competency")]
    Competency,
    #[serde(rename = "ceterms:Course")]
    Course,
    #[serde(rename = "ceterms:LearningProgram")]
    LearningProgram,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        Self::CompetencyFramework,
        Self::Competency,
        Self::Course,
        Self::LearningProgram,
    ];

    /// The `@type` value.
    pub fn schema_type(self) -> &'static str {
        match self {
            Self::CompetencyFramework => "ceasn:CompetencyFramework",
            Self::Competency => "ceasn:Competency",
            Self::Course => "ceterms:Course",
            Self::LearningProgram => "ceterms:LearningProgram",
        }
    }
}

/// Anything the validator can check.
pub trait GraphEntity: Serialize {
    /// The `@id` (registry URI).
    fn entity_id(&self) -> &str;
    fn kind(&self) -> EntityKind;
}

/// `ceterms:CredentialAlignmentObject`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialAlignmentObject {
    #[serde(rename = "@type")]
    pub type_name: &'static str,
    #[serde(rename = "ceterms:framework", skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(rename = "ceterms:targetNode")]
    pub target_node: String,
    #[serde(rename = "ceterms:frameworkName", skip_serializing_if = "Option::is_none")]
    pub framework_name: Option<LangString>,
    #[serde(rename = "ceterms:targetNodeName", skip_serializing_if = "Option::is_none")]
    pub target_node_name: Option<LangString>,
    #[serde(
        rename = "ceterms:targetNodeDescription",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_node_description: Option<LangString>,
}

impl CredentialAlignmentObject {
    /// Life cycle status "Active", attached to every course and program.
    pub fn active_life_cycle() -> Self {
        let en = Some("en-US");
        Self {
            type_name: "ceterms:CredentialAlignmentObject",
            framework: Some("https://credreg.net/ctdl/terms/LifeCycleStatus".into()),
            target_node: "lifeCycle:Active".into(),
            framework_name: Some(LangString::new(en, "Life Cycle Status")),
            target_node_name: Some(LangString::new(en, "Active")),
            target_node_description: Some(LangString::new(
                en,
                "Resource is active, current, ongoing, offered, operational, or available.",
            )),
        }
    }
}

/// `ceterms:ConditionProfile`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionProfile {
    #[serde(rename = "@type")]
    pub type_name: &'static str,
    #[serde(rename = "ceterms:name")]
    pub name: LangString,
    #[serde(rename = "ceterms:description")]
    pub description: LangString,
    #[serde(rename = "ceterms:targetLearningOpportunity")]
    pub target_learning_opportunity: Vec<String>,
}

impl ConditionProfile {
    /// "Is Preparation For" profile pointing at `targets`.
    pub fn preparation_for(targets: Vec<String>) -> Self {
        let en = Some("en-US");
        Self {
            type_name: "ceterms:ConditionProfile",
            name: LangString::new(en, "Is Preparation For"),
            description: LangString::new(
                en,
                "Students who complete this CTAE pathway will be prepared to earn the following courses of value.",
            ),
            target_learning_opportunity: targets,
        }
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// `ceasn:CompetencyFramework`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkEntity {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: EntityKind,
    #[serde(rename = "ceterms:ctid")]
    pub ctid: String,
    #[serde(rename = "ceasn:name", skip_serializing_if = "Option::is_none")]
    pub name: Option<LangString>,
    #[serde(rename = "ceasn:description", skip_serializing_if = "Option::is_none")]
    pub description: Option<LangString>,
    #[serde(rename = "ceasn:inLanguage", skip_serializing_if = "Vec::is_empty")]
    pub in_language: Vec<String>,
    #[serde(rename = "ceterms:subjectWebpage", skip_serializing_if = "Option::is_none")]
    pub subject_webpage: Option<String>,
    #[serde(rename = "ceasn:publisherName", skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<LangString>,
    #[serde(rename = "ceasn:publisher", skip_serializing_if = "Vec::is_empty")]
    pub publisher: Vec<String>,
    #[serde(rename = "ceasn:hasTopChild")]
    pub has_top_child: Vec<String>,
}

/// `ceasn:Competency`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetencyEntity {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: EntityKind,
    #[serde(rename = "ceterms:ctid")]
    pub ctid: String,
    #[serde(rename = "ceasn:inLanguage", skip_serializing_if = "Vec::is_empty")]
    pub in_language: Vec<String>,
    #[serde(rename = "ceasn:competencyText", skip_serializing_if = "Option::is_none")]
    pub competency_text: Option<LangString>,
    #[serde(rename = "ceasn:competencyLabel", skip_serializing_if = "Option::is_none")]
    pub competency_label: Option<LangString>,
    #[serde(rename = "ceasn:competencyCategory", skip_serializing_if = "Option::is_none")]
    pub competency_category: Option<LangString>,
    #[serde(rename = "ceasn:codedNotation", skip_serializing_if = "Option::is_none")]
    pub coded_notation: Option<String>,
    #[serde(rename = "ceasn:listID", skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(rename = "ceasn:broadAlignment", skip_serializing_if = "Vec::is_empty")]
    pub broad_alignment: Vec<String>,
    #[serde(rename = "ceasn:isPartOf", skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<String>,
    #[serde(rename = "ceasn:hasChild", skip_serializing_if = "Vec::is_empty")]
    pub has_child: Vec<String>,
    #[serde(rename = "ceasn:isChildOf", skip_serializing_if = "Vec::is_empty")]
    pub is_child_of: Vec<String>,
}

/// `ceterms:Course`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseEntity {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: EntityKind,
    #[serde(rename = "ceterms:ctid")]
    pub ctid: String,
    #[serde(rename = "ceterms:name", skip_serializing_if = "Option::is_none")]
    pub name: Option<LangString>,
    #[serde(rename = "ceterms:description", skip_serializing_if = "Option::is_none")]
    pub description: Option<LangString>,
    #[serde(rename = "ceterms:inLanguage", skip_serializing_if = "Vec::is_empty")]
    pub in_language: Vec<String>,
    #[serde(rename = "ceterms:codedNotation", skip_serializing_if = "Option::is_none")]
    pub coded_notation: Option<String>,
    #[serde(rename = "ceterms:subjectWebpage", skip_serializing_if = "Option::is_none")]
    pub subject_webpage: Option<String>,
    #[serde(
        rename = "ceterms:lifeCycleStatusType",
        skip_serializing_if = "Option::is_none"
    )]
    pub life_cycle_status_type: Option<CredentialAlignmentObject>,
    #[serde(rename = "ceterms:ownedBy", skip_serializing_if = "Vec::is_empty")]
    pub owned_by: Vec<String>,
    #[serde(rename = "ceterms:offeredBy", skip_serializing_if = "Vec::is_empty")]
    pub offered_by: Vec<String>,
    #[serde(rename = "ceterms:teaches", skip_serializing_if = "Vec::is_empty")]
    pub teaches: Vec<CredentialAlignmentObject>,
}

/// `ceterms:LearningProgram`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningProgramEntity {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: EntityKind,
    #[serde(rename = "ceterms:ctid")]
    pub ctid: String,
    #[serde(rename = "ceterms:name", skip_serializing_if = "Option::is_none")]
    pub name: Option<LangString>,
    #[serde(rename = "ceterms:description", skip_serializing_if = "Option::is_none")]
    pub description: Option<LangString>,
    #[serde(rename = "ceterms:inLanguage", skip_serializing_if = "Vec::is_empty")]
    pub in_language: Vec<String>,
    #[serde(rename = "ceterms:subjectWebpage", skip_serializing_if = "Option::is_none")]
    pub subject_webpage: Option<String>,
    #[serde(
        rename = "ceterms:lifeCycleStatusType",
        skip_serializing_if = "Option::is_none"
    )]
    pub life_cycle_status_type: Option<CredentialAlignmentObject>,
    #[serde(rename = "ceterms:ownedBy", skip_serializing_if = "Vec::is_empty")]
    pub owned_by: Vec<String>,
    #[serde(rename = "ceterms:offeredBy", skip_serializing_if = "Vec::is_empty")]
    pub offered_by: Vec<String>,
    #[serde(rename = "ceterms:isPreparationFor", skip_serializing_if = "Vec::is_empty")]
    pub is_preparation_for: Vec<ConditionProfile>,
}

macro_rules! graph_entity {
    ($($ty:ty),+ $(,)?) => {
        $(impl GraphEntity for $ty {
            fn entity_id(&self) -> &str {
                &self.id
            }
            fn kind(&self) -> EntityKind {
                self.kind
            }
        })+
    };
}

graph_entity!(
    FrameworkEntity,
    CompetencyEntity,
    CourseEntity,
    LearningProgramEntity
);

/// Everything assembled for one course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseGraph {
    pub course: CourseEntity,
    pub framework: FrameworkEntity,
    /// Breadth-first, in the order of the resolved tree.
    pub competencies: Vec<CompetencyEntity>,
}

impl CourseGraph {
    /// Find a competency by CTID.
    pub fn competency(&self, ctid: &str) -> Option<&CompetencyEntity> {
        self.competencies.iter().find(|c| c.ctid == ctid)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Inputs shared by every assembly in one run.
#[derive(Debug, Clone, Copy)]
pub struct AssembleContext<'a> {
    pub document: &'a CaseDocument,
    pub registry_base: &'a str,
    /// Registry URIs of the framework publishers.
    pub publisher: &'a [String],
    /// Registry URIs of the owning organizations.
    pub owned_by: &'a [String],
    /// Registry URIs of the offering organizations, when opted in.
    pub offered_by: Option<&'a [String]>,
}

impl AssembleContext<'_> {
    fn language_of(&self, item: &Item) -> Option<String> {
        normalize_language(item.language.as_deref())
            .or_else(|| normalize_language(self.document.language.as_deref()))
    }

    fn offerers(&self) -> Vec<String> {
        self.offered_by.map(<[String]>::to_vec).unwrap_or_default()
    }
}

/// Build the course, its framework and the framework's competencies.
#[instrument(skip_all, fields(course = %tree.root().identifier, nodes = tree.len()))]
pub fn assemble(tree: &Hierarchy<'_>, ctx: &AssembleContext<'_>) -> Result<CourseGraph> {
    let course = tree.root();
    let framework_ctid = derive_framework_ctid(&course.identifier)?;
    let framework_id = registry_uri(ctx.registry_base, &framework_ctid);
    let course_ctid = checked_ctid(&course.identifier)?;

    let mut competencies = tree
        .nodes()
        .iter()
        .map(|node| build_competency(node, &framework_id, ctx))
        .collect::<Result<Vec<_>>>()?;

    for (parent, node) in tree.nodes().iter().enumerate() {
        for &child in &node.children {
            link(&mut competencies, parent, child);
        }
    }

    let lang = ctx.language_of(course);
    let lang = lang.as_deref();
    let name = course.label().map(str::to_string);

    let framework = FrameworkEntity {
        id: framework_id,
        kind: EntityKind::CompetencyFramework,
        ctid: framework_ctid,
        name: name.as_deref().map(|n| LangString::new(lang, n)),
        description: explicit_description(course)
            .or_else(|| course.notes.as_deref().and_then(notes_description))
            .or_else(|| text(ctx.document.description.as_deref()))
            .map(|d| LangString::new(lang, d)),
        in_language: lang.map(str::to_string).into_iter().collect(),
        subject_webpage: text(ctx.document.source_uri.as_deref()),
        publisher_name: text(ctx.document.publisher.as_deref()).map(|p| LangString::new(lang, p)),
        publisher: ctx.publisher.to_vec(),
        has_top_child: tree
            .top_indices()
            .iter()
            .map(|&idx| competencies[idx].id.clone())
            .collect(),
    };

    let teaches = tree
        .top_indices()
        .iter()
        .map(|&idx| alignment(&competencies[idx], &framework))
        .collect();

    let course = CourseEntity {
        id: registry_uri(ctx.registry_base, &course_ctid),
        kind: EntityKind::Course,
        ctid: course_ctid,
        name: name.as_deref().map(|n| LangString::new(lang, n)),
        description: explicit_description(course)
            .or_else(|| course.notes.as_deref().and_then(notes_description))
            .map(|d| LangString::new(lang, d)),
        in_language: lang.map(str::to_string).into_iter().collect(),
        coded_notation: text(course.human_coding_scheme.as_deref()),
        subject_webpage: text(course.uri.as_deref()),
        life_cycle_status_type: Some(CredentialAlignmentObject::active_life_cycle()),
        owned_by: ctx.owned_by.to_vec(),
        offered_by: ctx.offerers(),
        teaches,
    };

    debug!(
        framework = %framework.ctid,
        competencies = competencies.len(),
        top = framework.has_top_child.len(),
        "course graph assembled"
    );

    Ok(CourseGraph {
        course,
        framework,
        competencies,
    })
}

/// Build a learning program for a pathway item.
#[instrument(skip_all, fields(pathway = %pathway.identifier, courses = courses.len()))]
pub fn assemble_learning_program(
    pathway: &Item,
    courses: &[&Item],
    ctx: &AssembleContext<'_>,
) -> LearningProgramEntity {
    let lang = ctx.language_of(pathway);
    let lang = lang.as_deref();
    let ctid = ctid_for(&pathway.identifier);

    let targets: Vec<String> = courses
        .iter()
        .map(|course| registry_uri(ctx.registry_base, &course.identifier))
        .collect();

    let is_preparation_for = if targets.is_empty() {
        Vec::new()
    } else {
        vec![ConditionProfile::preparation_for(targets)]
    };

    LearningProgramEntity {
        id: registry_uri(ctx.registry_base, &ctid),
        kind: EntityKind::LearningProgram,
        ctid,
        name: pathway.label().map(|n| LangString::new(lang, n)),
        description: text(pathway.notes.as_deref())
            .or_else(|| text(pathway.full_statement.as_deref()))
            .map(|d| LangString::new(lang, d)),
        in_language: lang.map(str::to_string).into_iter().collect(),
        subject_webpage: text(pathway.uri.as_deref()),
        life_cycle_status_type: Some(CredentialAlignmentObject::active_life_cycle()),
        owned_by: ctx.owned_by.to_vec(),
        offered_by: ctx.offerers(),
        is_preparation_for,
    }
}

/// Write both sides of a parent/child edge.
fn link(competencies: &mut [CompetencyEntity], parent: usize, child: usize) {
    let parent_id = competencies[parent].id.clone();
    let child_id = competencies[child].id.clone();
    competencies[parent].has_child.push(child_id);
    competencies[child].is_child_of.push(parent_id);
}

fn build_competency(
    node: &HierarchyNode<'_>,
    framework_id: &str,
    ctx: &AssembleContext<'_>,
) -> Result<CompetencyEntity> {
    let item = node.item;
    let lang = ctx.language_of(item);
    let lang = lang.as_deref();
    let ctid = checked_ctid(&item.identifier)?;
    let tagged = |value: Option<&str>| text(value).map(|t| LangString::new(lang, t));

    Ok(CompetencyEntity {
        id: registry_uri(ctx.registry_base, &ctid),
        kind: EntityKind::Competency,
        ctid,
        in_language: lang.map(str::to_string).into_iter().collect(),
        competency_text: tagged(item.full_statement.as_deref()),
        competency_label: tagged(item.abbreviated_statement.as_deref()),
        competency_category: tagged(item.type_label.as_deref()),
        coded_notation: text(item.human_coding_scheme.as_deref()),
        list_id: text(item.list_enum.as_deref()).or_else(|| text(node.sequence_number)),
        broad_alignment: text(item.uri.as_deref()).into_iter().collect(),
        is_part_of: Some(framework_id.to_string()),
        has_child: Vec::new(),
        is_child_of: Vec::new(),
    })
}

fn alignment(competency: &CompetencyEntity, framework: &FrameworkEntity) -> CredentialAlignmentObject {
    CredentialAlignmentObject {
        type_name: "ceterms:CredentialAlignmentObject",
        framework: Some(framework.id.clone()),
        target_node: competency.id.clone(),
        framework_name: framework.name.clone(),
        target_node_name: competency
            .competency_text
            .clone()
            .or_else(|| competency.competency_label.clone()),
        target_node_description: None,
    }
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Language tag as published, except the ISO 639-2 `eng` which becomes `en`.
pub fn normalize_language(raw: Option<&str>) -> Option<String> {
    let lang = raw?.trim();
    if lang.is_empty() {
        None
    } else if lang.eq_ignore_ascii_case("eng") {
        Some("en".into())
    } else {
        Some(lang.to_string())
    }
}

fn text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The full statement, when it says more than the name.
fn explicit_description(item: &Item) -> Option<String> {
    let full = text(item.full_statement.as_deref())?;
    if item.label() == Some(full.as_str()) {
        None
    } else {
        Some(full)
    }
}

/// `Description:` or `Course Description:` label at the start of a line.
static DESCRIPTION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:course\s+)?description\s*:\s*(.*)$").expect("description label regex")
});

/// Any other `Label:` line, which ends the description section.
static SECTION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-Za-z][A-Za-z /&()-]{0,40}:\s*").expect("section label regex")
});

/// Description taken from free-text notes: the `Description:` section when the
/// notes are labelled, the whole notes otherwise.
pub fn notes_description(notes: &str) -> Option<String> {
    let mut lines = notes.lines();
    let mut section: Option<Vec<&str>> = None;

    while let Some(line) = lines.next() {
        if let Some(caps) = DESCRIPTION_LABEL_RE.captures(line) {
            let mut parts = vec![caps.get(1).map_or("", |m| m.as_str()).trim()];
            for rest in lines.by_ref() {
                if SECTION_LABEL_RE.is_match(rest) {
                    break;
                }
                parts.push(rest.trim());
            }
            section = Some(parts);
            break;
        }
    }

    let description = match section {
        Some(parts) => parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        None => notes.trim().to_string(),
    };

    (!description.is_empty()).then_some(description)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy;
    use crate::index::PackageIndex;
    use casegraph_shared::{Association, CaseGraphError, CasePackage, ItemKind, RelationKind};

    const BASE: &str = "https://credentialengineregistry.org/resources/";

    fn item(id: &str, kind: ItemKind, statement: &str) -> Item {
        let mut item = Item::new(id, kind);
        item.full_statement = Some(statement.into());
        item
    }

    fn scenario() -> CasePackage {
        let mut course = item("C1", ItemKind::Course, "An introduction to cell biology.");
        course.abbreviated_statement = Some("Biology I".into());
        course.human_coding_scheme = Some("BIO-101".into());

        CasePackage {
            document: CaseDocument {
                language: Some("en".into()),
                source_uri: Some("https://case.example.org/doc/1".into()),
                publisher: Some("State Board".into()),
                ..CaseDocument::default()
            },
            items: vec![
                course,
                item("K1", ItemKind::Competency, "Describe cell structure"),
                item("K2", ItemKind::Competency, "Explain osmosis"),
                item("K3", ItemKind::Competency, "Identify organelles"),
            ],
            associations: vec![
                Association::new("K1", "C1", RelationKind::IsChildOf),
                Association::new("K2", "C1", RelationKind::IsChildOf),
                Association::new("K3", "K1", RelationKind::IsChildOf),
            ],
        }
    }

    fn publishers() -> Vec<String> {
        vec![format!("{BASE}ce-7a1c0f9e-2b1d-4f0e-8f53-3f2d7e6b9a10")]
    }

    fn assemble_scenario(pkg: &CasePackage, offered: Option<&[String]>) -> CourseGraph {
        let index = PackageIndex::build(pkg);
        let tree = hierarchy::resolve(&index, "C1").unwrap();
        let publisher = publishers();
        let ctx = AssembleContext {
            document: &pkg.document,
            registry_base: BASE,
            publisher: &publisher,
            owned_by: &publisher,
            offered_by: offered,
        };
        assemble(&tree, &ctx).unwrap()
    }

    fn uri(id: &str) -> String {
        format!("{BASE}ce-{id}")
    }

    #[test]
    fn end_to_end_scenario() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);

        assert_eq!(graph.framework.has_top_child, [uri("K1"), uri("K2")]);

        let k1 = graph.competency("ce-K1").unwrap();
        assert_eq!(k1.has_child, [uri("K3")]);
        assert_eq!(k1.is_part_of.as_deref(), Some(graph.framework.id.as_str()));
        assert!(k1.is_child_of.is_empty());

        let k3 = graph.competency("ce-K3").unwrap();
        assert_eq!(k3.is_child_of, [uri("K1")]);

        let targets: Vec<_> = graph.course.teaches.iter().map(|a| a.target_node.as_str()).collect();
        assert_eq!(targets, [uri("K1"), uri("K2")]);
    }

    #[test]
    fn every_competency_is_part_of_the_framework() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);
        assert_eq!(graph.competencies.len(), 3);
        for competency in &graph.competencies {
            assert_eq!(competency.is_part_of.as_ref(), Some(&graph.framework.id));
            assert!(competency.is_child_of.len() <= 1);
        }
    }

    #[test]
    fn child_links_are_reciprocal() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);
        let by_id = |id: &str| graph.competencies.iter().find(|c| c.id == id).unwrap();

        for parent in &graph.competencies {
            for child in &parent.has_child {
                assert!(by_id(child).is_child_of.contains(&parent.id));
            }
            for up in &parent.is_child_of {
                assert!(by_id(up).has_child.contains(&parent.id));
            }
        }
    }

    #[test]
    fn alignments_carry_framework_reference_and_names() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);
        let first = &graph.course.teaches[0];

        assert_eq!(first.framework.as_deref(), Some(graph.framework.id.as_str()));
        assert_eq!(first.framework_name, graph.framework.name);
        assert_eq!(
            first.target_node_name.as_ref().map(LangString::text),
            Some("Describe cell structure")
        );
    }

    #[test]
    fn course_fields_are_copied_from_item() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);
        let course = &graph.course;

        assert_eq!(course.id, uri("C1"));
        assert_eq!(course.name, Some(LangString::new(Some("en"), "Biology I")));
        assert_eq!(
            course.description.as_ref().map(LangString::text),
            Some("An introduction to cell biology.")
        );
        assert_eq!(course.coded_notation.as_deref(), Some("BIO-101"));
        assert_eq!(course.in_language, ["en"]);
        assert!(course.life_cycle_status_type.is_some());
        assert_eq!(course.owned_by, publishers());
        assert!(course.offered_by.is_empty());
    }

    #[test]
    fn offered_by_only_when_opted_in() {
        let pkg = scenario();
        let offerers = vec![uri("7a1c0f9e-2b1d-4f0e-8f53-3f2d7e6b9a11")];
        let graph = assemble_scenario(&pkg, Some(offerers.as_slice()));
        assert_eq!(graph.course.offered_by, offerers);
    }

    #[test]
    fn framework_is_derived_from_course_and_document() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);
        let fw = &graph.framework;

        assert_eq!(fw.ctid, derive_framework_ctid("C1").unwrap());
        assert_eq!(fw.id, registry_uri(BASE, &fw.ctid));
        assert_eq!(fw.name.as_ref().map(LangString::text), Some("Biology I"));
        assert_eq!(fw.in_language, ["en"]);
        assert_eq!(fw.subject_webpage.as_deref(), Some("https://case.example.org/doc/1"));
        assert_eq!(fw.publisher_name.as_ref().map(LangString::text), Some("State Board"));
        assert_eq!(fw.publisher, publishers());
    }

    #[test]
    fn framework_description_falls_back_to_notes_section() {
        let mut pkg = scenario();
        let course = &mut pkg.items[0];
        course.full_statement = None;
        course.notes = Some(
            "Grade Levels: 9-12\nCourse Description: Cells and\nsystems.\nPrerequisites: none".into(),
        );
        let graph = assemble_scenario(&pkg, None);

        assert_eq!(
            graph.framework.description.as_ref().map(LangString::text),
            Some("Cells and systems.")
        );
    }

    #[test]
    fn framework_description_falls_back_to_document_description() {
        let mut pkg = scenario();
        pkg.items[0].full_statement = None;
        pkg.document.description = Some("Science standards".into());
        let graph = assemble_scenario(&pkg, None);

        assert_eq!(
            graph.framework.description.as_ref().map(LangString::text),
            Some("Science standards")
        );
        assert!(graph.course.description.is_none());
    }

    #[test]
    fn empty_tree_yields_empty_top_children_and_no_teaches() {
        let mut pkg = scenario();
        pkg.associations.clear();
        let graph = assemble_scenario(&pkg, None);

        assert!(graph.framework.has_top_child.is_empty());
        assert!(graph.course.teaches.is_empty());
        assert!(graph.competencies.is_empty());

        let json = serde_json::to_value(&graph.framework).unwrap();
        assert_eq!(json["ceasn:hasTopChild"], serde_json::json!([]));
        let json = serde_json::to_value(&graph.course).unwrap();
        assert!(json.get("ceterms:teaches").is_none());
    }

    #[test]
    fn unusable_competency_identifier_fails_the_course() {
        let mut pkg = scenario();
        pkg.items[3].identifier = "K3/a".into();
        pkg.associations[2].origin = "K3/a".into();
        let index = PackageIndex::build(&pkg);
        let tree = hierarchy::resolve(&index, "C1").unwrap();
        let publisher = publishers();
        let ctx = AssembleContext {
            document: &pkg.document,
            registry_base: BASE,
            publisher: &publisher,
            owned_by: &publisher,
            offered_by: None,
        };

        let err = assemble(&tree, &ctx).unwrap_err();
        assert!(matches!(err, CaseGraphError::MalformedInput { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn serializes_with_schema_qualified_names() {
        let pkg = scenario();
        let graph = assemble_scenario(&pkg, None);
        let json = serde_json::to_value(&graph.competencies[0]).unwrap();

        assert_eq!(json["@type"], "ceasn:Competency");
        assert_eq!(json["ceasn:competencyText"]["en"], "Describe cell structure");
        assert_eq!(json["ceasn:hasChild"][0], uri("K3"));
        assert!(json.get("ceasn:isChildOf").is_none());
    }

    #[test]
    fn plain_text_without_document_language() {
        let mut pkg = scenario();
        pkg.document.language = None;
        let graph = assemble_scenario(&pkg, None);

        assert_eq!(graph.course.name, Some(LangString::Plain("Biology I".into())));
        assert!(graph.course.in_language.is_empty());
    }

    #[test]
    fn learning_program_targets_related_courses() {
        let mut pathway = item("P1", ItemKind::Pathway, "Health Science pathway");
        pathway.notes = Some("Prepares students for clinical careers.".into());
        let c1 = Item::new("C1", ItemKind::Course);
        let c2 = Item::new("C2", ItemKind::Course);
        let document = CaseDocument {
            language: Some("eng".into()),
            ..CaseDocument::default()
        };
        let owners = publishers();
        let ctx = AssembleContext {
            document: &document,
            registry_base: BASE,
            publisher: &owners,
            owned_by: &owners,
            offered_by: None,
        };

        let program = assemble_learning_program(&pathway, &[&c1, &c2], &ctx);

        assert_eq!(program.id, uri("P1"));
        assert_eq!(program.in_language, ["en"]);
        assert_eq!(
            program.description.as_ref().map(LangString::text),
            Some("Prepares students for clinical careers.")
        );
        assert_eq!(
            program.is_preparation_for[0].target_learning_opportunity,
            [uri("C1"), uri("C2")]
        );

        assert_eq!(
            program.is_preparation_for[0].description.text(),
            "Students who complete this CTAE pathway will be prepared to earn the following courses of value."
        );

        let lonely = assemble_learning_program(&pathway, &[], &ctx);
        assert!(lonely.is_preparation_for.is_empty());
    }

    #[test]
    fn notes_description_variants() {
        assert_eq!(
            notes_description("Just a plain note."),
            Some("Just a plain note.".into())
        );
        assert_eq!(
            notes_description("description: first line\nsecond line"),
            Some("first line second line".into())
        );
        assert_eq!(notes_description("   "), None);
    }

    #[test]
    fn language_normalization() {
        assert_eq!(normalize_language(Some("ENG")), Some("en".into()));
        assert_eq!(normalize_language(Some("en-US")), Some("en-US".into()));
        assert_eq!(normalize_language(Some("  ")), None);
        assert_eq!(normalize_language(None), None);
    }
}
