//! JSON-LD envelopes for each output file kind.

use serde::Serialize;

use casegraph_core::graph::{
    CompetencyEntity, CourseEntity, CourseGraph, FrameworkEntity, LearningProgramEntity,
};
use casegraph_shared::{CTDL_CONTEXT, CTDLASN_CONTEXT};

/// `course_<ctid>.json`.
#[derive(Debug, Serialize)]
pub struct CourseEnvelope<'a> {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@graph")]
    pub graph: [&'a CourseEntity; 1],
}

/// Node in a framework graph: the framework first, then its competencies.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FrameworkNode<'a> {
    Framework(&'a FrameworkEntity),
    Competency(&'a CompetencyEntity),
}

/// `framework_<courseCtid>.json`.
#[derive(Debug, Serialize)]
pub struct FrameworkEnvelope<'a> {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: &'a str,
    #[serde(rename = "@graph")]
    pub graph: Vec<FrameworkNode<'a>>,
}

/// Graph part of a learning program publish request.
#[derive(Debug, Serialize)]
pub struct GraphInput<'a> {
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "@id")]
    pub id: &'a str,
    #[serde(rename = "@graph")]
    pub graph: [&'a LearningProgramEntity; 1],
}

/// `learningprogram_<ctid>.json`: a registry publish request.
#[derive(Debug, Serialize)]
pub struct PublishEnvelope<'a> {
    #[serde(
        rename = "PublishForOrganizationIdentifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub publish_for: Option<&'a str>,
    #[serde(rename = "GraphInput")]
    pub graph_input: GraphInput<'a>,
}

pub fn course(graph: &CourseGraph) -> CourseEnvelope<'_> {
    CourseEnvelope {
        context: CTDL_CONTEXT,
        graph: [&graph.course],
    }
}

pub fn framework(graph: &CourseGraph) -> FrameworkEnvelope<'_> {
    let nodes = std::iter::once(FrameworkNode::Framework(&graph.framework))
        .chain(graph.competencies.iter().map(FrameworkNode::Competency))
        .collect();

    FrameworkEnvelope {
        context: CTDLASN_CONTEXT,
        id: &graph.framework.id,
        graph: nodes,
    }
}

pub fn learning_program<'a>(
    program: &'a LearningProgramEntity,
    publisher_ctid: Option<&'a str>,
) -> PublishEnvelope<'a> {
    PublishEnvelope {
        publish_for: publisher_ctid,
        graph_input: GraphInput {
            context: CTDL_CONTEXT,
            id: &program.id,
            graph: [program],
        },
    }
}
