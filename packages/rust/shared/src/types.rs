//! Input domain types: the parsed CASE package the core consumes.

use serde::{Deserialize, Serialize};

/// JSON-LD context for course and learning-program documents (CTDL).
pub const CTDL_CONTEXT: &str = "https://credreg.net/ctdl/schema/context/json";

/// JSON-LD context for competency-framework documents (CTDL-ASN).
pub const CTDLASN_CONTEXT: &str = "https://credreg.net/ctdlasn/schema/context/json";

/// Default registry resource namespace every output `@id` lives under.
pub const DEFAULT_REGISTRY_BASE: &str = "https://credentialengineregistry.org/resources/";

/// Prefix every CTID carries.
pub const CTID_PREFIX: &str = "ce-";

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// Closed classification of CASE items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// `CFItemType` = "Course".
    Course,
    /// `CFItemType` = "Pathway"; source of a CTDL learning program.
    Pathway,
    /// Everything else, including items without a type.
    Competency,
}

impl ItemKind {
    /// Classify a raw `CFItemType` label (case-insensitive, trimmed).
    pub fn from_type_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_lowercase()).as_deref() {
            Some("course") => Self::Course,
            Some("pathway") => Self::Pathway,
            _ => Self::Competency,
        }
    }
}

// ---------------------------------------------------------------------------
// RelationKind
// ---------------------------------------------------------------------------

/// CASE association type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    IsChildOf,
    IsPartOf,
    ExactMatch,
    Precedes,
    /// Any other association type, kept verbatim.
    Other(String),
}

impl RelationKind {
    /// Parse an `associationType` value, ignoring case and whitespace.
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "ischildof" => Self::IsChildOf,
            "ispartof" => Self::IsPartOf,
            "exactmatch" | "exactmatchof" => Self::ExactMatch,
            "precedes" => Self::Precedes,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Whether this kind builds the parent/child hierarchy.
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, Self::IsChildOf | Self::IsPartOf)
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A single CASE item (`CFItem`), flattened to text fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier (`identifier` / `CFItemGUID`).
    pub identifier: String,
    /// Classification derived from `type_label`.
    pub kind: ItemKind,
    /// Raw `CFItemType` text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_label: Option<String>,
    /// Item URI in the source CASE server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviated_statement: Option<String>,
    /// `humanCodingScheme`, mapped to coded notation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_coding_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// `listEnumInSource`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_enum: Option<String>,
    /// Item-level language, when the source sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Item {
    /// Create an item with only an identifier and a kind.
    pub fn new(identifier: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            type_label: None,
            uri: None,
            full_statement: None,
            abbreviated_statement: None,
            human_coding_scheme: None,
            notes: None,
            list_enum: None,
            language: None,
        }
    }

    /// Short human label: abbreviated statement, else full statement.
    pub fn label(&self) -> Option<&str> {
        non_empty(self.abbreviated_statement.as_deref())
            .or_else(|| non_empty(self.full_statement.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Association
// ---------------------------------------------------------------------------

/// A directed, typed relation (`CFAssociation`). For hierarchical kinds the
/// origin is the child and the destination is the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub origin: String,
    pub destination: String,
    pub kind: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
}

impl Association {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            kind,
            sequence_number: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CaseDocument / CasePackage
// ---------------------------------------------------------------------------

/// Document-level metadata (`CFDocument`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Language tag exactly as published (e.g. `en-US`, `eng`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// `CFDocumentURI` or `officialSourceURL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A fully parsed CASE package: the input to the core pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CasePackage {
    pub document: CaseDocument,
    pub items: Vec<Item>,
    pub associations: Vec<Association>,
}
