//! Entity validator.
//!
//! Table-driven: each [`EntityKind`] has a fixed list of [`FieldRule`]s. Every
//! rule is checked, so one record can carry several errors. An entity with no
//! errors produces no record.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::graph::{EntityKind, GraphEntity};
use crate::identifier::is_registry_uri;

/// A failed entity and everything wrong with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRecord {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: EntityKind,
    pub errors: Vec<String>,
}

/// One check against a serialized entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// The field must be present and non-empty.
    Required(&'static str),
    /// At least one of the two fields must be present and non-empty.
    EitherOf(&'static str, &'static str),
    /// When present, every entry must be a registry URI.
    RegistryUris(&'static str),
}

const FRAMEWORK_RULES: &[FieldRule] = &[
    FieldRule::Required("ceterms:ctid"),
    FieldRule::Required("ceasn:name"),
    FieldRule::Required("ceasn:description"),
    FieldRule::Required("ceasn:inLanguage"),
    FieldRule::Required("ceasn:publisher"),
    FieldRule::RegistryUris("ceasn:publisher"),
];

const COMPETENCY_RULES: &[FieldRule] = &[
    FieldRule::Required("ceterms:ctid"),
    FieldRule::Required("ceasn:competencyText"),
    FieldRule::Required("ceasn:isPartOf"),
    FieldRule::RegistryUris("ceasn:isPartOf"),
];

const COURSE_RULES: &[FieldRule] = &[
    FieldRule::Required("ceterms:ctid"),
    FieldRule::Required("ceterms:name"),
    FieldRule::Required("ceterms:description"),
    FieldRule::Required("ceterms:inLanguage"),
    FieldRule::Required("ceterms:lifeCycleStatusType"),
    FieldRule::EitherOf("ceterms:ownedBy", "ceterms:offeredBy"),
    FieldRule::RegistryUris("ceterms:ownedBy"),
    FieldRule::RegistryUris("ceterms:offeredBy"),
];

const LEARNING_PROGRAM_RULES: &[FieldRule] = &[
    FieldRule::Required("ceterms:ctid"),
    FieldRule::Required("ceterms:name"),
    FieldRule::Required("ceterms:inLanguage"),
    FieldRule::Required("ceterms:lifeCycleStatusType"),
    FieldRule::Required("ceterms:isPreparationFor"),
    FieldRule::EitherOf("ceterms:ownedBy", "ceterms:offeredBy"),
    FieldRule::RegistryUris("ceterms:ownedBy"),
    FieldRule::RegistryUris("ceterms:offeredBy"),
];

/// The rule table for an entity type.
pub fn rules_for(kind: EntityKind) -> &'static [FieldRule] {
    match kind {
        EntityKind::CompetencyFramework => FRAMEWORK_RULES,
        EntityKind::Competency => COMPETENCY_RULES,
        EntityKind::Course => COURSE_RULES,
        EntityKind::LearningProgram => LEARNING_PROGRAM_RULES,
    }
}

/// Checks entities against the rule tables for one registry.
#[derive(Debug, Clone)]
pub struct Validator {
    registry_base: String,
}

impl Validator {
    pub fn new(registry_base: impl Into<String>) -> Self {
        Self {
            registry_base: registry_base.into(),
        }
    }

    /// Validate an entity. `None` means it passed every rule.
    pub fn validate<E: GraphEntity>(&self, entity: &E) -> Option<ValidationRecord> {
        let fields = match serde_json::to_value(entity) {
            Ok(Value::Object(fields)) => fields,
            // Entities are structs; anything else cannot satisfy a rule table.
            _ => Map::new(),
        };
        self.validate_fields(entity.kind(), entity.entity_id(), &fields)
    }

    /// Validate an already serialized entity.
    pub fn validate_fields(
        &self,
        kind: EntityKind,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Option<ValidationRecord> {
        let errors: Vec<String> = rules_for(kind)
            .iter()
            .filter_map(|rule| self.check(rule, fields))
            .collect();

        if errors.is_empty() {
            return None;
        }

        debug!(id, kind = kind.schema_type(), errors = errors.len(), "entity failed validation");
        Some(ValidationRecord {
            id: id.to_string(),
            kind,
            errors,
        })
    }

    fn check(&self, rule: &FieldRule, fields: &Map<String, Value>) -> Option<String> {
        let present = |name: &str| fields.get(name).filter(|v| !is_absent(v));

        match *rule {
            FieldRule::Required(name) => present(name).is_none().then(|| format!("Missing {name}")),
            FieldRule::EitherOf(a, b) => (present(a).is_none() && present(b).is_none())
                .then(|| format!("Missing {a} or {b} (one required)")),
            FieldRule::RegistryUris(name) => {
                let value = present(name)?;
                let ok = match value {
                    Value::String(s) => is_registry_uri(s, &self.registry_base),
                    Value::Array(entries) => entries.iter().all(|entry| {
                        entry
                            .as_str()
                            .is_some_and(|s| is_registry_uri(s, &self.registry_base))
                    }),
                    _ => false,
                };
                (!ok).then(|| format!("{name} must be CE registry URI(s)"))
            }
        }
    }
}

/// Missing, null, blank, or a container of nothing but absent values.
fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_absent),
        Value::Object(map) => map.values().all(is_absent),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
