//! CASE package JSON parser.
//!
//! Accepts the package wrapped in `CFPackage` or bare, and both the plural
//! (`CFItems`, `CFAssociations`) and singular (`CFItem`, `CFAssociation`) list
//! keys. Publishers disagree on whether fields are strings, numbers, link
//! objects or lists, so every field is flattened to text.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use casegraph_shared::{
    Association, CaseDocument, CaseGraphError, CasePackage, Item, ItemKind, RelationKind, Result,
};

/// Keys that carry display text in a link-style object, in preference order.
const TEXT_KEYS: &[&str] = &[
    "title",
    "name",
    "label",
    "value",
    "text",
    "displayName",
    "shortName",
];

/// Keys that carry an identifier or URI in a link-style object.
const ID_KEYS: &[&str] = &[
    "uri",
    "CFItemURI",
    "CFDocumentURI",
    "identifier",
    "CFItemGUID",
];

/// Parse a CASE package from its JSON text.
pub fn parse_package(json: &str) -> Result<CasePackage> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CaseGraphError::parse(format!("invalid CASE package JSON: {e}")))?;
    package_from_value(&value)
}

/// Parse a CASE package from an already decoded JSON value.
pub fn package_from_value(value: &Value) -> Result<CasePackage> {
    let root = match value.get("CFPackage") {
        Some(Value::Object(inner)) => inner,
        _ => value
            .as_object()
            .ok_or_else(|| CaseGraphError::parse("CASE package must be a JSON object"))?,
    };

    let document = root
        .get("CFDocument")
        .and_then(Value::as_object)
        .map(parse_document)
        .unwrap_or_default();

    let items: Vec<Item> = list(root, &["CFItems", "CFItem"])
        .enumerate()
        .filter_map(|(position, raw)| {
            let item = parse_item(raw);
            if item.is_none() {
                warn!(position, "CFItem without identifier skipped");
            }
            item
        })
        .collect();

    let associations: Vec<Association> = list(root, &["CFAssociations", "CFAssociation"])
        .filter_map(parse_association)
        .collect();

    debug!(
        items = items.len(),
        associations = associations.len(),
        language = document.language.as_deref().unwrap_or("-"),
        "CASE package parsed"
    );

    Ok(CasePackage {
        document,
        items,
        associations,
    })
}

fn parse_document(doc: &Map<String, Value>) -> CaseDocument {
    CaseDocument {
        identifier: field(doc, "identifier"),
        title: field(doc, "title"),
        language: field(doc, "language"),
        source_uri: uri_field(doc, "CFDocumentURI").or_else(|| field(doc, "officialSourceURL")),
        publisher: field(doc, "publisher"),
        description: field(doc, "description"),
    }
}

fn parse_item(raw: &Value) -> Option<Item> {
    let obj = raw.as_object()?;
    let identifier = field(obj, "identifier").or_else(|| field(obj, "CFItemGUID"))?;
    let type_label = field(obj, "CFItemType");

    Some(Item {
        identifier,
        kind: ItemKind::from_type_label(type_label.as_deref()),
        type_label,
        uri: uri_field(obj, "uri").or_else(|| uri_field(obj, "CFItemURI")),
        full_statement: field(obj, "fullStatement"),
        abbreviated_statement: field(obj, "abbreviatedStatement"),
        human_coding_scheme: field(obj, "humanCodingScheme"),
        notes: field(obj, "notes"),
        list_enum: field(obj, "listEnumInSource"),
        language: field(obj, "language"),
    })
}

fn parse_association(raw: &Value) -> Option<Association> {
    let obj = raw.as_object()?;
    let origin = endpoint(obj, "originNodeURI", "originNodeIdentifier")?;
    let destination = endpoint(obj, "destinationNodeURI", "destinationNodeIdentifier")?;
    let kind = RelationKind::parse(&field(obj, "associationType").unwrap_or_default());

    Some(Association {
        origin,
        destination,
        kind,
        sequence_number: field(obj, "sequenceNumber"),
    })
}

/// Endpoint identifier from a link object (`{"identifier": …}`) or a bare id.
fn endpoint(obj: &Map<String, Value>, link_key: &str, id_key: &str) -> Option<String> {
    let raw = obj
        .get(link_key)
        .filter(|v| !v.is_null())
        .or_else(|| obj.get(id_key))?;

    let id = match raw {
        Value::Object(link) => field(link, "identifier").or_else(|| field(link, "CFItemGUID")),
        other => non_empty(flatten(other)),
    };
    if id.is_none() {
        warn!(link_key, "association endpoint without identifier skipped");
    }
    id
}

/// Elements under the first present key of `keys`.
fn list<'v>(root: &'v Map<String, Value>, keys: &[&str]) -> impl Iterator<Item = &'v Value> {
    keys.iter()
        .find_map(|key| root.get(*key).and_then(Value::as_array))
        .into_iter()
        .flatten()
}

fn field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| non_empty(flatten(v)))
}

/// Like [`field`], but a LinkURI object (`{title, identifier, uri}`) yields its `uri`.
fn uri_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        Some(Value::Object(link)) => field(link, "uri"),
        _ => field(obj, key),
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Flatten any JSON value to text.
///
/// Lists join their non-empty entries with `"; "`. Objects yield their first
/// text-like key, then their first identifier-like key, then their JSON form.
pub fn flatten(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(entries) => entries
            .iter()
            .map(flatten)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => TEXT_KEYS
            .iter()
            .chain(ID_KEYS)
            .find_map(|key| map.get(*key).filter(|v| is_truthy(v)))
            .map(flatten)
            .unwrap_or_else(|| value.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_and_wrapped_packages_parse_the_same() {
        let bare = json!({
            "CFDocument": {"title": "Science", "language": "en"},
            "CFItems": [{"identifier": "C1", "CFItemType": "Course"}],
            "CFAssociations": [],
        });
        let wrapped = json!({ "CFPackage": bare.clone() });

        assert_eq!(
            package_from_value(&bare).unwrap(),
            package_from_value(&wrapped).unwrap()
        );
    }

    #[test]
    fn singular_list_keys_are_accepted() {
        let pkg = package_from_value(&json!({
            "CFItem": [
                {"identifier": "K1", "CFItemType": "Competency"},
                {"identifier": "C1", "CFItemType": {"title": "Course"}},
            ],
            "CFAssociation": [{
                "associationType": "isChildOf",
                "originNodeURI": {"identifier": "K1", "uri": "https://case.example.org/K1"},
                "destinationNodeURI": {"identifier": "C1"},
                "sequenceNumber": 2,
            }],
        }))
        .unwrap();

        assert_eq!(pkg.items.len(), 2);
        assert_eq!(pkg.items[1].kind, ItemKind::Course);
        assert_eq!(pkg.items[1].type_label.as_deref(), Some("Course"));
        let assoc = &pkg.associations[0];
        assert_eq!((assoc.origin.as_str(), assoc.destination.as_str()), ("K1", "C1"));
        assert_eq!(assoc.kind, RelationKind::IsChildOf);
        assert_eq!(assoc.sequence_number.as_deref(), Some("2"));
    }

    #[test]
    fn item_fields_are_flattened() {
        let pkg = package_from_value(&json!({
            "CFItems": [{
                "CFItemGUID": " K9 ",
                "CFItemURI": "https://case.example.org/K9",
                "fullStatement": ["Explain", "", "osmosis"],
                "humanCodingScheme": 101,
                "notes": null,
                "listEnumInSource": "3",
                "language": "eng",
            }],
        }))
        .unwrap();

        let item = &pkg.items[0];
        assert_eq!(item.identifier, "K9");
        assert_eq!(item.kind, ItemKind::Competency);
        assert_eq!(item.uri.as_deref(), Some("https://case.example.org/K9"));
        assert_eq!(item.full_statement.as_deref(), Some("Explain; osmosis"));
        assert_eq!(item.human_coding_scheme.as_deref(), Some("101"));
        assert_eq!(item.notes, None);
        assert_eq!(item.list_enum.as_deref(), Some("3"));
    }

    #[test]
    fn items_without_identifier_are_skipped() {
        let pkg = package_from_value(&json!({
            "CFItems": [{"fullStatement": "orphan"}, {"identifier": "  "}, {"identifier": "K1"}],
        }))
        .unwrap();
        assert_eq!(pkg.items.len(), 1);
    }

    #[test]
    fn document_source_falls_back_to_official_url() {
        let pkg = package_from_value(&json!({
            "CFDocument": {
                "officialSourceURL": "https://standards.example.org/science",
                "publisher": {"name": "State Board"},
                "description": "  Standards for science  ",
            },
        }))
        .unwrap();

        let doc = &pkg.document;
        assert_eq!(doc.source_uri.as_deref(), Some("https://standards.example.org/science"));
        assert_eq!(doc.publisher.as_deref(), Some("State Board"));
        assert_eq!(doc.description.as_deref(), Some("Standards for science"));
        assert!(pkg.items.is_empty());
    }

    #[test]
    fn link_uri_objects_yield_their_uri() {
        let pkg = package_from_value(&json!({
            "CFDocument": {
                "CFDocumentURI": {"title": "Science", "identifier": "d1", "uri": "https://case.example.org/d1"},
                "officialSourceURL": "https://standards.example.org/science",
            },
            "CFItems": [{"identifier": "K1", "CFItemURI": {"title": "K1", "uri": "https://case.example.org/K1"}}],
        }))
        .unwrap();

        assert_eq!(pkg.document.source_uri.as_deref(), Some("https://case.example.org/d1"));
        assert_eq!(pkg.items[0].uri.as_deref(), Some("https://case.example.org/K1"));
    }

    #[test]
    fn bare_endpoint_identifiers() {
        let pkg = package_from_value(&json!({
            "CFAssociations": [
                {"associationType": "Is Part Of", "originNodeIdentifier": "K1", "destinationNodeIdentifier": "C1"},
                {"associationType": "isChildOf", "originNodeURI": {"uri": "x"}, "destinationNodeIdentifier": "C1"},
            ],
        }))
        .unwrap();

        assert_eq!(pkg.associations.len(), 1);
        assert_eq!(pkg.associations[0].kind, RelationKind::IsPartOf);
    }

    #[test]
    fn flatten_prefers_text_keys() {
        assert_eq!(flatten(&json!({"uri": "u", "title": "T"})), "T");
        assert_eq!(flatten(&json!({"identifier": "id-1"})), "id-1");
        assert_eq!(flatten(&json!({"other": 1})), r#"{"other":1}"#);
        assert_eq!(flatten(&json!(true)), "true");
        assert_eq!(flatten(&json!(null)), "");
    }

    #[test]
    fn non_object_package_is_a_parse_error() {
        let err = parse_package("[1, 2]").unwrap_err();
        assert!(matches!(err, CaseGraphError::Parse { .. }));
        assert!(parse_package("{not json").is_err());
    }
}
