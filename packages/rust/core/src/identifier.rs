//! CTID handling and deterministic identifier derivation.
//!
//! Source items keep their CASE identifier (prefixed with `ce-`). Synthesized
//! frameworks get a UUIDv5 over the owning course's CTID, so rerunning a
//! conversion reproduces the identifiers that were already published.

use uuid::Uuid;

use casegraph_shared::{CTID_PREFIX, CaseGraphError, Result};

/// Namespace label hashed in front of the course CTID.
const FRAMEWORK_NAME_PREFIX: &str = "framework:";

/// Characters that cannot appear in a registry URI segment or an output file name.
const UNSAFE_CTID_CHARS: &[char] = &['/', '\\', '?', '#', '%'];

/// CTID for a source identifier: `ce-<identifier>`, without doubling the prefix.
pub fn ctid_for(identifier: &str) -> String {
    let id = identifier.trim();
    if id.starts_with(CTID_PREFIX) {
        id.to_string()
    } else {
        format!("{CTID_PREFIX}{id}")
    }
}

/// [`ctid_for`], rejecting identifiers that cannot become a registry URI
/// segment or an output file name.
pub fn checked_ctid(identifier: &str) -> Result<String> {
    let ctid = ctid_for(identifier);
    if ctid.chars().any(|c| c.is_whitespace() || UNSAFE_CTID_CHARS.contains(&c)) {
        return Err(CaseGraphError::malformed(format!(
            "identifier '{}' cannot be used as a CTID",
            identifier.trim()
        )));
    }
    Ok(ctid)
}

/// Derive the CTID of the competency framework owned by a course.
///
/// Pure: the same course identifier always yields the same CTID. Fails only
/// when called with an empty identifier.
pub fn derive_framework_ctid(course_identifier: &str) -> Result<String> {
    let id = course_identifier.trim();
    if id.is_empty() {
        return Err(CaseGraphError::contract(
            "cannot derive a framework identifier from an empty course identifier",
        ));
    }

    let name = format!("{FRAMEWORK_NAME_PREFIX}{}", ctid_for(id));
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes());
    Ok(format!("{CTID_PREFIX}{}", uuid.hyphenated()))
}

/// Registry URI for a CTID under `base`.
pub fn registry_uri(base: &str, ctid: &str) -> String {
    let ctid = ctid_for(ctid);
    if base.ends_with('/') {
        format!("{base}{ctid}")
    } else {
        format!("{base}/{ctid}")
    }
}

/// Whether `value` is a registry URI for a CTID under `base`.
pub fn is_registry_uri(value: &str, base: &str) -> bool {
    if !value.starts_with("http") {
        return false;
    }
    let prefix = if base.ends_with('/') {
        format!("{base}{CTID_PREFIX}")
    } else {
        format!("{base}/{CTID_PREFIX}")
    };
    value.starts_with(&prefix)
}

/// CTID from either a registry URI (last path segment) or a raw CTID.
pub fn extract_ctid(value: &str) -> String {
    let value = value.trim();
    if value.starts_with("http") {
        let tail = value.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
        tail.to_string()
    } else {
        ctid_for(value)
    }
}

/// Comma-separated CTIDs or URIs to registry URIs. URIs pass through as-is.
pub fn parse_reference_list(raw: &str, base: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.starts_with("http") {
                part.to_string()
            } else {
                registry_uri(base, part)
            }
        })
        .collect()
}

/// Normalize a list of references, each of which may itself be comma-separated.
pub fn normalize_references(values: &[String], base: &str) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| parse_reference_list(value, base))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://credentialengineregistry.org/resources/";
    const COURSE: &str = "6c1d3b52-2f4a-4c55-9a4e-0c0a5f3b7e21";

    #[test]
    fn ctid_prefix_is_not_doubled() {
        assert_eq!(ctid_for(COURSE), format!("ce-{COURSE}"));
        assert_eq!(ctid_for(&format!("ce-{COURSE}")), format!("ce-{COURSE}"));
    }

    #[test]
    fn framework_ctid_is_deterministic() {
        let first = derive_framework_ctid(COURSE).unwrap();
        let second = derive_framework_ctid(COURSE).unwrap();
        assert_eq!(first, second);
        // Prefixed and bare forms name the same course.
        assert_eq!(first, derive_framework_ctid(&format!("ce-{COURSE}")).unwrap());
    }

    #[test]
    fn framework_ctid_matches_uuid5_of_course_ctid() {
        let expected = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("framework:ce-{COURSE}").as_bytes(),
        );
        assert_eq!(
            derive_framework_ctid(COURSE).unwrap(),
            format!("ce-{}", expected.hyphenated())
        );
    }

    #[test]
    fn framework_ctid_has_the_same_shape_as_source_ctids() {
        let derived = derive_framework_ctid(COURSE).unwrap();
        let source = ctid_for(COURSE);
        for ctid in [&derived, &source] {
            let uuid = ctid.strip_prefix("ce-").unwrap();
            assert!(Uuid::parse_str(uuid).is_ok(), "{ctid}");
        }
        assert!(is_registry_uri(&registry_uri(BASE, &derived), BASE));
    }

    #[test]
    fn distinct_courses_get_distinct_frameworks() {
        let a = derive_framework_ctid("course-a").unwrap();
        let b = derive_framework_ctid("course-b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_course_identifier_is_a_contract_violation() {
        let err = derive_framework_ctid("   ").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn registry_uri_adds_missing_slash() {
        assert_eq!(
            registry_uri("https://sandbox.example.org/resources", "abc"),
            "https://sandbox.example.org/resources/ce-abc"
        );
        assert_eq!(registry_uri(BASE, "ce-abc"), format!("{BASE}ce-abc"));
    }

    #[test]
    fn registry_uri_detection() {
        assert!(is_registry_uri(&format!("{BASE}ce-{COURSE}"), BASE));
        assert!(!is_registry_uri(&format!("{BASE}{COURSE}"), BASE));
        assert!(!is_registry_uri("https://elsewhere.example.org/ce-abc", BASE));
        assert!(!is_registry_uri("ce-abc", BASE));
    }

    #[test]
    fn checked_ctid_accepts_any_segment_safe_identifier() {
        assert_eq!(checked_ctid(COURSE).unwrap(), format!("ce-{COURSE}"));
        assert_eq!(checked_ctid("C1").unwrap(), "ce-C1");
        assert_eq!(checked_ctid(" HS-101.1 ").unwrap(), "ce-HS-101.1");
    }

    #[test]
    fn checked_ctid_rejects_unsafe_identifiers() {
        for bad in ["HS/101", "HS 101", "a?b", "a#b", "50%"] {
            let err = checked_ctid(bad).unwrap_err();
            assert!(matches!(err, CaseGraphError::MalformedInput { .. }), "{bad}");
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn extract_ctid_from_uri_or_raw() {
        assert_eq!(extract_ctid(&format!("{BASE}ce-{COURSE}/")), format!("ce-{COURSE}"));
        assert_eq!(extract_ctid(COURSE), format!("ce-{COURSE}"));
    }

    #[test]
    fn reference_lists_become_registry_uris() {
        let refs = parse_reference_list(" abc, ce-def ,, https://x.example.org/ce-ghi", BASE);
        assert_eq!(
            refs,
            [
                format!("{BASE}ce-abc"),
                format!("{BASE}ce-def"),
                "https://x.example.org/ce-ghi".to_string(),
            ]
        );

        let normalized = normalize_references(&["a,b".into(), "c".into()], BASE);
        assert_eq!(normalized.len(), 3);
    }
}
