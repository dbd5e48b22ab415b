//! Tests for the static disease registry.
//!
//! The registry is the single source of truth for routes, schemas, and
//! submission modes; these tests pin its shape to the documented endpoint
//! table.

use medigate::registry::{self, Disease, SubmissionMode};

/// Documented field counts per disease.
const EXPECTED_FIELD_COUNTS: [(Disease, usize); 7] = [
    (Disease::Diabetes, 8),
    (Disease::HeartDisease, 13),
    (Disease::KidneyDisease, 24),
    (Disease::LiverDisease, 10),
    (Disease::CovidSymptoms, 20),
    (Disease::CovidDetection, 0),
    (Disease::PneumoniaDetection, 0),
];

#[test]
fn test_every_disease_has_a_spec() {
    assert_eq!(registry::all().len(), Disease::ALL.len());
    for disease in Disease::ALL {
        assert_eq!(registry::spec(disease).disease, disease);
    }
}

#[test]
fn test_field_counts_match_endpoint_table() {
    for (disease, expected) in EXPECTED_FIELD_COUNTS {
        let spec = registry::spec(disease);
        assert_eq!(
            spec.field_count(),
            expected,
            "field count mismatch for {disease}"
        );
    }
}

#[test]
fn test_identifiers_are_unique() {
    let mut slugs: Vec<&str> = Disease::ALL.iter().map(|d| d.slug()).collect();
    slugs.sort_unstable();
    slugs.dedup();
    assert_eq!(slugs.len(), 7);

    let mut handlers: Vec<&str> = Disease::ALL.iter().map(|d| d.handler_name()).collect();
    handlers.sort_unstable();
    handlers.dedup();
    assert_eq!(handlers.len(), 7);
}

#[test]
fn test_submission_modes() {
    for spec in registry::all() {
        let expected = match spec.disease {
            Disease::CovidDetection | Disease::PneumoniaDetection => SubmissionMode::BinaryImage,
            _ => SubmissionMode::Structured,
        };
        assert_eq!(spec.mode, expected, "mode mismatch for {}", spec.disease);
    }
}

#[test]
fn test_structured_specs_have_compiled_schemas() {
    for spec in registry::all() {
        match spec.mode {
            SubmissionMode::Structured => {
                assert!(spec.schema.is_some());
                assert!(spec.validator().is_some());
            }
            SubmissionMode::BinaryImage => {
                assert!(spec.schema.is_none());
                assert!(spec.validator().is_none());
            }
        }
    }
}

#[test]
fn test_routes_cover_all_diseases() {
    let routes = registry::build_routes();
    assert_eq!(routes.len(), 7);
    for route in &routes {
        assert_eq!(route.method, http::Method::POST);
        assert_eq!(route.path, format!("/api/predict/{}", route.disease.slug()));
        assert!(route.request_body_required);
    }
}

#[test]
fn test_slug_round_trip() {
    for disease in Disease::ALL {
        assert_eq!(Disease::from_slug(disease.slug()), Some(disease));
    }
    assert_eq!(Disease::from_slug("unknown"), None);
}

#[test]
fn test_disease_serializes_as_slug() {
    let json = serde_json::to_string(&Disease::HeartDisease).unwrap();
    assert_eq!(json, "\"heart-disease\"");
    let back: Disease = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Disease::HeartDisease);
}
