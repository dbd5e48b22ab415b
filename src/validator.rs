//! Submission validation.
//!
//! Raw form input arrives as strings. Validation runs in two passes:
//! coercion (numeric fields parse string input to numbers, missing required
//! fields are reported) and schema validation (range and enumeration checks
//! against the spec's precompiled JSON Schema). Both passes report every
//! violation they find rather than stopping at the first.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use crate::registry::{DiseaseSpec, FieldDomain};

/// One field-level validation failure, reported inline and never sent over
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldViolation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Coerce raw string input into a typed JSON payload.
///
/// Numeric fields parse to numbers ("45" becomes 45.0); categorical fields
/// pass through as strings. Missing required fields and unparseable numbers
/// are reported as violations. Unknown keys pass through untouched so the
/// echoed `details` matches what was submitted.
pub fn coerce_fields(
    spec: &DiseaseSpec,
    raw: &HashMap<String, String>,
) -> (Map<String, Value>, Vec<FieldViolation>) {
    let mut payload = Map::new();
    let mut violations = Vec::new();

    for field in &spec.fields {
        let value = raw.get(field.name).map(String::as_str);
        match (value, field.required) {
            (None, true) => {
                violations.push(FieldViolation::new(field.name, "This field is required"));
            }
            (None, false) => {}
            (Some(text), _) => match field.domain {
                FieldDomain::Number { .. } => match text.trim().parse::<f64>() {
                    Ok(n) => {
                        // NaN/infinity cannot round-trip through JSON; report
                        // them the same way as unparseable text.
                        match Number::from_f64(n) {
                            Some(number) => {
                                payload.insert(field.name.to_string(), Value::Number(number));
                            }
                            None => violations
                                .push(FieldViolation::new(field.name, "Must be a number")),
                        }
                    }
                    Err(_) => {
                        violations.push(FieldViolation::new(field.name, "Must be a number"));
                    }
                },
                FieldDomain::OneOf { .. } => {
                    payload.insert(field.name.to_string(), Value::String(text.to_string()));
                }
            },
        }
    }

    for (key, value) in raw {
        if spec.field(key).is_none() {
            payload.insert(key.clone(), Value::String(value.clone()));
        }
    }

    (payload, violations)
}

/// Validate a typed payload against the spec's compiled schema.
///
/// Returns one violation per schema error, keyed by the offending field
/// (taken from the error's instance path).
#[must_use]
pub fn validate_payload(spec: &DiseaseSpec, payload: &Value) -> Vec<FieldViolation> {
    let Some(compiled) = spec.validator() else {
        return Vec::new();
    };
    match compiled.validate(payload) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|e| {
                let pointer = e.instance_path.to_string();
                let field = pointer.trim_start_matches('/').to_string();
                if field.is_empty() {
                    FieldViolation::new(spec.disease.slug(), e.to_string())
                } else {
                    FieldViolation::new(field, e.to_string())
                }
            })
            .collect(),
    }
}

/// Full client-side validation: coerce then schema-check.
///
/// Coercion failures (missing required fields, unparseable numbers) are
/// reported on their own; range and enumeration checks run once the payload
/// is well-formed. On success returns the typed payload ready for JSON
/// encoding.
pub fn validate_structured(
    spec: &DiseaseSpec,
    raw: &HashMap<String, String>,
) -> Result<Map<String, Value>, Vec<FieldViolation>> {
    let (payload, violations) = coerce_fields(spec, raw);
    if !violations.is_empty() {
        return Err(violations);
    }
    let violations = validate_payload(spec, &Value::Object(payload.clone()));
    if violations.is_empty() {
        Ok(payload)
    } else {
        Err(violations)
    }
}
