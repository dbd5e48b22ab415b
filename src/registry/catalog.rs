//! Static disease catalog.
//!
//! One `DiseaseSpec` per disease, built once at process start. The field
//! tables are the canonical schemas the submission forms enforce; the JSON
//! Schema derived from them is compiled eagerly so request validation never
//! pays compilation cost on the hot path.

use std::sync::Arc;

use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use super::types::{Disease, DiseaseSpec, FieldDomain, FieldMeta, RouteMeta, SubmissionMode};

const YES_NO: &[&str] = &["Yes", "No"];
const BINARY_CODE: &[&str] = &["0", "1"];
const TERNARY_CODE: &[&str] = &["0", "1", "2"];
const QUATERNARY_CODE: &[&str] = &["0", "1", "2", "3"];

const DIABETES_FIELDS: &[FieldMeta] = &[
    FieldMeta::number("pregnancies"),
    FieldMeta::number("glucose"),
    FieldMeta::number("bloodPressure"),
    FieldMeta::number("skinThickness"),
    FieldMeta::number("insulin"),
    FieldMeta::number("bmi"),
    FieldMeta::number("diabetesPedigreeFunction"),
    FieldMeta::number_capped("age", 120.0),
];

const HEART_DISEASE_FIELDS: &[FieldMeta] = &[
    FieldMeta::number_capped("age", 120.0),
    FieldMeta::one_of("sex", BINARY_CODE),
    FieldMeta::one_of("cp", QUATERNARY_CODE),
    FieldMeta::number("trestbps"),
    FieldMeta::number("chol"),
    FieldMeta::one_of("fbs", BINARY_CODE),
    FieldMeta::one_of("restecg", TERNARY_CODE),
    FieldMeta::number("thalach"),
    FieldMeta::one_of("exang", BINARY_CODE),
    FieldMeta::number("oldpeak"),
    FieldMeta::one_of("slope", TERNARY_CODE),
    FieldMeta::one_of("ca", QUATERNARY_CODE),
    FieldMeta::one_of("thal", QUATERNARY_CODE),
];

const KIDNEY_DISEASE_FIELDS: &[FieldMeta] = &[
    FieldMeta::number_capped("age", 120.0),
    FieldMeta::number("bp"),
    FieldMeta::number("sg"),
    FieldMeta::number("al"),
    FieldMeta::number("su"),
    FieldMeta::one_of_optional("rbc", &["normal", "abnormal", ""]),
    FieldMeta::one_of_optional("pc", &["normal", "abnormal", ""]),
    FieldMeta::one_of_optional("pcc", &["present", "notpresent", ""]),
    FieldMeta::one_of_optional("ba", &["present", "notpresent", ""]),
    FieldMeta::number("bgr"),
    FieldMeta::number("bu"),
    FieldMeta::number("sc"),
    FieldMeta::number("sod"),
    FieldMeta::number("pot"),
    FieldMeta::number("hemo"),
    FieldMeta::number("pcv"),
    FieldMeta::number("wc"),
    FieldMeta::number("rc"),
    FieldMeta::one_of_optional("htn", &["yes", "no", ""]),
    FieldMeta::one_of_optional("dm", &["yes", "no", ""]),
    FieldMeta::one_of_optional("cad", &["yes", "no", ""]),
    FieldMeta::one_of_optional("appet", &["good", "poor", ""]),
    FieldMeta::one_of_optional("pe", &["yes", "no", ""]),
    FieldMeta::one_of_optional("ane", &["yes", "no", ""]),
];

const LIVER_DISEASE_FIELDS: &[FieldMeta] = &[
    FieldMeta::number_capped("age", 120.0),
    FieldMeta::one_of("gender", &["Male", "Female"]),
    FieldMeta::number("totalBilirubin"),
    FieldMeta::number("directBilirubin"),
    FieldMeta::number("alkalinePhosphotase"),
    FieldMeta::number("alamineAminotransferase"),
    FieldMeta::number("aspartateAminotransferase"),
    FieldMeta::number("totalProtiens"),
    FieldMeta::number("albumin"),
    FieldMeta::number("albuminAndGlobulinRatio"),
];

const COVID_SYMPTOMS_FIELDS: &[FieldMeta] = &[
    FieldMeta::one_of("breathingProblem", YES_NO),
    FieldMeta::one_of("fever", YES_NO),
    FieldMeta::one_of("dryCough", YES_NO),
    FieldMeta::one_of("soreThroat", YES_NO),
    FieldMeta::one_of("runningNose", YES_NO),
    FieldMeta::one_of("asthma", YES_NO),
    FieldMeta::one_of("chronicLungDisease", YES_NO),
    FieldMeta::one_of("headache", YES_NO),
    FieldMeta::one_of("heartDisease", YES_NO),
    FieldMeta::one_of("diabetes", YES_NO),
    FieldMeta::one_of("hyperTension", YES_NO),
    FieldMeta::one_of("fatigue", YES_NO),
    FieldMeta::one_of("gastrointestinal", YES_NO),
    FieldMeta::one_of("abroadTravel", YES_NO),
    FieldMeta::one_of("contactWithCovidPatient", YES_NO),
    FieldMeta::one_of("attendedLargeGathering", YES_NO),
    FieldMeta::one_of("visitedPublicExposedPlaces", YES_NO),
    FieldMeta::one_of("familyWorkingInPublicExposedPlaces", YES_NO),
    FieldMeta::one_of("wearingMask", YES_NO),
    FieldMeta::one_of("sanitizationFromPublic", YES_NO),
];

/// Build the JSON Schema for a structured field set.
fn schema_for(fields: &[FieldMeta]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        let prop = match field.domain {
            FieldDomain::Number { min, max } => {
                let mut p = Map::new();
                p.insert("type".to_string(), json!("number"));
                p.insert("minimum".to_string(), json!(min));
                if let Some(max) = max {
                    p.insert("maximum".to_string(), json!(max));
                }
                Value::Object(p)
            }
            FieldDomain::OneOf { options } => json!({
                "type": "string",
                "enum": options,
            }),
        };
        properties.insert(field.name.to_string(), prop);
        if field.required {
            required.push(Value::String(field.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "required": required,
        "properties": properties,
    })
}

fn structured(
    disease: Disease,
    title: &'static str,
    description: &'static str,
    fields: &[FieldMeta],
) -> DiseaseSpec {
    let schema = schema_for(fields);
    // Catalog schemas are static; a compile failure is a startup bug.
    #[allow(clippy::expect_used)]
    let compiled = JSONSchema::compile(&schema).expect("invalid catalog schema");
    DiseaseSpec {
        disease,
        title,
        description,
        mode: SubmissionMode::Structured,
        fields: fields.to_vec(),
        schema: Some(schema),
        compiled: Some(compiled),
    }
}

fn binary_image(disease: Disease, title: &'static str, description: &'static str) -> DiseaseSpec {
    DiseaseSpec {
        disease,
        title,
        description,
        mode: SubmissionMode::BinaryImage,
        fields: Vec::new(),
        schema: None,
        compiled: None,
    }
}

static CATALOG: Lazy<Vec<Arc<DiseaseSpec>>> = Lazy::new(|| {
    vec![
        Arc::new(structured(
            Disease::Diabetes,
            "Diabetes Prediction",
            "Enter the patient's details to predict the likelihood of diabetes.",
            DIABETES_FIELDS,
        )),
        Arc::new(structured(
            Disease::HeartDisease,
            "Heart Disease Prediction",
            "Provide the patient's cardiovascular information for heart disease prediction.",
            HEART_DISEASE_FIELDS,
        )),
        Arc::new(structured(
            Disease::KidneyDisease,
            "Kidney Disease Prediction",
            "Input the patient's lab results to assess kidney disease risk.",
            KIDNEY_DISEASE_FIELDS,
        )),
        Arc::new(structured(
            Disease::LiverDisease,
            "Liver Disease Prediction",
            "Fill in the patient's liver-related parameters for liver disease prediction.",
            LIVER_DISEASE_FIELDS,
        )),
        Arc::new(structured(
            Disease::CovidSymptoms,
            "COVID-19 Symptoms Prediction",
            "Select the symptoms experienced by the patient to predict COVID-19 likelihood.",
            COVID_SYMPTOMS_FIELDS,
        )),
        Arc::new(binary_image(
            Disease::CovidDetection,
            "COVID-19 Detection (Image)",
            "Upload a chest X-ray image for COVID-19 detection.",
        )),
        Arc::new(binary_image(
            Disease::PneumoniaDetection,
            "Pneumonia Detection (Image)",
            "Upload a chest X-ray image for pneumonia detection.",
        )),
    ]
});

/// All disease specs, in registry order.
#[must_use]
pub fn all() -> &'static [Arc<DiseaseSpec>] {
    &CATALOG
}

/// Look up the spec for a disease. Every `Disease` variant has exactly one
/// spec, so the lookup is infallible.
#[must_use]
pub fn spec(disease: Disease) -> Arc<DiseaseSpec> {
    // The catalog covers Disease::ALL by construction.
    #[allow(clippy::expect_used)]
    CATALOG
        .iter()
        .find(|s| s.disease == disease)
        .cloned()
        .expect("disease missing from catalog")
}

/// Build the routing table: one `POST /api/predict/<slug>` route per spec.
#[must_use]
pub fn build_routes() -> Vec<RouteMeta> {
    CATALOG.iter().map(|spec| spec.route()).collect()
}
