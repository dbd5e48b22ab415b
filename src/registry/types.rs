use http::Method;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum accepted image upload size for binary-image specs (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// MIME types accepted for binary-image specs.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Multipart field name carrying the image payload.
pub const IMAGE_FIELD: &str = "image";

/// Closed set of disease identifiers served by the gateway.
///
/// Serialized as the kebab-case slug used in route paths
/// (e.g. `heart-disease`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Disease {
    Diabetes,
    HeartDisease,
    KidneyDisease,
    LiverDisease,
    CovidSymptoms,
    CovidDetection,
    PneumoniaDetection,
}

impl Disease {
    /// All diseases, in registry order.
    pub const ALL: [Disease; 7] = [
        Disease::Diabetes,
        Disease::HeartDisease,
        Disease::KidneyDisease,
        Disease::LiverDisease,
        Disease::CovidSymptoms,
        Disease::CovidDetection,
        Disease::PneumoniaDetection,
    ];

    /// URL slug, as it appears in `/api/predict/<slug>`.
    #[must_use]
    pub fn slug(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::HeartDisease => "heart-disease",
            Disease::KidneyDisease => "kidney-disease",
            Disease::LiverDisease => "liver-disease",
            Disease::CovidSymptoms => "covid-symptoms",
            Disease::CovidDetection => "covid-detection",
            Disease::PneumoniaDetection => "pneumonia-detection",
        }
    }

    /// Parse a slug back to a disease identifier.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Disease> {
        Disease::ALL.iter().copied().find(|d| d.slug() == slug)
    }

    /// Handler name registered with the dispatcher for this disease.
    #[must_use]
    pub fn handler_name(&self) -> &'static str {
        match self {
            Disease::Diabetes => "predict_diabetes",
            Disease::HeartDisease => "predict_heart_disease",
            Disease::KidneyDisease => "predict_kidney_disease",
            Disease::LiverDisease => "predict_liver_disease",
            Disease::CovidSymptoms => "predict_covid_symptoms",
            Disease::CovidDetection => "predict_covid_detection",
            Disease::PneumoniaDetection => "predict_pneumonia_detection",
        }
    }

    /// Human-readable name used in prediction messages.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Disease::Diabetes => "Diabetes",
            Disease::HeartDisease => "Heart Disease",
            Disease::KidneyDisease => "Kidney Disease",
            Disease::LiverDisease => "Liver Disease",
            Disease::CovidSymptoms => "COVID-19 Symptoms",
            Disease::CovidDetection => "COVID-19 Detection",
            Disease::PneumoniaDetection => "Pneumonia Detection",
        }
    }

    /// Route path for this disease's prediction endpoint.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/api/predict/{}", self.slug())
    }
}

impl std::fmt::Display for Disease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// How a validated submission is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// JSON-encoded field map.
    Structured,
    /// Multipart upload of a single image file under the `image` field.
    BinaryImage,
}

/// Declared domain of a structured field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDomain {
    /// Numeric field with an inclusive lower bound and optional upper bound.
    Number { min: f64, max: Option<f64> },
    /// Categorical field restricted to a fixed option set.
    OneOf { options: &'static [&'static str] },
}

/// One named, typed, range-constrained field of a structured spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMeta {
    pub name: &'static str,
    pub domain: FieldDomain,
    pub required: bool,
}

impl FieldMeta {
    pub(crate) const fn number(name: &'static str) -> Self {
        FieldMeta {
            name,
            domain: FieldDomain::Number { min: 0.0, max: None },
            required: true,
        }
    }

    pub(crate) const fn number_capped(name: &'static str, max: f64) -> Self {
        FieldMeta {
            name,
            domain: FieldDomain::Number {
                min: 0.0,
                max: Some(max),
            },
            required: true,
        }
    }

    pub(crate) const fn one_of(name: &'static str, options: &'static [&'static str]) -> Self {
        FieldMeta {
            name,
            domain: FieldDomain::OneOf { options },
            required: true,
        }
    }

    pub(crate) const fn one_of_optional(
        name: &'static str,
        options: &'static [&'static str],
    ) -> Self {
        FieldMeta {
            name,
            domain: FieldDomain::OneOf { options },
            required: false,
        }
    }
}

/// Static descriptor of one disease's input contract.
///
/// Specs are built once at process start and shared behind `Arc`; the
/// compiled schema validator is reused for every submission.
pub struct DiseaseSpec {
    pub disease: Disease,
    /// Page title shown for this disease's form.
    pub title: &'static str,
    /// One-line description of the expected input.
    pub description: &'static str,
    pub mode: SubmissionMode,
    /// Ordered field set; empty for binary-image specs.
    pub fields: Vec<FieldMeta>,
    /// JSON Schema for the structured payload (`None` for image specs).
    pub schema: Option<Value>,
    pub(crate) compiled: Option<JSONSchema>,
}

impl DiseaseSpec {
    /// Precompiled schema validator, when the spec is structured.
    #[must_use]
    pub fn validator(&self) -> Option<&JSONSchema> {
        self.compiled.as_ref()
    }

    /// Number of declared fields (0 for image specs).
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Route metadata for this spec's endpoint.
    #[must_use]
    pub fn route(&self) -> RouteMeta {
        RouteMeta {
            method: Method::POST,
            path: self.disease.path(),
            handler_name: self.disease.handler_name().to_string(),
            disease: self.disease,
            mode: self.mode,
            request_schema: self.schema.clone(),
            request_body_required: true,
        }
    }
}

/// Route metadata consumed by the router and dispatcher.
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    pub path: String,
    pub handler_name: String,
    pub disease: Disease,
    pub mode: SubmissionMode,
    pub request_schema: Option<Value>,
    pub request_body_required: bool,
}
