//! Prediction client - the request dispatcher for form submissions.
//!
//! Maps a disease identifier to its validation schema and submission
//! strategy, validates raw input fully before any network activity, and
//! issues exactly one outbound request per submission. Validation failures
//! are reported per field and never leave the process; transport failures
//! surface as a single human-readable message. Nothing is retried.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::prediction::PredictionResponse;
use crate::registry::{self, Disease, SubmissionMode, ACCEPTED_IMAGE_TYPES, IMAGE_FIELD, MAX_IMAGE_BYTES};
use crate::validator::{self, FieldViolation};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client configuration. A single value - the backend base URL - selects
/// where submissions go; it defaults to a local address when unset.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read `MEDIGATE_BASE_URL` / `MEDIGATE_TIMEOUT_SECS` from the
    /// environment, defaulting to a local gateway.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("MEDIGATE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = std::env::var("MEDIGATE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        ClientConfig { base_url, timeout }
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        }
    }
}

/// Transport-layer failure: the one user-visible message for anything that
/// goes wrong after validation passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never completed (connect failure, timeout, ...).
    Request(String),
    /// The server answered with a non-2xx status.
    Status { status: u16, message: String },
    /// The 2xx body did not decode as a prediction response.
    Decode(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Request(msg) => write!(f, "request failed: {msg}"),
            TransportError::Status { status, message } => {
                write!(f, "prediction failed ({status}): {message}")
            }
            TransportError::Decode(msg) => write!(f, "invalid prediction response: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Why a submission did not produce a prediction.
///
/// `Validation` is reported before any network call; `Transport` wraps a
/// failed or rejected call. Both are terminal for the submission.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    Validation(Vec<FieldViolation>),
    Transport(TransportError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Validation(violations) => {
                write!(f, "validation failed: ")?;
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            DispatchError::Transport(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        DispatchError::Transport(err)
    }
}

/// An image file selected for upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Client-side checks an upload must pass before any network call:
    /// size cap and accepted formats.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();
        if self.bytes.len() > MAX_IMAGE_BYTES {
            violations.push(FieldViolation::new(IMAGE_FIELD, "Max image size is 5MB."));
        }
        if !ACCEPTED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            violations.push(FieldViolation::new(
                IMAGE_FIELD,
                "Only .jpg, .jpeg, and .png formats are supported.",
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Blocking prediction client.
pub struct PredictionClient {
    base_url: String,
    http: Client,
}

impl PredictionClient {
    /// Build a client with a bounded per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build prediction HTTP client")?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, disease: Disease) -> String {
        format!("{}{}", self.base_url, disease.path())
    }

    /// Submit a structured (JSON) prediction request.
    ///
    /// Raw field values arrive as strings, exactly as a form produces them;
    /// numeric fields are coerced before range checks. A validation failure
    /// returns the full violation list and performs no network call.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Validation`] for schema violations,
    /// [`DispatchError::Transport`] for network or server failures.
    pub fn predict(
        &self,
        disease: Disease,
        fields: &HashMap<String, String>,
    ) -> Result<PredictionResponse, DispatchError> {
        let spec = registry::spec(disease);
        if spec.mode != SubmissionMode::Structured {
            return Err(DispatchError::Validation(vec![FieldViolation::new(
                IMAGE_FIELD,
                format!("{disease} expects an image upload, not a field map"),
            )]));
        }

        let payload = validator::validate_structured(&spec, fields)
            .map_err(DispatchError::Validation)?;

        debug!(disease = %disease, fields = payload.len(), "submitting structured prediction");
        let response = self
            .http
            .post(self.endpoint(disease))
            .json(&Value::Object(payload))
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Self::decode(disease, response)
    }

    /// Submit a binary-image prediction request.
    ///
    /// Oversized files and unsupported formats are rejected client-side
    /// without a network call; the upload goes out as multipart form data
    /// under the `image` field.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Validation`] for rejected uploads,
    /// [`DispatchError::Transport`] for network or server failures.
    pub fn predict_image(
        &self,
        disease: Disease,
        upload: &ImageUpload,
    ) -> Result<PredictionResponse, DispatchError> {
        let spec = registry::spec(disease);
        if spec.mode != SubmissionMode::BinaryImage {
            return Err(DispatchError::Validation(vec![FieldViolation::new(
                IMAGE_FIELD,
                format!("{disease} expects a structured field map, not an image"),
            )]));
        }

        upload.validate().map_err(DispatchError::Validation)?;

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        debug!(
            disease = %disease,
            file_name = %upload.file_name,
            bytes = upload.bytes.len(),
            "submitting image prediction"
        );
        let response = self
            .http
            .post(self.endpoint(disease))
            .multipart(form)
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Self::decode(disease, response)
    }

    fn decode(
        disease: Disease,
        response: reqwest::blocking::Response,
    ) -> Result<PredictionResponse, DispatchError> {
        let status = response.status();
        if !status.is_success() {
            // The edge router reports input errors as {"error": "..."} and
            // unmatched routes as plain text; surface whichever we got.
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| {
                    if body.is_empty() {
                        "Prediction failed".to_string()
                    } else {
                        body.clone()
                    }
                });
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let prediction = response
            .json::<PredictionResponse>()
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        info!(
            disease = %disease,
            prediction = prediction.prediction.as_u8(),
            "prediction received"
        );
        Ok(prediction)
    }
}
