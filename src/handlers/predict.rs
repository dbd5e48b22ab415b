//! Prediction controllers.
//!
//! Two typed handlers cover all seven routes: one for structured (JSON)
//! submissions, one for binary-image submissions. Each instance is
//! parameterized by its registry spec and the shared backend, so there is no
//! per-disease branching anywhere in the handler layer.

use std::convert::TryFrom;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use crate::backend::{BackendRequest, PredictionBackend};
use crate::dispatcher::{HandlerRequest, ImagePayload};
use crate::prediction::PredictionResponse;
use crate::registry::DiseaseSpec;
use crate::typed::{Handler, TypedHandlerRequest};

/// Parsed JSON object body of a structured submission.
#[derive(Debug, Clone)]
pub struct StructuredInput(pub Map<String, Value>);

impl TryFrom<HandlerRequest> for StructuredInput {
    type Error = anyhow::Error;

    fn try_from(req: HandlerRequest) -> Result<Self> {
        match req.body {
            Some(Value::Object(map)) => Ok(StructuredInput(map)),
            Some(_) => bail!("request body must be a JSON object"),
            None => bail!("request body required"),
        }
    }
}

/// Uploaded image of a binary-image submission.
#[derive(Debug, Clone)]
pub struct ImageInput(pub ImagePayload);

impl TryFrom<HandlerRequest> for ImageInput {
    type Error = anyhow::Error;

    fn try_from(req: HandlerRequest) -> Result<Self> {
        match req.image {
            Some(image) if !image.is_empty() => Ok(ImageInput(image)),
            _ => bail!("multipart image upload required"),
        }
    }
}

/// Handler for structured (symptom/lab) prediction routes.
pub struct SymptomController {
    pub spec: Arc<DiseaseSpec>,
    pub backend: Arc<dyn PredictionBackend>,
}

impl Handler for SymptomController {
    type Request = StructuredInput;
    type Response = PredictionResponse;

    fn handle(&self, req: TypedHandlerRequest<StructuredInput>) -> Result<PredictionResponse> {
        self.backend.predict(BackendRequest::Structured {
            disease: self.spec.disease,
            payload: &req.data.0,
        })
    }
}

/// Handler for image-based prediction routes.
pub struct ImageController {
    pub spec: Arc<DiseaseSpec>,
    pub backend: Arc<dyn PredictionBackend>,
}

impl Handler for ImageController {
    type Request = ImageInput;
    type Response = PredictionResponse;

    fn handle(&self, req: TypedHandlerRequest<ImageInput>) -> Result<PredictionResponse> {
        self.backend.predict(BackendRequest::Image {
            disease: self.spec.disease,
            image: &req.data.0,
        })
    }
}
