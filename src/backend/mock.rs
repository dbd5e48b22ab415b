//! Mock prediction backend.
//!
//! Placeholder used until a genuine inference service is integrated: a
//! pseudo-random binary outcome with a pseudo-random confidence value in
//! [0.70, 0.90], echoing the input back as `details` for structured
//! requests.

use rand::Rng;

use super::{BackendRequest, PredictionBackend};
use crate::prediction::{Outcome, PredictionDetails, PredictionResponse};
use crate::registry::Disease;

/// Fixed `details` string returned for image requests; the stub never
/// inspects pixels.
pub const IMAGE_DETAILS_NOTE: &str = "Image processed (mock result)";

#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        MockBackend
    }

    fn mock_response(&self, disease: Disease, details: PredictionDetails) -> PredictionResponse {
        let mut rng = rand::thread_rng();
        let outcome = if rng.gen_bool(0.5) {
            Outcome::Positive
        } else {
            Outcome::Negative
        };
        let confidence: f64 = rng.gen_range(0.70..0.90);
        let message = format!(
            "{} for {} with {:.2}% confidence.",
            outcome.label(),
            disease.display_name(),
            confidence
        );
        PredictionResponse {
            prediction: outcome,
            message,
            details: Some(details),
        }
    }
}

impl PredictionBackend for MockBackend {
    fn predict(&self, request: BackendRequest<'_>) -> anyhow::Result<PredictionResponse> {
        let response = match request {
            BackendRequest::Structured { disease, payload } => {
                // Echo the input back for demonstration.
                self.mock_response(disease, PredictionDetails::Echo(payload.clone()))
            }
            BackendRequest::Image { disease, image } => {
                tracing::debug!(
                    disease = %disease,
                    image_bytes = image.len(),
                    "mocking image prediction"
                );
                self.mock_response(
                    disease,
                    PredictionDetails::ImageNote(IMAGE_DETAILS_NOTE.to_string()),
                )
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    #[test]
    fn test_message_matches_outcome() {
        let backend = MockBackend::new();
        let payload: Map<String, Value> = serde_json::from_value(serde_json::json!({
            "age": 45
        }))
        .unwrap();
        for _ in 0..32 {
            let resp = backend
                .predict(BackendRequest::Structured {
                    disease: Disease::Diabetes,
                    payload: &payload,
                })
                .unwrap();
            let expected = resp.prediction.label();
            assert!(resp.message.contains(expected));
            assert!(resp.message.contains("Diabetes"));
        }
    }

    #[test]
    fn test_structured_echoes_input() {
        let backend = MockBackend::new();
        let payload: Map<String, Value> =
            serde_json::from_value(serde_json::json!({"age": 45, "bmi": 22.5})).unwrap();
        let resp = backend
            .predict(BackendRequest::Structured {
                disease: Disease::Diabetes,
                payload: &payload,
            })
            .unwrap();
        let echoed = resp.details.unwrap();
        assert_eq!(
            echoed.echoed().and_then(|m| m.get("age")),
            Some(&serde_json::json!(45))
        );
    }

    #[test]
    fn test_image_details_is_placeholder() {
        let backend = MockBackend::new();
        let image = crate::dispatcher::ImagePayload {
            file_name: Some("xray.png".to_string()),
            content_type: Some("image/png".to_string()),
            bytes: vec![0u8; 16],
        };
        let resp = backend
            .predict(BackendRequest::Image {
                disease: Disease::PneumoniaDetection,
                image: &image,
            })
            .unwrap();
        assert_eq!(
            resp.details,
            Some(PredictionDetails::ImageNote(IMAGE_DETAILS_NOTE.to_string()))
        );
    }
}
