//! # Backend Module
//!
//! The prediction capability behind the edge router. Handlers never fabricate
//! results themselves: they hand the parsed body or image bytes to a
//! [`PredictionBackend`] and relay whatever comes back, so swapping the mock
//! for a real inference service is a wiring change, not a router change.

mod forward;
mod mock;

pub use forward::ForwardingBackend;
pub use mock::MockBackend;

use serde_json::{Map, Value};

use crate::dispatcher::ImagePayload;
use crate::prediction::PredictionResponse;
use crate::registry::Disease;

/// One prediction request as seen by a backend: the disease it targets plus
/// either the parsed structured payload or the uploaded image bytes.
#[derive(Debug)]
pub enum BackendRequest<'a> {
    Structured {
        disease: Disease,
        payload: &'a Map<String, Value>,
    },
    Image {
        disease: Disease,
        image: &'a ImagePayload,
    },
}

impl BackendRequest<'_> {
    #[must_use]
    pub fn disease(&self) -> Disease {
        match self {
            BackendRequest::Structured { disease, .. } => *disease,
            BackendRequest::Image { disease, .. } => *disease,
        }
    }
}

/// Capability that produces a [`PredictionResponse`] for a request.
///
/// Implementations must preserve the response contract: `prediction` is
/// exactly 0 or 1 and `message` names the outcome. The stub implementation
/// is [`MockBackend`]; [`ForwardingBackend`] relays to a real inference
/// service.
pub trait PredictionBackend: Send + Sync {
    /// Produce a prediction for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot produce a result (e.g. the
    /// downstream inference service is unreachable). Errors are terminal for
    /// the request; nothing is retried.
    fn predict(&self, request: BackendRequest<'_>) -> anyhow::Result<PredictionResponse>;
}
