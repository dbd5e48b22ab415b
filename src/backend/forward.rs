//! Forwarding prediction backend.
//!
//! Relays requests to a real inference service instead of fabricating
//! results: structured payloads are re-encoded as JSON, image uploads as
//! multipart form data under the `image` field. The downstream call carries
//! a bounded timeout so a stuck inference service cannot pin a handler
//! coroutine indefinitely.

use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use super::{BackendRequest, PredictionBackend};
use crate::prediction::PredictionResponse;
use crate::registry::IMAGE_FIELD;

pub struct ForwardingBackend {
    base_url: String,
    http: Client,
}

impl ForwardingBackend {
    /// Create a backend forwarding to `base_url` (no trailing slash) with
    /// the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build forwarding HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, request: &BackendRequest<'_>) -> String {
        format!("{}{}", self.base_url, request.disease().path())
    }
}

impl PredictionBackend for ForwardingBackend {
    fn predict(&self, request: BackendRequest<'_>) -> anyhow::Result<PredictionResponse> {
        let url = self.endpoint(&request);
        let response = match &request {
            BackendRequest::Structured { payload, .. } => self
                .http
                .post(&url)
                .json(payload)
                .send()
                .with_context(|| format!("inference request to {url} failed"))?,
            BackendRequest::Image { image, .. } => {
                let mut part = Part::bytes(image.bytes.clone());
                if let Some(name) = &image.file_name {
                    part = part.file_name(name.clone());
                }
                if let Some(mime) = &image.content_type {
                    part = part
                        .mime_str(mime)
                        .with_context(|| format!("invalid image content type {mime}"))?;
                }
                let form = Form::new().part(IMAGE_FIELD, part);
                self.http
                    .post(&url)
                    .multipart(form)
                    .send()
                    .with_context(|| format!("inference request to {url} failed"))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!(
                "inference service returned {status}: {}",
                if body.is_empty() { "<empty body>" } else { &body }
            ));
        }

        response
            .json::<PredictionResponse>()
            .context("inference service returned an undecodable body")
    }
}
