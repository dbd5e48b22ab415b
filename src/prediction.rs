//! Prediction wire types.
//!
//! The response shape is the contract every backend must preserve:
//! `{ prediction: 0|1, message: string, details?: any }`.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Binary prediction outcome, serialized as the integers 0/1.
///
/// Using an enum instead of a raw integer makes the 0-or-1 invariant hold by
/// construction on both sides of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Negative,
    Positive,
}

impl Outcome {
    #[must_use]
    pub fn is_positive(&self) -> bool {
        matches!(self, Outcome::Positive)
    }

    /// Word used in prediction messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Negative => "Negative",
            Outcome::Positive => "Positive",
        }
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            Outcome::Negative => 0,
            Outcome::Positive => 1,
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Outcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Outcome::Negative),
            1 => Ok(Outcome::Positive),
            other => Err(D::Error::custom(format!(
                "prediction must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Opaque diagnostic payload attached to a prediction, discriminated by
/// submission category and serialized untagged to keep the wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionDetails {
    /// Structured submissions echo the parsed input back.
    Echo(Map<String, Value>),
    /// Image submissions carry a fixed note (the stub never inspects pixels).
    ImageNote(String),
    /// Free-form diagnostic data from a real inference backend.
    Other(Value),
}

impl PredictionDetails {
    /// Convenience accessor for echoed input fields.
    #[must_use]
    pub fn echoed(&self) -> Option<&Map<String, Value>> {
        match self {
            PredictionDetails::Echo(map) => Some(map),
            _ => None,
        }
    }
}

/// A single prediction result as produced by a backend and rendered to the
/// caller. Produced once per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: Outcome,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<PredictionDetails>,
}
