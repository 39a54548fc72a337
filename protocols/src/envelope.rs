//! The RPC envelope exchanged between a Dispatcher and a Service.
//!
//! Every response carries an explicit `response_model_class` tag naming the
//! concrete payload type. Earlier iterations of this protocol inferred
//! success/failure from the presence of a `status` field, which broke
//! silently whenever a worker's payload happened to contain a field named
//! `status`. Tagging the envelope removes the ambiguity.

use serde::{Deserialize, Serialize};

/// A tagged request or response crossing the Dispatcher <-> Service RPC
/// boundary. `payload` is the modality-specific body (see [`crate::llm`],
/// [`crate::audio`], [`crate::image`]) serialized as JSON so the RPC layer
/// itself stays payload-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Name of the concrete type `payload` deserializes to, e.g.
    /// `"ChatResponse"` or `"MethodCallError"`.
    pub response_model_class: String,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn ok(model_class: impl Into<String>, payload: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            response_model_class: model_class.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn error(err: MethodCallError) -> Self {
        Self {
            response_model_class: MethodCallError::MODEL_CLASS.to_string(),
            payload: serde_json::to_value(err).expect("MethodCallError always serializes"),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response_model_class == MethodCallError::MODEL_CLASS
    }

    pub fn into_error(self) -> Option<MethodCallError> {
        self.is_error()
            .then(|| serde_json::from_value(self.payload).ok())
            .flatten()
    }
}

/// The failure envelope payload. Tagged by `response_model_class ==
/// "MethodCallError"` at the [`Envelope`] level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCallError {
    pub error_code: String,
    pub message: String,
}

impl MethodCallError {
    pub const MODEL_CLASS: &'static str = "MethodCallError";

    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Dummy {
        status: String,
    }

    #[test]
    fn envelope_tag_disambiguates_payload_with_a_status_field() {
        let ok = Envelope::ok("Dummy", Dummy { status: "ready".into() }).unwrap();
        assert!(!ok.is_error());

        let err = Envelope::error(MethodCallError::new("timeout", "worker did not respond"));
        assert!(err.is_error());
        assert_eq!(err.into_error().unwrap().error_code, "timeout");
    }
}
