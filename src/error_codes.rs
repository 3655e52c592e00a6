use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

pub const EMPTY_FRAME_SEQUENCE: &str = "EMPTY_FRAME_SEQUENCE";
pub const ARTIFACT_WRITE_FAILED: &str = "ARTIFACT_WRITE_FAILED";
pub const INVALID_RENDER_CONFIG: &str = "INVALID_RENDER_CONFIG";
pub const UNKNOWN_ANIMATION_CLASS: &str = "UNKNOWN_ANIMATION_CLASS";
/// Used in JSON envelopes for failures that carry no specific code.
pub const RENDER_FAILED: &str = "RENDER_FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedErrorKind {
    /// Bad configuration or catalog input.
    Usage,
    /// A single animation's run could not produce its artifact.
    Run,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Usage,
        }
    }

    pub fn run(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Run,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Envelope for any error: the coded error's own when present, otherwise a
/// `RENDER_FAILED` envelope carrying the full context chain.
pub fn envelope_for(error: &Error) -> ErrorEnvelope {
    match find_coded_error(error) {
        Some(coded) => coded.envelope(),
        None => CodedError::run(RENDER_FAILED, format!("{error:#}")).envelope(),
    }
}
