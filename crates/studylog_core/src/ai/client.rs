//! Text-generation client contract.
//!
//! # Responsibility
//! - Define the injected `TextGenerator` seam and its request/response types.
//! - Classify remote failures into `AiError` with canned user messages.
//! - Interpret finish reasons: filtered and empty outputs become errors,
//!   length-capped outputs are kept and flagged.
//!
//! # Invariants
//! - No vendor-specific parameter names leak into this module.

use crate::ai::effort::ReasoningEffort;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub effort: ReasoningEffort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub reasoning_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
    /// Set when the model declined to answer.
    pub refusal: Option<String>,
}

impl GenerationResponse {
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: FinishReason::Stop,
            usage: None,
            refusal: None,
        }
    }
}

/// Remote text generation. Implementations own transport and credentials.
pub trait TextGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, AiError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, AiError> {
        (**self).generate(request)
    }
}

impl<T: TextGenerator + ?Sized> TextGenerator for Box<T> {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, AiError> {
        (**self).generate(request)
    }
}

/// Accepted generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedText {
    pub text: String,
    /// The output hit the token cap and may be cut off.
    pub truncated: bool,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    RateLimited(String),
    Authentication(String),
    Timeout,
    Connection(String),
    BadRequest(String),
    ContentFiltered,
    Refused(String),
    EmptyResponse { finish_reason: String },
    /// Output did not have the requested structure.
    MalformedOutput(String),
    Server(String),
    Other(String),
}

impl AiError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout | Self::Connection(_) | Self::Server(_)
        )
    }

    /// Stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "rate_limited",
            Self::Authentication(_) => "authentication",
            Self::Timeout => "timeout",
            Self::Connection(_) => "connection",
            Self::BadRequest(_) => "bad_request",
            Self::ContentFiltered => "content_filtered",
            Self::Refused(_) => "refused",
            Self::EmptyResponse { .. } => "empty_response",
            Self::MalformedOutput(_) => "malformed_output",
            Self::Server(_) => "server",
            Self::Other(_) => "other",
        }
    }

    /// Message safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited(_) => "Rate limit reached. Please wait a moment and try again.",
            Self::Authentication(_) => "Authentication failed. Check the configured API key.",
            Self::Timeout => "The request timed out. Please try again.",
            Self::Connection(_) => "Connection error. Check your network connection.",
            Self::BadRequest(_) => "The request was rejected. Try shortening the input.",
            Self::ContentFiltered => {
                "The response was blocked by the content policy. Please revise the request."
            }
            Self::Refused(_) => "The model declined to answer this request.",
            Self::EmptyResponse { .. } => "No response was generated. Please try again.",
            Self::MalformedOutput(_) => "The response could not be understood. Please try again.",
            Self::Server(_) => "The service had a temporary problem. Please try again later.",
            Self::Other(_) => "An unexpected error occurred.",
        }
    }
}

impl Display for AiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited(message) => write!(f, "rate limited: {message}"),
            Self::Authentication(message) => write!(f, "authentication failed: {message}"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Connection(message) => write!(f, "connection error: {message}"),
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::ContentFiltered => write!(f, "response blocked by content filter"),
            Self::Refused(message) => write!(f, "model refused: {message}"),
            Self::EmptyResponse { finish_reason } => {
                write!(f, "empty response (finish_reason={finish_reason})")
            }
            Self::MalformedOutput(message) => write!(f, "malformed output: {message}"),
            Self::Server(message) => write!(f, "server error: {message}"),
            Self::Other(message) => write!(f, "generation failed: {message}"),
        }
    }
}

impl Error for AiError {}

/// Applies the finish-reason policy to a raw response.
pub fn interpret_response(response: GenerationResponse) -> Result<GeneratedText, AiError> {
    if let Some(refusal) = response.refusal {
        return Err(AiError::Refused(refusal));
    }
    if response.finish_reason == FinishReason::ContentFilter {
        return Err(AiError::ContentFiltered);
    }
    if response.text.trim().is_empty() {
        return Err(AiError::EmptyResponse {
            finish_reason: response.finish_reason.as_str().to_string(),
        });
    }
    Ok(GeneratedText {
        truncated: response.finish_reason == FinishReason::Length,
        text: response.text,
        usage: response.usage,
    })
}

#[cfg(test)]
mod tests {
    use super::{interpret_response, AiError, FinishReason, GenerationResponse};

    #[test]
    fn length_cap_keeps_text_and_flags_truncation() {
        let response = GenerationResponse {
            finish_reason: FinishReason::Length,
            ..GenerationResponse::completed("partial plan")
        };
        let text = interpret_response(response).expect("interpret response succeeds");
        assert!(text.truncated);
        assert_eq!(text.text, "partial plan");
    }

    #[test]
    fn content_filter_and_blank_text_are_errors() {
        let filtered = GenerationResponse {
            finish_reason: FinishReason::ContentFilter,
            ..GenerationResponse::completed("ignored")
        };
        assert_eq!(interpret_response(filtered).expect_err("interpret response must fail"), AiError::ContentFiltered);

        let blank = GenerationResponse::completed("   ");
        assert!(matches!(
            interpret_response(blank).expect_err("interpret response must fail"),
            AiError::EmptyResponse { .. }
        ));
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(AiError::RateLimited("slow down".into()).is_retryable());
        assert!(AiError::Server("503".into()).is_retryable());
        assert!(!AiError::Authentication("bad key".into()).is_retryable());
        assert!(!AiError::ContentFiltered.is_retryable());
    }
}
