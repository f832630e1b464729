//! Boundary to the hosted generative model.
//!
//! Everything Contenize asks of the model goes through [`GenerativeModel`]:
//! one call that returns structured (JSON) text and one that returns an
//! inline image. [`GeminiClient`] implements it against the Gemini REST API;
//! tests swap in a scripted model.

mod gemini;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod wire;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use contenize_shared::{Attachment, ContenizeError, GenerationErrorKind, InlineImage};

pub use gemini::GeminiClient;

// ---------------------------------------------------------------------------
// Requests / responses
// ---------------------------------------------------------------------------

/// A request for schema-constrained JSON output.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// Natural-language instruction.
    pub prompt: String,
    /// Response schema (Gemini OpenAPI-subset dialect).
    pub schema: serde_json::Value,
    /// Files sent alongside the prompt as inline parts.
    pub attachments: Vec<Attachment>,
    /// Allow the model to ground its answer with web search.
    pub grounded: bool,
}

/// Raw text returned by a structured call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredResponse {
    pub text: String,
    /// Upstream finish reason (`STOP`, `MAX_TOKENS`, ...), when reported.
    pub finish_reason: Option<String>,
}

impl StructuredResponse {
    /// Whether the model stopped because it ran out of output tokens.
    pub fn hit_token_limit(&self) -> bool {
        self.finish_reason.as_deref() == Some("MAX_TOKENS")
    }
}

/// A request for one generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Visual description.
    pub prompt: String,
    /// Aspect ratio hint, e.g. `16:9` or `9:16`.
    pub aspect_ratio: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures at the model boundary.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The request never produced a usable HTTP response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The call succeeded but carried no text.
    #[error("the model returned an empty response")]
    EmptyResponse,

    /// The call succeeded but carried no image part.
    #[error("the model returned no image")]
    NoImage,

    /// The text is not JSON of the expected shape.
    #[error("malformed JSON response: {0}")]
    MalformedJson(String),

    /// The JSON ends before the document is complete.
    #[error("truncated JSON response: {0}")]
    TruncatedJson(String),
}

impl UpstreamError {
    /// The plan-generation failure kind this error maps to.
    pub fn generation_kind(&self) -> GenerationErrorKind {
        match self {
            Self::Transport(_) | Self::Api { .. } => GenerationErrorKind::Transport,
            Self::EmptyResponse | Self::NoImage => GenerationErrorKind::EmptyResponse,
            Self::MalformedJson(_) => GenerationErrorKind::MalformedResponse,
            Self::TruncatedJson(_) => GenerationErrorKind::TruncatedResponse,
        }
    }
}

impl From<UpstreamError> for ContenizeError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Transport(msg) => ContenizeError::Network(msg),
            other => ContenizeError::generation(other.generation_kind(), other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Model trait
// ---------------------------------------------------------------------------

/// The generative model as seen by Contenize.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Submit a prompt with a response schema and return the raw JSON text.
    async fn generate_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<StructuredResponse, UpstreamError>;

    /// Generate one image.
    async fn generate_image(&self, request: ImageRequest) -> Result<InlineImage, UpstreamError>;
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parse a structured response into `T`.
///
/// Blank text is [`UpstreamError::EmptyResponse`]. Text that stops mid-document
/// (or a response cut off by the token limit) is
/// [`UpstreamError::TruncatedJson`]; anything else that fails to parse is
/// [`UpstreamError::MalformedJson`].
pub fn decode_json<T: DeserializeOwned>(response: &StructuredResponse) -> Result<T, UpstreamError> {
    let text = strip_code_fence(response.text.trim());
    if text.is_empty() {
        return Err(UpstreamError::EmptyResponse);
    }

    serde_json::from_str(text).map_err(|e| {
        if e.is_eof() || (response.hit_token_limit() && !e.is_data()) {
            UpstreamError::TruncatedJson(e.to_string())
        } else {
            UpstreamError::MalformedJson(e.to_string())
        }
    })
}

/// Models occasionally wrap JSON in a Markdown code fence despite JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Probe {
        name: String,
    }

    fn response(text: &str) -> StructuredResponse {
        StructuredResponse {
            text: text.to_string(),
            finish_reason: Some("STOP".into()),
        }
    }

    #[test]
    fn decode_valid_json() {
        let probe: Probe = decode_json(&response(r#"{"name":"ok"}"#)).unwrap();
        assert_eq!(probe.name, "ok");
    }

    #[test]
    fn decode_fenced_json() {
        let probe: Probe = decode_json(&response("```json\n{\"name\":\"fenced\"}\n```")).unwrap();
        assert_eq!(probe.name, "fenced");
    }

    #[test]
    fn whitespace_is_empty_response() {
        let err = decode_json::<Probe>(&response("  \n\t ")).unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyResponse));
        assert_eq!(err.generation_kind(), GenerationErrorKind::EmptyResponse);
    }

    #[test]
    fn cut_off_json_is_truncated() {
        let err = decode_json::<Probe>(&response(r#"{"name":"trunc"#)).unwrap_err();
        assert!(matches!(err, UpstreamError::TruncatedJson(_)));
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = decode_json::<Probe>(&response(r#"{"title":"x"}"#)).unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedJson(_)));

        let err = decode_json::<Probe>(&response("not json at all")).unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedJson(_)));
    }

    #[test]
    fn token_limit_marks_syntax_errors_truncated() {
        let resp = StructuredResponse {
            text: r#"{"name":"x",,"#.into(),
            finish_reason: Some("MAX_TOKENS".into()),
        };
        assert!(resp.hit_token_limit());
        let err = decode_json::<Probe>(&resp).unwrap_err();
        assert!(matches!(err, UpstreamError::TruncatedJson(_)));
    }

    #[test]
    fn upstream_error_converts() {
        let err: ContenizeError = UpstreamError::Transport("connection reset".into()).into();
        assert!(matches!(err, ContenizeError::Network(_)));

        let err: ContenizeError = UpstreamError::TruncatedJson("eof".into()).into();
        assert_eq!(
            err.generation_kind(),
            Some(GenerationErrorKind::TruncatedResponse)
        );
    }
}
