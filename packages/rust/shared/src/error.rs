//! Error types for Contenize.
//!
//! Library crates use [`ContenizeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Why a plan generation request failed.
///
/// The kinds are kept apart so the caller can give different guidance:
/// a truncated response usually means the input was too large, an empty
/// one is usually worth a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The upstream call itself failed (network, quota, timeout, HTTP status).
    Transport,
    /// The upstream call succeeded but returned no text.
    EmptyResponse,
    /// The returned text is not JSON matching the plan schema.
    MalformedResponse,
    /// The returned JSON ends early (output token limit reached).
    TruncatedResponse,
    /// A requested channel has no slice in the response.
    MissingChannel,
}

impl GenerationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::EmptyResponse => "empty response",
            Self::MalformedResponse => "malformed response",
            Self::TruncatedResponse => "truncated response",
            Self::MissingChannel => "missing channel",
        }
    }
}

impl std::fmt::Display for GenerationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level error type for all Contenize operations.
#[derive(Debug, thiserror::Error)]
pub enum ContenizeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the generative model API.
    #[error("network error: {0}")]
    Network(String),

    /// Plan generation failed; blocks showing any plan.
    #[error("generation failed ({kind}): {message}")]
    Generation {
        kind: GenerationErrorKind,
        message: String,
    },

    /// Image generation for a single slice failed.
    #[error("illustration error: {0}")]
    Illustration(String),

    /// AI-assisted slice revision failed.
    #[error("edit error: {0}")]
    Edit(String),

    /// Report composition, rendering or saving failed.
    #[error("export error: {0}")]
    Export(String),

    /// JSON (de)serialization error outside the upstream boundary.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (brief, plan file, slice id, ...).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContenizeError>;

impl ContenizeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a generation error of the given kind.
    pub fn generation(kind: GenerationErrorKind, msg: impl Into<String>) -> Self {
        Self::Generation {
            kind,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The generation failure kind, if this is a plan-level failure.
    pub fn generation_kind(&self) -> Option<GenerationErrorKind> {
        match self {
            Self::Generation { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// User-facing title, message and suggested fixes for this error.
    pub fn guidance(&self) -> ErrorDetail {
        match self {
            Self::Generation { kind, message } => {
                let solutions = match kind {
                    GenerationErrorKind::TruncatedResponse => vec![
                        "Shorten the cornerstone content".to_string(),
                        "Reduce the channel count to 3".to_string(),
                    ],
                    GenerationErrorKind::MalformedResponse
                    | GenerationErrorKind::MissingChannel => vec![
                        "Reduce the channel count to 3".to_string(),
                        "Simplify the cornerstone text".to_string(),
                        "Retry".to_string(),
                    ],
                    GenerationErrorKind::EmptyResponse => vec!["Retry".to_string()],
                    GenerationErrorKind::Transport => vec![
                        "Check your network connection and API key".to_string(),
                        "Retry in a moment".to_string(),
                    ],
                };
                ErrorDetail {
                    title: "Strategy Interrupted".to_string(),
                    message: message.clone(),
                    solutions,
                }
            }
            Self::Export(_) => ErrorDetail {
                title: "Export Failed".to_string(),
                message: "PDF export failed.".to_string(),
                solutions: vec!["Retry the export".to_string()],
            },
            other => ErrorDetail {
                title: "Something Went Wrong".to_string(),
                message: other.to_string(),
                solutions: Vec::new(),
            },
        }
    }
}

impl From<serde_json::Error> for ContenizeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Structured, user-visible description of a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub title: String,
    pub message: String,
    pub solutions: Vec<String>,
}
