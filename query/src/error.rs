use thiserror::Error;

/// Failure to turn query text into a document. Every variant carries the
/// fragment the user has to fix.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unterminated string literal starting at {fragment:?}")]
    UnterminatedString { fragment: String },
    #[error("unterminated regex literal starting at {fragment:?}")]
    UnterminatedRegex { fragment: String },
    #[error("unknown constructor {name}(...)")]
    UnknownConstructor { name: String },
    #[error("malformed {name}(...) call near {fragment:?}")]
    MalformedConstructor { name: String, fragment: String },
    #[error("invalid date {fragment:?}: expected RFC 3339, YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS")]
    InvalidDate { fragment: String },
    #[error("error parsing query {query}: {source}")]
    InvalidJson {
        query: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {wrapper} value {fragment}: {message}")]
    InvalidExtendedJson {
        wrapper: String,
        fragment: String,
        message: String,
    },
    #[error("query must be a document, got {fragment}")]
    NotADocument { fragment: String },
}

impl CompileError {
    pub(crate) fn extended(
        wrapper: &str,
        fragment: &serde_json::Value,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidExtendedJson {
            wrapper: wrapper.to_string(),
            fragment: fragment.to_string(),
            message: message.into(),
        }
    }

    /// The piece of input text this error points at.
    pub fn fragment(&self) -> &str {
        match self {
            CompileError::UnterminatedString { fragment }
            | CompileError::UnterminatedRegex { fragment }
            | CompileError::MalformedConstructor { fragment, .. }
            | CompileError::InvalidDate { fragment }
            | CompileError::InvalidExtendedJson { fragment, .. }
            | CompileError::NotADocument { fragment } => fragment,
            CompileError::UnknownConstructor { name } => name,
            CompileError::InvalidJson { query, .. } => query,
        }
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("cannot indent invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
}
