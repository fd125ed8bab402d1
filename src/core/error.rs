use thiserror::Error;

use crate::edgar::parsing::SemanticTag;

/// Failure to obtain the filing document. Fatal for a run.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("HTTP request to {url} failed with status: {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document locator: {0}")]
    InvalidLocator(String),

    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// The answer came back but did not carry a usable payload.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("no delimited payload found in response")]
    MissingDelimiter,

    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload failed validation: {0}")]
    Schema(String),
}

#[derive(Error, Debug)]
pub enum RefineError {
    /// Network or service failure talking to the text-generation backend.
    #[error("text generation request failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl RefineError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RefineError::Transport(_))
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("could not acquire filing: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("refinement of table #{ordinal} for {tag} failed: {source}")]
    Refinement {
        tag: SemanticTag,
        ordinal: usize,
        #[source]
        source: RefineError,
    },
}
