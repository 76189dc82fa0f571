//! Error types for submission to the collection API.

use thiserror::Error;

/// Submission-time failures. None of these are retried automatically;
/// the single conflict-resolution pass is driven by the caller, and any
/// other failure is surfaced with the server's message verbatim.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The API base URL could not be interpreted.
    #[error("invalid API base URL '{value}'")]
    InvalidBaseUrl { value: String },

    /// HTTP client construction failed.
    #[error("failed to construct HTTP client: {source}")]
    ClientBuild { source: reqwest::Error },

    /// The record could not be encoded for the wire.
    #[error("failed to encode work payload: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    /// Transport-level fault reaching the API.
    #[error("network error submitting to {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    /// A non-success, non-conflict response; `message` is the raw body,
    /// reported to the operator verbatim.
    #[error("server rejected submission (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// A success or conflict status whose body did not match the
    /// documented shape.
    #[error("malformed response (HTTP {status}): {detail}")]
    MalformedResponse { status: u16, detail: String },

    /// The resource import channel reported a non-zero code.
    #[error("resource import rejected: {message}")]
    ImportRejected { message: String },
}
