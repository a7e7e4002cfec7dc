//! Codec error types.

use thiserror::Error;

/// Failures while encoding or decoding an Omaha document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The peer labelled the body with something other than XML
    #[error("unsupported content type {0:?}")]
    InvalidContentType(String),

    /// The document declares a protocol version other than 3.0
    #[error("unsupported omaha protocol version {0:?}")]
    UnsupportedProtocol(String),

    /// The body is not a valid document for the schema
    #[error("malformed omaha document: {0}")]
    Malformed(String),

    /// No document was read
    #[error("empty omaha document")]
    EmptyBody,

    /// The size ceiling cut the document short
    #[error("omaha document exceeds the size limit")]
    TruncatedBody,

    /// The model could not be serialized; a bug rather than bad input
    #[error("failed to encode omaha document: {0}")]
    Encode(String),
}
