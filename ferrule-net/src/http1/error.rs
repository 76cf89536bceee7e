use thiserror::Error;

/// Why a message could not be decoded.
///
/// Values of this type never escape the decoder as `Err`; they travel inside
/// [`DecodeEvent::DecodeFailure`](super::DecodeEvent::DecodeFailure) and in the
/// `result` field of the message they spoiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("an HTTP line is larger than {limit} bytes")]
    LineTooLong { limit: usize },
    #[error("HTTP header is larger than {limit} bytes")]
    HeaderTooLong { limit: usize },
    #[error("invalid chunk size: {0}")]
    MalformedChunkSize(String),
    #[error("premature closure: {0}")]
    PrematureClosure(&'static str),
    #[error("chunked messages not supported")]
    UnsupportedChunkedEncoding,
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),
    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid decoder configuration: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error("decoder configuration IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decoder configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
