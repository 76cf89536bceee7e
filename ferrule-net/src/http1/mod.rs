mod chunk;
mod config;
mod decoder;
mod error;
mod framing;
mod header;
mod scanner;
mod stream;
mod types;
mod version;

pub use chunk::{is_excluded_trailer, parse_chunk_size};
pub use config::DecoderConfig;
pub use decoder::{DecoderState, Http1Decoder, ResetHandle};
pub use error::{ConfigError, DecodeError};
pub use framing::{
    BodyFraming, is_chunked, is_content_always_empty, is_switching_to_non_http1, select_framing,
};
pub use stream::MessageStream;
pub use types::{
    DecodeEvent, DecodeFailure, DecodeResult, Direction, FailedObject, Header, HeaderMap,
    LastContent, MessageHead, RequestLine, StartLine, StatusLine,
};
pub use version::HttpVersion;
