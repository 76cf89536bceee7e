mod http1;

pub use http1::{
    BodyFraming, ConfigError, DecodeError, DecodeEvent, DecodeFailure, DecodeResult,
    DecoderConfig, DecoderState, Direction, FailedObject, Header, HeaderMap, Http1Decoder,
    HttpVersion, LastContent, MessageHead, MessageStream, RequestLine, ResetHandle, StartLine,
    StatusLine, is_chunked, is_content_always_empty, is_excluded_trailer,
    is_switching_to_non_http1, parse_chunk_size, select_framing,
};
