use bytes::{Bytes, BytesMut};

use super::error::DecodeError;
use super::types::{Direction, HeaderMap, MessageHead, StartLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    Empty,
    FixedLength(u64),
    Chunked,
    UntilClose,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ContentLength {
    #[default]
    Unknown,
    Absent,
    Known(u64),
}

#[derive(Debug, Default)]
pub(crate) struct ContentFramer {
    content_length: ContentLength,
    remaining: u64,
}

impl ContentFramer {
    pub fn reset(&mut self) {
        self.content_length = ContentLength::Unknown;
        self.remaining = 0;
    }

    pub fn content_length(&mut self, head: &MessageHead) -> Result<Option<u64>, DecodeError> {
        if self.content_length == ContentLength::Unknown {
            let length = match parse_content_length(&head.headers)? {
                Some(length) => Some(length),
                None => websocket_content_length(head),
            };
            self.content_length = match length {
                Some(length) => ContentLength::Known(length),
                None => ContentLength::Absent,
            };
        }
        Ok(self.declared_length())
    }

    pub fn declared_length(&self) -> Option<u64> {
        match self.content_length {
            ContentLength::Known(length) => Some(length),
            ContentLength::Unknown | ContentLength::Absent => None,
        }
    }

    pub fn resolve(
        &mut self,
        direction: Direction,
        head: &MessageHead,
    ) -> Result<BodyFraming, DecodeError> {
        if direction == Direction::Response && is_content_always_empty(head) {
            return Ok(BodyFraming::Empty);
        }
        if is_chunked(&head.headers) {
            return Ok(BodyFraming::Chunked);
        }
        let framing = match self.content_length(head)? {
            Some(length) => BodyFraming::FixedLength(length),
            None if direction == Direction::Request => BodyFraming::Empty,
            None => BodyFraming::UntilClose,
        };
        if let BodyFraming::FixedLength(length) = framing {
            self.remaining = length;
        }
        Ok(framing)
    }

    pub fn read_fixed(&mut self, src: &mut BytesMut, max_chunk_size: usize) -> Option<(Bytes, bool)> {
        let data = take_slice(src, max_chunk_size, self.remaining)?;
        self.remaining -= data.len() as u64;
        Some((data, self.remaining == 0))
    }
}

pub fn select_framing(direction: Direction, head: &MessageHead) -> Result<BodyFraming, DecodeError> {
    ContentFramer::default().resolve(direction, head)
}

pub(crate) fn take_slice(src: &mut BytesMut, max: usize, remaining: u64) -> Option<Bytes> {
    let limit = usize::try_from(remaining).unwrap_or(usize::MAX);
    let len = src.len().min(max).min(limit);
    (len > 0).then(|| src.split_to(len).freeze())
}

pub fn is_chunked(headers: &HeaderMap) -> bool {
    headers.contains_token("transfer-encoding", "chunked")
}

pub fn is_content_always_empty(head: &MessageHead) -> bool {
    let Some(code) = head.status_code() else {
        return false;
    };
    if (100..200).contains(&code) {
        return !is_hixie_handshake(head);
    }
    matches!(code, 204 | 304)
}

/// A Hixie-76 websocket `101`, which is followed by a 16 byte key body.
fn is_hixie_handshake(head: &MessageHead) -> bool {
    head.status_code() == Some(101)
        && !head.headers.contains("sec-websocket-accept")
        && head
            .headers
            .get_all("upgrade")
            .any(|value| value.eq_ignore_ascii_case("websocket"))
}

fn websocket_content_length(head: &MessageHead) -> Option<u64> {
    match &head.start_line {
        StartLine::Request(line)
            if line.method == "GET"
                && head.headers.contains("sec-websocket-key1")
                && head.headers.contains("sec-websocket-key2") =>
        {
            Some(8)
        }
        StartLine::Status(_) if is_hixie_handshake(head) => Some(16),
        _ => None,
    }
}

/// A 101 response hands the connection to a protocol other than HTTP/1.x.
///
/// Upgrades that stay on HTTP/1.x (for instance to TLS) do not count.
pub fn is_switching_to_non_http1(head: &MessageHead) -> bool {
    if head.status_code() != Some(101) {
        return false;
    }
    match head.headers.get("upgrade") {
        None => true,
        Some(protocol) => !protocol.contains("HTTP/1.0") && !protocol.contains("HTTP/1.1"),
    }
}

fn parse_content_length(headers: &HeaderMap) -> Result<Option<u64>, DecodeError> {
    let Some(raw) = headers.get("content-length") else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() || !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DecodeError::InvalidContentLength(raw.to_string()));
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| DecodeError::InvalidContentLength(raw.to_string()))
}
