use bytes::Bytes;

use super::error::DecodeError;
use super::version::HttpVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<Header>,
}

impl HeaderMap {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(Header {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn contains_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name).any(|value| {
            value
                .split(',')
                .any(|item| item.trim().eq_ignore_ascii_case(token))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Header> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = &'a Header;
    type IntoIter = std::slice::Iter<'a, Header>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: HttpVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: HttpVersion,
    pub status_code: u16,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request(RequestLine),
    Status(StatusLine),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DecodeResult {
    #[default]
    Success,
    Failure(DecodeError),
}

impl DecodeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn cause(&self) -> Option<&DecodeError> {
        match self {
            Self::Success => None,
            Self::Failure(cause) => Some(cause),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHead {
    pub start_line: StartLine,
    pub headers: HeaderMap,
    pub result: DecodeResult,
}

impl MessageHead {
    pub fn new(start_line: StartLine) -> Self {
        Self {
            start_line,
            headers: HeaderMap::new(),
            result: DecodeResult::Success,
        }
    }

    pub(crate) fn invalid(direction: Direction) -> Self {
        let start_line = match direction {
            Direction::Request => StartLine::Request(RequestLine {
                method: "GET".to_string(),
                target: "/bad-request".to_string(),
                version: HttpVersion::Http10,
            }),
            Direction::Response => StartLine::Status(StatusLine {
                version: HttpVersion::Http10,
                status_code: 999,
                reason: "Unknown".to_string(),
            }),
        };
        Self::new(start_line)
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request(_))
    }

    pub fn version(&self) -> &HttpVersion {
        match &self.start_line {
            StartLine::Request(line) => &line.version,
            StartLine::Status(line) => &line.version,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.start_line {
            StartLine::Request(_) => None,
            StartLine::Status(line) => Some(line.status_code),
        }
    }

    pub fn keep_alive(&self) -> bool {
        if self.headers.contains_token("connection", "close") {
            return false;
        }
        if self.headers.contains_token("connection", "keep-alive") {
            return true;
        }
        self.version().is_keep_alive_default()
    }

    pub fn expects_continue(&self) -> bool {
        self.is_request() && self.headers.contains_token("expect", "100-continue")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastContent {
    pub data: Bytes,
    pub trailers: HeaderMap,
    pub result: DecodeResult,
}

impl LastContent {
    pub const EMPTY: LastContent = LastContent {
        data: Bytes::new(),
        trailers: HeaderMap::new(),
        result: DecodeResult::Success,
    };

    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            ..Self::EMPTY
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.trailers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedObject {
    Head(MessageHead),
    Content(LastContent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub cause: DecodeError,
    pub object: FailedObject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    MessageHead(MessageHead),
    BodyChunk(Bytes),
    LastBodyChunk(LastContent),
    DecodeFailure(DecodeFailure),
    RawPassthroughBytes(Bytes),
}

#[cfg(test)]
mod tests {
    use super::{HeaderMap, MessageHead, RequestLine, StartLine};
    use crate::http1::HttpVersion;

    fn request(version: HttpVersion) -> MessageHead {
        MessageHead::new(StartLine::Request(RequestLine {
            method: "GET".to_string(),
            target: "/".to_string(),
            version,
        }))
    }

    #[test]
    fn header_lookup_ignores_case_and_keeps_duplicates() {
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");
        headers.append("Host", "x");

        assert_eq!(headers.get("SET-COOKIE"), Some("a=1"));
        assert_eq!(headers.get_all("Set-Cookie").collect::<Vec<_>>(), ["a=1", "b=2"]);
        assert_eq!(headers.len(), 3);
        assert!(!headers.contains("content-length"));
    }

    #[test]
    fn token_match_splits_comma_lists() {
        let mut headers = HeaderMap::new();
        headers.append("Transfer-Encoding", "gzip, Chunked");
        assert!(headers.contains_token("transfer-encoding", "chunked"));
        assert!(!headers.contains_token("transfer-encoding", "identity"));
    }

    #[test]
    fn keep_alive_follows_version_and_connection_header() {
        assert!(request(HttpVersion::Http11).keep_alive());
        assert!(!request(HttpVersion::Http10).keep_alive());

        let mut head = request(HttpVersion::Http10);
        head.headers.append("Connection", "Keep-Alive");
        assert!(head.keep_alive());

        let mut head = request(HttpVersion::Http11);
        head.headers.append("Connection", "close");
        assert!(!head.keep_alive());
    }

    #[test]
    fn expect_continue_is_detected_case_insensitively() {
        let mut head = request(HttpVersion::Http11);
        assert!(!head.expects_continue());
        head.headers.append("Expect", "100-Continue");
        assert!(head.expects_continue());
    }
}
