use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Buf, BytesMut};
use tracing::{debug, trace};

use super::chunk::ChunkParser;
use super::config::DecoderConfig;
use super::error::{ConfigError, DecodeError};
use super::framing::{BodyFraming, ContentFramer, is_switching_to_non_http1, take_slice};
use super::header::{
    HeaderAccumulator, find_end_of_string, find_non_whitespace, find_whitespace, latin1,
};
use super::scanner::{Line, LineScanner};
use super::types::{
    DecodeEvent, DecodeFailure, DecodeResult, Direction, FailedObject, LastContent, MessageHead,
    RequestLine, StartLine, StatusLine,
};
use super::version::HttpVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    SkipLeading,
    ReadStartLine,
    ReadHeaders,
    ReadFixedLengthBody,
    ReadVariableLengthBody,
    ReadChunkSize,
    ReadChunkData,
    ReadChunkDelimiter,
    ReadChunkTrailer,
    BadMessage,
    Upgraded,
}

/// Queues a reset of an [`Http1Decoder`], applied when its next call starts.
#[derive(Debug, Clone, Default)]
pub struct ResetHandle(Arc<AtomicBool>);

impl ResetHandle {
    pub fn request_reset(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

#[derive(Debug, Default)]
enum MessageSlot {
    #[default]
    Idle,
    Assembling(MessageHead),
    Emitted {
        framing: BodyFraming,
        switches_protocol: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Suspend,
}

/// Incremental HTTP/1.x decoder for one connection.
///
/// Bytes are taken from the front of the caller's [`BytesMut`]; whatever the
/// decoder cannot use yet stays there for the next call. Parse failures are
/// reported as [`DecodeEvent::DecodeFailure`], after which the rest of the
/// connection's input is discarded until a reset.
#[derive(Debug)]
pub struct Http1Decoder {
    direction: Direction,
    config: DecoderConfig,
    state: DecoderState,
    start_line: LineScanner,
    headers: HeaderAccumulator,
    framer: ContentFramer,
    chunks: ChunkParser,
    message: MessageSlot,
    reset: ResetHandle,
}

impl Http1Decoder {
    pub fn request(config: DecoderConfig) -> Result<Self, ConfigError> {
        Self::new(Direction::Request, config)
    }

    pub fn response(config: DecoderConfig) -> Result<Self, ConfigError> {
        Self::new(Direction::Response, config)
    }

    pub fn new(direction: Direction, config: DecoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            direction,
            state: DecoderState::SkipLeading,
            start_line: LineScanner::per_line(config.max_initial_line_length),
            headers: HeaderAccumulator::new(config.max_header_size, config.validate_header_names),
            framer: ContentFramer::default(),
            chunks: ChunkParser::new(config.max_initial_line_length),
            message: MessageSlot::Idle,
            reset: ResetHandle::default(),
            config,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn framing(&self) -> Option<BodyFraming> {
        match self.message {
            MessageSlot::Emitted { framing, .. } => Some(framing),
            MessageSlot::Idle | MessageSlot::Assembling(_) => None,
        }
    }

    pub fn reset_handle(&self) -> ResetHandle {
        self.reset.clone()
    }

    pub fn request_reset(&self) {
        self.reset.request_reset();
    }

    pub fn expectation_failed(&self) {
        if matches!(
            self.state,
            DecoderState::ReadFixedLengthBody
                | DecoderState::ReadVariableLengthBody
                | DecoderState::ReadChunkSize
        ) {
            self.request_reset();
        }
    }

    pub fn decode(&mut self, src: &mut BytesMut) -> Vec<DecodeEvent> {
        let mut events = Vec::new();
        if self.reset.take() {
            debug!(state = ?self.state, "applying requested reset");
            self.reset_now();
        }
        self.run(src, &mut events);
        events
    }

    pub fn decode_eof(&mut self, src: &mut BytesMut) -> Vec<DecodeEvent> {
        let mut events = self.decode(src);

        match std::mem::take(&mut self.message) {
            MessageSlot::Idle => return events,
            MessageSlot::Assembling(head) => {
                let cause =
                    DecodeError::PrematureClosure("connection closed before received headers");
                debug!(%cause, "end of stream while reading headers");
                events.push(head_failure(head, cause));
            }
            MessageSlot::Emitted { framing, .. } => {
                let premature = match framing {
                    BodyFraming::Chunked => true,
                    _ if self.direction == Direction::Request => true,
                    _ => self.framer.declared_length().is_some_and(|length| length > 0),
                };
                if premature {
                    let cause =
                        DecodeError::PrematureClosure("connection closed before received content");
                    debug!(%cause, ?framing, "end of stream inside a message body");
                    events.push(content_failure(cause));
                } else {
                    events.push(DecodeEvent::LastBodyChunk(LastContent::EMPTY));
                }
            }
        }
        self.reset_now();
        events
    }

    fn run(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) {
        loop {
            let flow = match self.state {
                DecoderState::SkipLeading => self.skip_leading(src),
                DecoderState::ReadStartLine => self.read_start_line(src, events),
                DecoderState::ReadHeaders => self.read_headers(src, events),
                DecoderState::ReadFixedLengthBody => self.read_fixed_length(src, events),
                DecoderState::ReadVariableLengthBody => self.read_variable_length(src, events),
                DecoderState::ReadChunkSize => self.read_chunk_size(src, events),
                DecoderState::ReadChunkData => self.read_chunk_data(src, events),
                DecoderState::ReadChunkDelimiter => self.read_chunk_delimiter(src),
                DecoderState::ReadChunkTrailer => self.read_chunk_trailer(src, events),
                DecoderState::BadMessage => {
                    src.clear();
                    Flow::Suspend
                }
                DecoderState::Upgraded => {
                    if !src.is_empty() {
                        events.push(DecodeEvent::RawPassthroughBytes(src.split().freeze()));
                    }
                    Flow::Suspend
                }
            };
            if flow == Flow::Suspend {
                return;
            }
        }
    }

    fn skip_leading(&mut self, src: &mut BytesMut) -> Flow {
        match src.iter().position(|&byte| !is_skippable(byte)) {
            Some(start) => {
                src.advance(start);
                self.state = DecoderState::ReadStartLine;
                Flow::Continue
            }
            None => {
                src.clear();
                Flow::Suspend
            }
        }
    }

    fn read_start_line(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        let line = match self.start_line.scan(&src[..], 0) {
            Ok(Some(line)) => line,
            Ok(None) => return Flow::Suspend,
            Err(cause) => {
                let head = MessageHead::invalid(self.direction);
                return self.fail_head(src, events, head, cause);
            }
        };
        let parsed = build_start_line(self.direction, &src[..], line);
        src.advance(line.next);

        match parsed {
            Ok(Some(start_line)) => {
                self.message = MessageSlot::Assembling(MessageHead::new(start_line));
                self.state = DecoderState::ReadHeaders;
                Flow::Continue
            }
            Ok(None) => {
                debug!("dropping start line with missing tokens");
                self.state = DecoderState::SkipLeading;
                Flow::Continue
            }
            Err(cause) => {
                let head = MessageHead::invalid(self.direction);
                self.fail_head(src, events, head, cause)
            }
        }
    }

    fn read_headers(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        let mut head = match std::mem::take(&mut self.message) {
            MessageSlot::Assembling(head) => head,
            MessageSlot::Idle | MessageSlot::Emitted { .. } => MessageHead::invalid(self.direction),
        };
        let read = self.headers.read_block(&src[..], |header| {
            head.headers.append(header.name, header.value);
            Ok(())
        });
        match read {
            Ok(Some(consumed)) => src.advance(consumed),
            Ok(None) => {
                self.message = MessageSlot::Assembling(head);
                return Flow::Suspend;
            }
            Err(cause) => return self.fail_head(src, events, head, cause),
        }

        let framing = match self.framer.resolve(self.direction, &head) {
            Ok(BodyFraming::Chunked) if !self.config.chunked_supported => {
                return self.fail_head(src, events, head, DecodeError::UnsupportedChunkedEncoding);
            }
            Ok(framing) => framing,
            Err(cause) => return self.fail_head(src, events, head, cause),
        };
        trace!(?framing, "header block complete");

        self.message = MessageSlot::Emitted {
            framing,
            switches_protocol: self.direction == Direction::Response
                && is_switching_to_non_http1(&head),
        };
        events.push(DecodeEvent::MessageHead(head));

        match framing {
            BodyFraming::Empty | BodyFraming::FixedLength(0) => {
                events.push(DecodeEvent::LastBodyChunk(LastContent::EMPTY));
                self.complete_message();
            }
            BodyFraming::FixedLength(_) => self.state = DecoderState::ReadFixedLengthBody,
            BodyFraming::Chunked => self.state = DecoderState::ReadChunkSize,
            BodyFraming::UntilClose => self.state = DecoderState::ReadVariableLengthBody,
        }
        Flow::Continue
    }

    fn read_fixed_length(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        let Some((data, last)) = self.framer.read_fixed(src, self.config.max_chunk_size) else {
            return Flow::Suspend;
        };
        if last {
            events.push(DecodeEvent::LastBodyChunk(LastContent::new(data)));
            self.complete_message();
        } else {
            events.push(DecodeEvent::BodyChunk(data));
        }
        Flow::Continue
    }

    fn read_variable_length(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        match take_slice(src, self.config.max_chunk_size, u64::MAX) {
            Some(data) => {
                events.push(DecodeEvent::BodyChunk(data));
                Flow::Continue
            }
            None => Flow::Suspend,
        }
    }

    fn read_chunk_size(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        match self.chunks.read_size(src) {
            Ok(Some(0)) => self.state = DecoderState::ReadChunkTrailer,
            Ok(Some(_)) => self.state = DecoderState::ReadChunkData,
            Ok(None) => return Flow::Suspend,
            Err(cause) => return self.fail_content(src, events, cause),
        }
        Flow::Continue
    }

    fn read_chunk_data(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        let Some(data) = self.chunks.read_data(src, self.config.max_chunk_size) else {
            return Flow::Suspend;
        };
        events.push(DecodeEvent::BodyChunk(data));
        if self.chunks.remaining() == 0 {
            self.state = DecoderState::ReadChunkDelimiter;
        }
        Flow::Continue
    }

    fn read_chunk_delimiter(&mut self, src: &mut BytesMut) -> Flow {
        if ChunkParser::skip_delimiter(src) {
            self.state = DecoderState::ReadChunkSize;
            Flow::Continue
        } else {
            Flow::Suspend
        }
    }

    fn read_chunk_trailer(&mut self, src: &mut BytesMut, events: &mut Vec<DecodeEvent>) -> Flow {
        match self.chunks.read_trailer(&mut self.headers, src) {
            Ok(Some(last)) => {
                events.push(DecodeEvent::LastBodyChunk(last));
                self.complete_message();
                Flow::Continue
            }
            Ok(None) => Flow::Suspend,
            Err(cause) => self.fail_content(src, events, cause),
        }
    }

    fn fail_head(
        &mut self,
        src: &mut BytesMut,
        events: &mut Vec<DecodeEvent>,
        head: MessageHead,
        cause: DecodeError,
    ) -> Flow {
        debug!(%cause, "rejecting message head");
        events.push(head_failure(head, cause));
        self.enter_bad_message(src)
    }

    fn fail_content(
        &mut self,
        src: &mut BytesMut,
        events: &mut Vec<DecodeEvent>,
        cause: DecodeError,
    ) -> Flow {
        debug!(%cause, "rejecting message body");
        events.push(content_failure(cause));
        self.enter_bad_message(src)
    }

    fn enter_bad_message(&mut self, src: &mut BytesMut) -> Flow {
        self.clear_message();
        self.state = DecoderState::BadMessage;
        src.clear();
        Flow::Suspend
    }

    fn complete_message(&mut self) {
        let next = self.next_state_after_message();
        self.reset_now();
        self.state = next;
    }

    fn next_state_after_message(&self) -> DecoderState {
        match self.message {
            MessageSlot::Emitted {
                switches_protocol: true,
                ..
            } => {
                debug!("response switched protocols, passing further bytes through");
                DecoderState::Upgraded
            }
            _ => DecoderState::SkipLeading,
        }
    }

    fn reset_now(&mut self) {
        self.clear_message();
        self.state = DecoderState::SkipLeading;
    }

    fn clear_message(&mut self) {
        self.message = MessageSlot::Idle;
        self.start_line.reset();
        self.headers.reset();
        self.framer.reset();
        self.chunks.reset();
    }
}

fn head_failure(mut head: MessageHead, cause: DecodeError) -> DecodeEvent {
    head.result = DecodeResult::Failure(cause.clone());
    DecodeEvent::DecodeFailure(DecodeFailure {
        cause,
        object: FailedObject::Head(head),
    })
}

fn content_failure(cause: DecodeError) -> DecodeEvent {
    let last = LastContent {
        result: DecodeResult::Failure(cause.clone()),
        ..LastContent::EMPTY
    };
    DecodeEvent::DecodeFailure(DecodeFailure {
        cause,
        object: FailedObject::Content(last),
    })
}

fn is_skippable(byte: u8) -> bool {
    byte <= b' ' || (0x7f..=0x9f).contains(&byte)
}

fn split_start_line(buf: &[u8], line: Line) -> [&[u8]; 3] {
    let first_start = find_non_whitespace(buf, line.start, line.end);
    let first_end = find_whitespace(buf, first_start, line.end);
    let second_start = find_non_whitespace(buf, first_end, line.end);
    let second_end = find_whitespace(buf, second_start, line.end);
    let rest_start = find_non_whitespace(buf, second_end, line.end);
    let rest_end = find_end_of_string(buf, line.start, line.end).max(rest_start);
    [
        &buf[first_start..first_end],
        &buf[second_start..second_end],
        &buf[rest_start..rest_end],
    ]
}

fn build_start_line(
    direction: Direction,
    buf: &[u8],
    line: Line,
) -> Result<Option<StartLine>, DecodeError> {
    let [first, second, rest] = split_start_line(buf, line);
    match direction {
        Direction::Request => {
            if first.is_empty() || second.is_empty() || rest.is_empty() {
                return Ok(None);
            }
            let method = latin1(first);
            if method.chars().any(char::is_control) {
                return Err(DecodeError::InvalidMethod(method));
            }
            Ok(Some(StartLine::Request(RequestLine {
                method,
                target: latin1(second),
                version: HttpVersion::parse(&latin1(rest))?,
            })))
        }
        Direction::Response => {
            if first.is_empty() || second.is_empty() {
                return Ok(None);
            }
            let version = HttpVersion::parse(&latin1(first))?;
            let status_code = latin1(second)
                .parse::<u16>()
                .map_err(|_| DecodeError::InvalidStatusLine(latin1(&buf[line.start..line.end])))?;
            Ok(Some(StartLine::Status(StatusLine {
                version,
                status_code,
                reason: latin1(rest),
            })))
        }
    }
}
