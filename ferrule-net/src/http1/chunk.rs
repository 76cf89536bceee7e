use bytes::{Buf, Bytes, BytesMut};

use super::error::DecodeError;
use super::framing::take_slice;
use super::header::{HeaderAccumulator, is_whitespace, latin1};
use super::scanner::LineScanner;
use super::types::{HeaderMap, LastContent};

const EXCLUDED_TRAILERS: [&str; 3] = ["content-length", "transfer-encoding", "trailer"];

#[derive(Debug)]
pub(crate) struct ChunkParser {
    size_line: LineScanner,
    remaining: u64,
    trailers: HeaderMap,
}

impl ChunkParser {
    pub fn new(max_line_length: usize) -> Self {
        Self {
            size_line: LineScanner::per_line(max_line_length),
            remaining: 0,
            trailers: HeaderMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.size_line.reset();
        self.remaining = 0;
        self.trailers = HeaderMap::new();
    }

    pub fn read_size(&mut self, src: &mut BytesMut) -> Result<Option<u64>, DecodeError> {
        let Some(line) = self.size_line.scan(&src[..], 0)? else {
            return Ok(None);
        };
        let size = parse_chunk_size(&src[line.start..line.end])?;
        src.advance(line.next);
        self.remaining = size;
        Ok(Some(size))
    }

    pub fn read_data(&mut self, src: &mut BytesMut, max_chunk_size: usize) -> Option<Bytes> {
        let data = take_slice(src, max_chunk_size, self.remaining)?;
        self.remaining -= data.len() as u64;
        Some(data)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn skip_delimiter(src: &mut BytesMut) -> bool {
        match src.iter().position(|&byte| byte == b'\n') {
            Some(lf) => {
                src.advance(lf + 1);
                true
            }
            None => {
                src.clear();
                false
            }
        }
    }

    pub fn read_trailer(
        &mut self,
        headers: &mut HeaderAccumulator,
        src: &mut BytesMut,
    ) -> Result<Option<LastContent>, DecodeError> {
        let trailers = &mut self.trailers;
        let consumed = headers.read_block(&src[..], |header| {
            if !is_excluded_trailer(&header.name) {
                trailers.append(header.name, header.value);
            }
            Ok(())
        })?;
        let Some(consumed) = consumed else {
            return Ok(None);
        };
        src.advance(consumed);

        if self.trailers.is_empty() {
            return Ok(Some(LastContent::EMPTY));
        }
        Ok(Some(LastContent {
            trailers: std::mem::take(&mut self.trailers),
            ..LastContent::EMPTY
        }))
    }
}

pub fn is_excluded_trailer(name: &str) -> bool {
    EXCLUDED_TRAILERS
        .iter()
        .any(|excluded| name.eq_ignore_ascii_case(excluded))
}

pub fn parse_chunk_size(line: &[u8]) -> Result<u64, DecodeError> {
    let malformed = || DecodeError::MalformedChunkSize(latin1(line));

    let start = line
        .iter()
        .position(|&byte| byte > b' ')
        .unwrap_or(line.len());
    let digits = &line[start..];
    let end = digits
        .iter()
        .position(|&byte| byte == b';' || is_whitespace(byte) || byte.is_ascii_control())
        .unwrap_or(digits.len());
    let digits = &digits[..end];

    if digits.is_empty() {
        return Err(malformed());
    }
    digits.iter().try_fold(0u64, |size, &byte| {
        let digit = char::from(byte).to_digit(16).ok_or_else(malformed)?;
        size.checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(digit)))
            .ok_or_else(malformed)
    })
}
