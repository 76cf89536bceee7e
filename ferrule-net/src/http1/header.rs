use std::ops::Range;

use super::error::DecodeError;
use super::scanner::{Line, LineScanner};
use super::types::Header;

/// A header field seen on the wire but not yet moved into a collection.
///
/// Ranges index the unconsumed input, which is not advanced while a header
/// block is being read, so they stay valid across suspended scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) enum PendingField {
    #[default]
    Unset,
    Fragment {
        name: Range<usize>,
        value: Range<usize>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct HeaderAccumulator {
    scanner: LineScanner,
    processed: usize,
    pending: PendingField,
    validate: bool,
}

impl HeaderAccumulator {
    pub fn new(max_header_size: usize, validate: bool) -> Self {
        Self {
            scanner: LineScanner::cumulative(max_header_size),
            processed: 0,
            pending: PendingField::Unset,
            validate,
        }
    }

    pub fn reset(&mut self) {
        self.scanner.reset();
        self.processed = 0;
        self.pending = PendingField::Unset;
    }

    /// Reads lines from `buf` until the empty line closing the block.
    ///
    /// Every completed field is handed to `sink`. Returns the offset just past
    /// the closing empty line, or `None` when more input is needed. The byte
    /// budget is kept so a trailer block shares the header block's budget.
    pub fn read_block<F>(&mut self, buf: &[u8], mut sink: F) -> Result<Option<usize>, DecodeError>
    where
        F: FnMut(Header) -> Result<(), DecodeError>,
    {
        let Some(mut line) = self.scanner.scan(buf, self.processed)? else {
            return Ok(None);
        };

        loop {
            let folded = !line.is_empty() && matches!(buf[line.start], b' ' | b'\t');
            if !folded {
                if let PendingField::Fragment { name, value } = std::mem::take(&mut self.pending) {
                    sink(self.flush(buf, name, value)?)?;
                }
            }

            if line.is_empty() {
                self.processed = 0;
                return Ok(Some(line.next));
            }

            match &mut self.pending {
                PendingField::Fragment { value, .. } => extend_value(buf, value, line),
                PendingField::Unset => self.pending = split_header(buf, line),
            }

            self.processed = line.next;
            match self.scanner.scan(buf, line.next)? {
                Some(next) => line = next,
                None => return Ok(None),
            }
        }
    }

    fn flush(
        &self,
        buf: &[u8],
        name: Range<usize>,
        value: Range<usize>,
    ) -> Result<Header, DecodeError> {
        debug_assert!(name.start <= name.end && value.start <= value.end);
        debug_assert!(name.end <= buf.len() && value.end <= buf.len());

        let name = latin1(&buf[name]);
        let value = unfold(&buf[value]);

        if self.validate {
            if name.is_empty() || !name.bytes().all(is_token_char) {
                return Err(DecodeError::InvalidHeaderName(name));
            }
            if value.chars().any(is_forbidden_value_char) {
                return Err(DecodeError::InvalidHeaderValue(format!("{name}: {value:?}")));
            }
        }

        Ok(Header { name, value })
    }
}

fn split_header(buf: &[u8], line: Line) -> PendingField {
    let name_start = find_non_whitespace(buf, line.start, line.end);
    let name_end = buf[name_start..line.end]
        .iter()
        .position(|&byte| byte == b':' || is_whitespace(byte))
        .map_or(line.end, |offset| name_start + offset);
    let colon_end = buf[name_end..line.end]
        .iter()
        .position(|&byte| byte == b':')
        .map_or(line.end, |offset| name_end + offset + 1);

    let value_start = find_non_whitespace(buf, colon_end, line.end);
    let value = if value_start == line.end {
        line.end..line.end
    } else {
        value_start..find_end_of_string(buf, line.start, line.end)
    };

    PendingField::Fragment {
        name: name_start..name_end,
        value,
    }
}

fn extend_value(buf: &[u8], value: &mut Range<usize>, line: Line) {
    if value.is_empty() {
        let start = find_non_whitespace(buf, line.start, line.end);
        if start < line.end {
            *value = start..find_end_of_string(buf, line.start, line.end);
        }
    } else {
        value.end = find_end_of_string(buf, value.end, line.end);
    }
}

fn unfold(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut bytes = raw.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if byte == b'\r' || byte == b'\n' {
            while out.ends_with([' ', '\t']) {
                out.pop();
            }
            while bytes.next_if(|&next| is_whitespace(next)).is_some() {}
            out.push(' ');
        } else {
            out.push(char::from(byte));
        }
    }
    out
}

pub(crate) fn latin1(raw: &[u8]) -> String {
    raw.iter().copied().map(char::from).collect()
}

pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r' | 0x1c..=0x1f)
}

pub(crate) fn find_non_whitespace(buf: &[u8], start: usize, end: usize) -> usize {
    buf[start..end]
        .iter()
        .position(|&byte| !is_whitespace(byte))
        .map_or(end, |offset| start + offset)
}

pub(crate) fn find_whitespace(buf: &[u8], start: usize, end: usize) -> usize {
    buf[start..end]
        .iter()
        .position(|&byte| is_whitespace(byte))
        .map_or(end, |offset| start + offset)
}

pub(crate) fn find_end_of_string(buf: &[u8], start: usize, end: usize) -> usize {
    buf[start..end]
        .iter()
        .rposition(|&byte| !is_whitespace(byte))
        .map_or(start, |offset| start + offset + 1)
}

fn is_token_char(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'0'..=b'9' | b'A'..=b'Z' | b'^' | b'_' | b'`' | b'a'..=b'z' | b'|' | b'~'
    )
}

fn is_forbidden_value_char(ch: char) -> bool {
    ch.is_ascii_control() && ch != '\t'
}

#[cfg(test)]
mod tests {
    use super::HeaderAccumulator;
    use crate::http1::{DecodeError, Header};

    fn read_all(acc: &mut HeaderAccumulator, buf: &[u8]) -> (Option<usize>, Vec<Header>) {
        let mut headers = Vec::new();
        let done = acc
            .read_block(buf, |header| {
                headers.push(header);
                Ok(())
            })
            .unwrap();
        (done, headers)
    }

    fn pairs(headers: &[Header]) -> Vec<(&str, &str)> {
        headers
            .iter()
            .map(|header| (header.name.as_str(), header.value.as_str()))
            .collect()
    }

    #[test]
    fn reads_simple_block() {
        let mut acc = HeaderAccumulator::new(1024, true);
        let buf = b"Host: x\r\nAccept:  */* \r\n\r\nbody";
        let (done, headers) = read_all(&mut acc, buf);
        assert_eq!(done, Some(buf.len() - 4));
        assert_eq!(pairs(&headers), [("Host", "x"), ("Accept", "*/*")]);
    }

    #[test]
    fn joins_continuation_lines() {
        let mut acc = HeaderAccumulator::new(1024, true);
        let (done, headers) = read_all(&mut acc, b"X-Long: one \r\n\t two\r\n  three\r\nB: c\r\n\r\n");
        assert!(done.is_some());
        assert_eq!(pairs(&headers), [("X-Long", "one two three"), ("B", "c")]);
    }

    #[test]
    fn empty_value_takes_continuation() {
        let mut acc = HeaderAccumulator::new(1024, true);
        let (_, headers) = read_all(&mut acc, b"X-Empty:\r\n late\r\n\r\n");
        assert_eq!(pairs(&headers), [("X-Empty", "late")]);
    }

    #[test]
    fn resumes_after_partial_input() {
        let mut acc = HeaderAccumulator::new(1024, true);
        let full = b"Host: x\r\nX-Fold: a\r\n b\r\n\r\n";
        let mut seen = Vec::new();
        for end in 1..full.len() {
            let done = acc
                .read_block(&full[..end], |header| {
                    seen.push(header);
                    Ok(())
                })
                .unwrap();
            assert_eq!(done, None, "finished early at {end}");
        }
        let done = acc
            .read_block(full, |header| {
                seen.push(header);
                Ok(())
            })
            .unwrap();
        assert_eq!(done, Some(full.len()));
        assert_eq!(pairs(&seen), [("Host", "x"), ("X-Fold", "a b")]);
    }

    #[test]
    fn rejects_invalid_name_when_validating() {
        let mut acc = HeaderAccumulator::new(1024, true);
        let err = acc.read_block(b"Bad\x01Name: v\r\n\r\n", |_| Ok(())).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidHeaderName(_)));

        let mut lenient = HeaderAccumulator::new(1024, false);
        assert!(lenient.read_block(b"Bad\x01Name: v\r\n\r\n", |_| Ok(())).is_ok());
    }

    #[test]
    fn rejects_control_characters_in_values() {
        let mut acc = HeaderAccumulator::new(1024, true);
        let err = acc.read_block(b"Name: a\x00b\r\n\r\n", |_| Ok(())).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidHeaderValue(_)));
    }

    #[test]
    fn budget_spans_the_whole_block() {
        let mut acc = HeaderAccumulator::new(9, true);
        let err = acc.read_block(b"A: 12\r\nB: 34\r\n\r\n", |_| Ok(())).unwrap_err();
        assert!(matches!(err, DecodeError::HeaderTooLong { limit: 9 }));
    }
}
