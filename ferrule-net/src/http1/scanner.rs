use super::error::DecodeError;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line {
    pub start: usize,
    pub end: usize,
    pub next: usize,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Budget {
    PerLine,
    Cumulative,
}

/// Finds line terminators while charging scanned bytes against a ceiling.
///
/// CR and LF are never charged. A scan that runs out of input leaves the
/// charge where it was, so rescanning the same line later does not count it
/// twice.
#[derive(Debug, Clone)]
pub(crate) struct LineScanner {
    max_length: usize,
    size: usize,
    budget: Budget,
}

impl LineScanner {
    pub fn per_line(max_length: usize) -> Self {
        Self {
            max_length,
            size: 0,
            budget: Budget::PerLine,
        }
    }

    pub fn cumulative(max_length: usize) -> Self {
        Self {
            max_length,
            size: 0,
            budget: Budget::Cumulative,
        }
    }

    pub fn reset(&mut self) {
        self.size = 0;
    }

    pub fn scan(&mut self, buf: &[u8], start: usize) -> Result<Option<Line>, DecodeError> {
        if self.budget == Budget::PerLine {
            self.reset();
        }
        let tail = buf.get(start..).unwrap_or_default();
        let found = tail.iter().position(|&byte| byte == CR || byte == LF);
        let charged = found.unwrap_or(tail.len());

        if self.size + charged > self.max_length {
            self.size = self.max_length + 1;
            return Err(self.too_long());
        }

        let Some(offset) = found else {
            return Ok(None);
        };
        let end = start + offset;
        let mut next = end + 1;
        if buf[end] == CR {
            match buf.get(next) {
                // A trailing CR may still be followed by LF.
                None => return Ok(None),
                Some(&LF) => next += 1,
                Some(_) => {}
            }
        }

        self.size += charged;
        Ok(Some(Line { start, end, next }))
    }

    fn too_long(&self) -> DecodeError {
        match self.budget {
            Budget::PerLine => DecodeError::LineTooLong {
                limit: self.max_length,
            },
            Budget::Cumulative => DecodeError::HeaderTooLong {
                limit: self.max_length,
            },
        }
    }
}
