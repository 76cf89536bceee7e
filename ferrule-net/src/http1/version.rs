use std::fmt;

use super::error::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
    Other {
        protocol: String,
        major: u32,
        minor: u32,
    },
}

impl HttpVersion {
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        match raw {
            "HTTP/1.1" => return Ok(Self::Http11),
            "HTTP/1.0" => return Ok(Self::Http10),
            _ => {}
        }

        let text = raw.trim().to_ascii_uppercase();
        if text.is_empty() {
            return Err(DecodeError::InvalidVersion(
                "empty version (possibly HTTP/0.9)".to_string(),
            ));
        }

        let invalid = || DecodeError::InvalidVersion(raw.to_string());
        let (protocol, numbers) = text.split_once('/').ok_or_else(invalid)?;
        let (major, minor) = numbers.split_once('.').ok_or_else(invalid)?;

        if protocol.is_empty()
            || protocol
                .bytes()
                .any(|byte| byte.is_ascii_control() || byte.is_ascii_whitespace())
        {
            return Err(invalid());
        }
        let major = parse_version_number(major).ok_or_else(invalid)?;
        let minor = parse_version_number(minor).ok_or_else(invalid)?;

        Ok(match (protocol, major, minor) {
            ("HTTP", 1, 0) => Self::Http10,
            ("HTTP", 1, 1) => Self::Http11,
            _ => Self::Other {
                protocol: protocol.to_string(),
                major,
                minor,
            },
        })
    }

    pub fn protocol(&self) -> &str {
        match self {
            Self::Http10 | Self::Http11 => "HTTP",
            Self::Other { protocol, .. } => protocol,
        }
    }

    pub fn major(&self) -> u32 {
        match self {
            Self::Http10 | Self::Http11 => 1,
            Self::Other { major, .. } => *major,
        }
    }

    pub fn minor(&self) -> u32 {
        match self {
            Self::Http10 => 0,
            Self::Http11 => 1,
            Self::Other { minor, .. } => *minor,
        }
    }

    pub fn is_keep_alive_default(&self) -> bool {
        !matches!(self, Self::Http10)
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.protocol(), self.major(), self.minor())
    }
}

fn parse_version_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
