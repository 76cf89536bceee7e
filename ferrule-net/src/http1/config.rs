use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DecoderConfig {
    pub max_initial_line_length: usize,
    pub max_header_size: usize,
    pub max_chunk_size: usize,
    pub chunked_supported: bool,
    pub validate_header_names: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_initial_line_length: 4096,
            max_header_size: 8192,
            max_chunk_size: 8192,
            chunked_supported: true,
            validate_header_names: true,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_initial_line_length", self.max_initial_line_length),
            ("max_header_size", self.max_header_size),
            ("max_chunk_size", self.max_chunk_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be positive",
                });
            }
        }
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}
