use bytes::BytesMut;

use super::config::DecoderConfig;
use super::decoder::{DecoderState, Http1Decoder, ResetHandle};
use super::error::ConfigError;
use super::types::{DecodeEvent, Direction};

#[derive(Debug)]
pub struct MessageStream {
    decoder: Http1Decoder,
    buffer: BytesMut,
}

impl MessageStream {
    pub fn request(config: DecoderConfig) -> Result<Self, ConfigError> {
        Self::new(Direction::Request, config)
    }

    pub fn response(config: DecoderConfig) -> Result<Self, ConfigError> {
        Self::new(Direction::Response, config)
    }

    pub fn new(direction: Direction, config: DecoderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            decoder: Http1Decoder::new(direction, config)?,
            buffer: BytesMut::new(),
        })
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<DecodeEvent> {
        self.buffer.extend_from_slice(bytes);
        self.decoder.decode(&mut self.buffer)
    }

    pub fn push_eof(&mut self) -> Vec<DecodeEvent> {
        self.decoder.decode_eof(&mut self.buffer)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn state(&self) -> DecoderState {
        self.decoder.state()
    }

    pub fn reset_handle(&self) -> ResetHandle {
        self.decoder.reset_handle()
    }

    pub fn expectation_failed(&self) {
        self.decoder.expectation_failed();
    }
}
