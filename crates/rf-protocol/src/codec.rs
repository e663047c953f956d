//! JSON-lines framing
//!
//! Messages are sent as one JSON document per line. [`LineCodec`] is a
//! streaming splitter: bytes are pushed as they arrive and complete lines are
//! pulled out, so a frame split across several reads (or several frames in a
//! single read) is handled transparently.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{ParseError, ProtocolError};

/// Frame terminator
pub const TERMINATOR: u8 = b'\n';

/// Default maximum frame length (64 KiB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;

/// Streaming newline-delimited frame splitter
#[derive(Debug)]
pub struct LineCodec {
    buffer: Vec<u8>,
    max_frame_len: usize,
    /// Set after an oversized frame; input is dropped until the next terminator
    discarding: bool,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a codec with the default frame limit
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a codec that rejects frames longer than `max_frame_len` bytes
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(256),
            max_frame_len,
            discarding: false,
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete frame (without terminator)
    ///
    /// Returns `None` when more data is needed. Blank lines are skipped.
    /// An oversized frame yields one `FrameTooLong` error and the rest of it
    /// is discarded.
    pub fn next_frame(&mut self) -> Option<Result<Vec<u8>, ParseError>> {
        loop {
            match self.buffer.iter().position(|&b| b == TERMINATOR) {
                Some(pos) => {
                    let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                    line.pop();
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.iter().all(|b| b.is_ascii_whitespace()) {
                        continue;
                    }
                    if line.len() > self.max_frame_len {
                        return Some(Err(ParseError::FrameTooLong {
                            len: line.len(),
                            max: self.max_frame_len,
                        }));
                    }
                    return Some(Ok(line));
                }
                None => {
                    if self.discarding {
                        self.buffer.clear();
                        return None;
                    }
                    if self.buffer.len() > self.max_frame_len {
                        let len = self.buffer.len();
                        warn!("Discarding oversized frame ({} bytes)", len);
                        self.buffer.clear();
                        self.discarding = true;
                        return Some(Err(ParseError::FrameTooLong {
                            len,
                            max: self.max_frame_len,
                        }));
                    }
                    return None;
                }
            }
        }
    }

    /// Number of buffered bytes not yet returned as a frame
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

/// Encode a message as a single terminated line
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes =
        serde_json::to_vec(message).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    bytes.push(TERMINATOR);
    Ok(bytes)
}

/// Decode a message from a frame produced by [`LineCodec::next_frame`]
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T, ProtocolError> {
    let text = std::str::from_utf8(frame).map_err(|_| ParseError::InvalidUtf8)?;
    serde_json::from_str(text).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{DeviceRequest, Request, RequestFrame};
    use proptest::prelude::*;

    #[test]
    fn test_single_frame() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"{\"a\":1}\n");
        assert_eq!(codec.next_frame(), Some(Ok(b"{\"a\":1}".to_vec())));
        assert_eq!(codec.next_frame(), None);
    }

    #[test]
    fn test_partial_frame() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"{\"a\":");
        assert_eq!(codec.next_frame(), None);
        codec.push_bytes(b"1}\n");
        assert_eq!(codec.next_frame(), Some(Ok(b"{\"a\":1}".to_vec())));
    }

    #[test]
    fn test_multiple_frames_one_push() {
        let mut codec = LineCodec::new();
        codec.push_bytes(b"one\ntwo\r\n\nthree");
        assert_eq!(codec.next_frame(), Some(Ok(b"one".to_vec())));
        assert_eq!(codec.next_frame(), Some(Ok(b"two".to_vec())));
        assert_eq!(codec.next_frame(), None);
        assert_eq!(codec.buffered_len(), 5);
    }

    #[test]
    fn test_oversized_frame_discarded() {
        let mut codec = LineCodec::with_max_frame_len(8);
        codec.push_bytes(b"0123456789abcdef");
        assert!(matches!(
            codec.next_frame(),
            Some(Err(ParseError::FrameTooLong { max: 8, .. }))
        ));
        // Tail of the oversized frame is dropped, next frame is intact
        codec.push_bytes(b"ghij\nok\n");
        assert_eq!(codec.next_frame(), Some(Ok(b"ok".to_vec())));
        assert_eq!(codec.next_frame(), None);
    }

    #[test]
    fn test_oversized_complete_frame() {
        let mut codec = LineCodec::with_max_frame_len(4);
        codec.push_bytes(b"toolong\nok\n");
        assert!(matches!(
            codec.next_frame(),
            Some(Err(ParseError::FrameTooLong { len: 7, max: 4 }))
        ));
        assert_eq!(codec.next_frame(), Some(Ok(b"ok".to_vec())));
    }

    #[test]
    fn test_encode_decode_request_frame() {
        let frame = RequestFrame::new(7, Request::GetInfo(DeviceRequest::new("usrp0")));
        let bytes = encode_frame(&frame).unwrap();
        assert_eq!(bytes.last(), Some(&TERMINATOR));

        let decoded: RequestFrame = decode_frame(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_invalid_json() {
        let result: Result<RequestFrame, _> = decode_frame(b"{not json");
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let result: Result<RequestFrame, _> = decode_frame(&[0xFF, 0xFE]);
        assert_eq!(
            result.unwrap_err(),
            ProtocolError::Parse(ParseError::InvalidUtf8)
        );
    }

    proptest! {
        #[test]
        fn frames_survive_arbitrary_split(split in 0usize..40) {
            let data = b"{\"id\":1}\n{\"id\":2}\n";
            let split = split.min(data.len());
            let mut codec = LineCodec::new();
            codec.push_bytes(&data[..split]);
            let mut frames = Vec::new();
            while let Some(f) = codec.next_frame() {
                frames.push(f.unwrap());
            }
            codec.push_bytes(&data[split..]);
            while let Some(f) = codec.next_frame() {
                frames.push(f.unwrap());
            }
            prop_assert_eq!(frames, vec![b"{\"id\":1}".to_vec(), b"{\"id\":2}".to_vec()]);
        }
    }
}
