//! Frame header encoding/decoding
//!
//! Every message is preceded by an ASCII header block terminated by an
//! empty line:
//!
//! ```text
//! Content-Length: 61\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":3,"method":"filesystem/expand",...}
//! ```
//!
//! Only `Content-Length` is interpreted. Other fields such as
//! `Content-Type` are accepted and skipped.

use bytes::{BufMut, BytesMut};

use crate::error::ProtocolError;

/// Sequence terminating the header block
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Largest header block accepted before a terminator must appear
pub const MAX_HEADER_SIZE: usize = 1024;

/// Maximum payload size (64MB)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

const CONTENT_LENGTH: &str = "Content-Length";

/// Frame header carrying the length of the JSON payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length of the payload in bytes
    pub content_length: usize,
}

impl FrameHeader {
    pub fn new(content_length: usize) -> Self {
        Self { content_length }
    }

    /// Encode the header block into a byte buffer
    pub fn encode(&self, dst: &mut BytesMut) {
        let length = self.content_length.to_string();
        dst.reserve(CONTENT_LENGTH.len() + 2 + length.len() + HEADER_TERMINATOR.len());
        dst.put_slice(CONTENT_LENGTH.as_bytes());
        dst.put_slice(b": ");
        dst.put_slice(length.as_bytes());
        dst.put_slice(HEADER_TERMINATOR);
    }

    /// Decode a header block from a byte buffer
    ///
    /// Returns None if the terminator has not arrived yet. The header bytes
    /// are consumed only once the whole block could be parsed.
    pub fn decode(src: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        let end = match src
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR)
        {
            Some(end) => end,
            None if src.len() > MAX_HEADER_SIZE => {
                return Err(ProtocolError::HeaderTooLarge {
                    max: MAX_HEADER_SIZE,
                })
            }
            None => return Ok(None),
        };

        let block = src.split_to(end + HEADER_TERMINATOR.len());
        let text = std::str::from_utf8(&block[..end])
            .map_err(|_| ProtocolError::InvalidHeader("header is not valid UTF-8".into()))?;

        let mut content_length = None;
        for line in text.split("\r\n") {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                ProtocolError::InvalidHeader(format!("malformed header line {line:?}"))
            })?;
            if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
                let length = value.trim().parse::<usize>().map_err(|_| {
                    ProtocolError::InvalidHeader(format!("bad Content-Length {:?}", value.trim()))
                })?;
                content_length = Some(length);
            }
        }

        content_length
            .map(|content_length| Some(Self { content_length }))
            .ok_or(ProtocolError::MissingContentLength)
    }
}
