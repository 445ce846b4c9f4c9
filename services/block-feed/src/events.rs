//! Frame decoding for the flashblock feed
//!
//! Each inbound frame carries one flashblock diff as JSON, usually wrapped
//! in a binary WebSocket message:
//!
//! ```text
//! { "index": 0, "metadata": { "block_number": 101 }, "diff": { "transactions": [...] } }
//! ```
//!
//! Only the fields needed to build a [`SubBlockEvent`] are read; everything
//! else in the payload is ignored.

use serde::de::IgnoredAny;
use serde::Deserialize;
use types::block::SubBlockEvent;

/// Errors produced while decoding a single frame.
///
/// Decode failures are never fatal to the stream: the frame is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("malformed flashblock payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Deserialize)]
struct FlashblockPayload {
    index: u64,
    metadata: PayloadMetadata,
    diff: PayloadDiff,
}

#[derive(Debug, Deserialize)]
struct PayloadMetadata {
    block_number: u64,
}

#[derive(Debug, Deserialize)]
struct PayloadDiff {
    transactions: Vec<IgnoredAny>,
}

impl From<FlashblockPayload> for SubBlockEvent {
    fn from(payload: FlashblockPayload) -> Self {
        SubBlockEvent::new(
            payload.index,
            payload.metadata.block_number,
            payload.diff.transactions.len() as u64,
        )
    }
}

/// Decode a binary frame: UTF-8 text first, then JSON.
pub fn decode_binary(bytes: &[u8]) -> Result<SubBlockEvent, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidUtf8(e.to_string()))?;
    decode_text(text)
}

/// Decode a text frame.
pub fn decode_text(text: &str) -> Result<SubBlockEvent, DecodeError> {
    serde_json::from_str::<FlashblockPayload>(text)
        .map(SubBlockEvent::from)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))
}
