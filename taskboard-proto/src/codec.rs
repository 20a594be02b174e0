//! Serialization for push-channel frames.
//!
//! Frames are postcard-encoded; the WebSocket layer preserves message
//! boundaries so no length prefix is added.

use crate::channel::ChannelMessage;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Frame exceeds the configured size limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Allowed maximum.
        max: usize,
    },
}

/// Encodes a [`ChannelMessage`] into a byte vector using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the message cannot be serialized.
pub fn encode(msg: &ChannelMessage) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(msg).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`ChannelMessage`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode(bytes: &[u8]) -> Result<ChannelMessage, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a frame after checking it against a size limit.
///
/// # Errors
///
/// Returns `CodecError::FrameTooLarge` when `bytes` exceeds `max`, or
/// `CodecError::Serialization` if the payload cannot be deserialized.
pub fn decode_bounded(bytes: &[u8], max: usize) -> Result<ChannelMessage, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::FrameTooLarge {
            size: bytes.len(),
            max,
        });
    }
    decode(bytes)
}
