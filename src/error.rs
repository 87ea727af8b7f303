//! The closed set of failure kinds the codec can raise.
//!
//! Every layer (framer, aligner, dedup engine, metadata differ, container)
//! returns [`CodecError`] so callers can `match` on failure class instead of
//! sniffing a message string. The CLI boundary wraps these in `anyhow::Error`
//! for context-chaining; the library itself never depends on `anyhow`.

use thiserror::Error;

/// A codec operation failed.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The raw save state is shorter than the fixed header, or the header's
    /// embedded info length runs past the end of the buffer.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// The info block is not valid UTF-8 JSON, a present `buffer_infos` is
    /// not an array, or a region descriptor is out of bounds.
    #[error("malformed info block: {0}")]
    MalformedInfo(String),

    /// The savestream bytes failed structural deserialization, a frame was
    /// missing a required field, or a JSON patch failed to apply.
    #[error("malformed container: {0}")]
    MalformedContainer(String),

    /// A frame referenced a block or superblock ID that had not yet been
    /// introduced by an earlier frame.
    #[error("unknown {kind} id {id}")]
    UnknownId {
        /// Either `"block"` or `"superblock"`.
        kind: &'static str,
        id: u32,
    },

    /// A frame redefined an existing ID with different content.
    #[error("duplicate {kind} id {id}: redefined with different content")]
    DuplicateId {
        /// Either `"block"` or `"superblock"`.
        kind: &'static str,
        id: u32,
    },

    /// A frame index passed to [`crate::container::decode_one`] was outside
    /// `[0, length)`.
    #[error("index {index} out of range for {length} frames")]
    OutOfRange {
        index: usize,
        length: usize,
    },

    /// A table or a single frame's serialized size exceeded an
    /// implementation ceiling.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Result alias used throughout the codec.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_message_names_the_offending_id() {
        let err = CodecError::UnknownId { kind: "block", id: 7 };
        assert_eq!(err.to_string(), "unknown block id 7");
    }

    #[test]
    fn out_of_range_message_names_bounds() {
        let err = CodecError::OutOfRange { index: 5, length: 3 };
        assert_eq!(err.to_string(), "index 5 out of range for 3 frames");
    }
}
