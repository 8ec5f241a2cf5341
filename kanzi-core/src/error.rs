//! Error types shared by every Kanzi crate.
//!
//! Kanzi threads a single error enum through the whole pipeline instead of
//! using exceptions for control flow: transform refusals are not errors
//! (they flip a skip bit, see [`crate::gate`]), but anything that makes the
//! bitstream itself untrustworthy is.

use std::io;
use thiserror::Error;

/// The numeric error codes from the bitstream/container specification.
///
/// These mirror the small enum a front end would surface to a user; the
/// core only ever returns [`KanziError`], but front ends can map a
/// `KanziError` back to one of these via [`KanziError::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed input file or stream.
    InvalidFile,
    /// Unsupported bitstream version.
    StreamVersion,
    /// Unknown transform/entropy codec name.
    InvalidCodec,
    /// Block size parameter out of range.
    BlockSize,
    /// Header or per-block CRC/checksum mismatch.
    CrcCheck,
    /// A block-level task failed.
    ProcessBlock,
    /// A parameter value is invalid.
    InvalidParam,
    /// A required parameter is missing.
    MissingParam,
    /// Reading from the source failed.
    ReadFile,
    /// Writing to the sink failed.
    WriteFile,
    /// Unclassified error.
    Unknown,
}

/// The main error type for Kanzi core operations.
#[derive(Debug, Error)]
pub enum KanziError {
    /// I/O error from the underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Bitstream magic number did not match.
    #[error("Invalid magic number: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic {
        /// Expected magic value.
        expected: u32,
        /// Actual magic value found.
        found: u32,
    },

    /// Bitstream version is not supported by this implementation.
    #[error("Unsupported stream version: {version}")]
    UnsupportedVersion {
        /// The version tag read from the header.
        version: u8,
    },

    /// Header CRC did not match the computed value.
    #[error("Header CRC mismatch: expected {expected:#08x}, computed {computed:#08x}")]
    HeaderCrcMismatch {
        /// Expected CRC value from the header.
        expected: u32,
        /// Computed CRC value.
        computed: u32,
    },

    /// Per-block checksum did not match the computed value.
    #[error("Block checksum mismatch for block {block_id}: expected {expected:#x}, computed {computed:#x}")]
    ChecksumMismatch {
        /// The block id that failed verification.
        block_id: u64,
        /// Expected checksum value.
        expected: u64,
        /// Computed checksum value.
        computed: u64,
    },

    /// Unknown transform or entropy codec name.
    #[error("Unknown codec: {name}")]
    UnknownCodec {
        /// The unresolved codec name.
        name: String,
    },

    /// A parameter value fell outside its legal range.
    #[error("Invalid parameter {name}: {message}")]
    InvalidParam {
        /// Parameter name.
        name: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// A required parameter was not supplied.
    #[error("Missing required parameter: {name}")]
    MissingParam {
        /// Name of the missing parameter.
        name: String,
    },

    /// Data corruption detected while decoding a block.
    #[error("Corrupted block {block_id} at offset {offset}: {message}")]
    CorruptedBlock {
        /// Block id.
        block_id: u64,
        /// Byte offset within the block payload.
        offset: usize,
        /// Description of the corruption.
        message: String,
    },

    /// Pre-transform length recorded in a frame exceeds the sanity bound.
    #[error("Block {block_id} pre-transform length {length} exceeds bound {bound}")]
    OversizedBlock {
        /// Block id.
        block_id: u64,
        /// Length claimed by the frame.
        length: usize,
        /// Maximum allowed length.
        bound: usize,
    },

    /// A block-level task failed.
    #[error("Block {block_id} processing failed: {message}")]
    ProcessBlock {
        /// Block id.
        block_id: u64,
        /// Description of the failure.
        message: String,
    },

    /// The pipeline was cancelled (a sibling task failed or close() ran).
    #[error("Operation cancelled")]
    Cancelled,

    /// The stream has already been closed.
    #[error("Stream is closed")]
    StreamClosed,

    /// Unexpected end of the underlying source.
    #[error("Unexpected end of stream")]
    EndOfStream,

    /// Unclassified error with a free-form message.
    #[error("{0}")]
    Other(String),
}

impl KanziError {
    /// Map this error onto the small numeric [`ErrorCode`] enum a front end
    /// would surface to a user.
    pub fn code(&self) -> ErrorCode {
        match self {
            KanziError::Io(_) => ErrorCode::ReadFile,
            KanziError::InvalidMagic { .. } => ErrorCode::InvalidFile,
            KanziError::UnsupportedVersion { .. } => ErrorCode::StreamVersion,
            KanziError::HeaderCrcMismatch { .. } => ErrorCode::CrcCheck,
            KanziError::ChecksumMismatch { .. } => ErrorCode::CrcCheck,
            KanziError::UnknownCodec { .. } => ErrorCode::InvalidCodec,
            KanziError::InvalidParam { .. } => ErrorCode::InvalidParam,
            KanziError::MissingParam { .. } => ErrorCode::MissingParam,
            KanziError::CorruptedBlock { .. } => ErrorCode::ProcessBlock,
            KanziError::OversizedBlock { .. } => ErrorCode::ReadFile,
            KanziError::ProcessBlock { .. } => ErrorCode::ProcessBlock,
            KanziError::Cancelled => ErrorCode::ProcessBlock,
            KanziError::StreamClosed => ErrorCode::WriteFile,
            KanziError::EndOfStream => ErrorCode::ReadFile,
            KanziError::Other(_) => ErrorCode::Unknown,
        }
    }

    /// Build an [`KanziError::InvalidParam`].
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Build a [`KanziError::MissingParam`].
    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParam { name: name.into() }
    }
}

/// Result type alias used throughout the Kanzi workspace.
pub type Result<T> = std::result::Result<T, KanziError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = KanziError::InvalidMagic {
            expected: 0x4B41_4E5A,
            found: 0,
        };
        assert!(err.to_string().contains("Invalid magic"));
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(KanziError::Cancelled.code(), ErrorCode::ProcessBlock);
        assert_eq!(
            KanziError::missing_param("jobs").code(),
            ErrorCode::MissingParam
        );
    }
}
