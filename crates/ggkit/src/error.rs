//! Error types for container and arena operations

use std::io;

/// Container error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Stream does not start with the GGUF magic
    #[error("Invalid magic bytes: {0:02x?}")]
    BadMagic([u8; 4]),

    /// Format version newer (or older) than this reader understands
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Header counts or encodings are not plausible
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),

    /// Metadata value kind tag is not recognized
    #[error("Unknown value kind tag: {0}")]
    UnknownValueKind(u32),

    /// Tensor element type tag is unknown or not a fixed-size element type
    #[error("Unsupported element type tag: {0}")]
    UnsupportedElementType(u32),

    /// Tensor rank outside 1..=4
    #[error("Invalid rank {rank} for tensor '{name}' (expected 1..=4)")]
    InvalidRank {
        /// Tensor name
        name: String,
        /// Offending rank
        rank: u64,
    },

    /// Tensor extent is zero, negative, or overflows the byte size
    #[error("Invalid dimension for tensor '{name}': {message}")]
    InvalidDimension {
        /// Tensor name
        name: String,
        /// What was wrong
        message: String,
    },

    /// Offsets, sizes, or buffers disagree with each other
    #[error("Layout inconsistent: {0}")]
    LayoutInconsistent(String),

    /// Stream ended before the declared content
    #[error("Unexpected end of stream: {0}")]
    UnexpectedEof(String),

    /// Metadata key or tensor name is absent
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Stored kind differs from the requested one
    #[error("Type mismatch for '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Key or tensor name
        key: String,
        /// Requested kind
        expected: &'static str,
        /// Stored kind
        found: &'static str,
    },

    /// Name already registered
    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    /// Buffer could not be allocated
    #[error("Allocation of {size} bytes for '{name}' failed")]
    AllocationFailed {
        /// Tensor name
        name: String,
        /// Requested size in bytes
        size: u64,
    },

    /// Alignment is zero or not a power of two
    #[error("Invalid alignment: {0} (must be a nonzero power of two)")]
    InvalidAlignment(u64),

    /// I/O error other than a short read
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl Error {
    /// Whether this error means the input stream is unusable
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::BadMagic(_)
                | Self::UnsupportedVersion(_)
                | Self::CorruptHeader(_)
                | Self::UnknownValueKind(_)
                | Self::UnsupportedElementType(_)
                | Self::InvalidRank { .. }
                | Self::InvalidDimension { .. }
                | Self::LayoutInconsistent(_)
                | Self::UnexpectedEof(_)
        )
    }

    /// Whether this error is a recoverable call-site mistake
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::KeyNotFound(_) | Self::TypeMismatch { .. } | Self::DuplicateName(_)
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof(err.to_string())
        } else {
            Self::Io(err)
        }
    }
}

/// Result type for container operations
pub type Result<T> = std::result::Result<T, Error>;
