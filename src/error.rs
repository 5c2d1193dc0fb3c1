use thiserror::Error;

/// Decode errors, each annotated with the byte offset at which the decoder
/// that raised them was positioned.
#[derive(Debug, Error)]
pub enum Error {
    #[error("truncated input at offset {offset}")]
    Truncated { offset: u64 },

    #[error("bad file format at offset {offset}: {reason}")]
    BadFileFormat { offset: u64, reason: String },

    #[error("varint overflow at offset {offset}")]
    Overflow { offset: u64 },

    #[error("bad block structure at offset {offset}: {reason}")]
    BadBlockStructure { offset: u64, reason: String },

    #[error("unsupported compression type {code}")]
    UnsupportedCompression { code: u8 },

    #[error("unsupported footer version {version}")]
    UnsupportedVersion { version: u32 },

    #[error("checksum mismatch at offset {offset}: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        offset: u64,
        expected: u32,
        computed: u32,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
