//! Error types for the storage layer.

/// Errors that can occur while reading or writing a storage area.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The area could not be serialized to its backing file.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The backing file exists but is not a JSON object of strings.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A stored value is not what the reader expected.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// The key that was read.
        key: String,
        /// The raw value found there.
        value: String,
    },
}
