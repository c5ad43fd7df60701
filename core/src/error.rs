use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModemError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Symbol index {index} out of range for alphabet of {alphabet_size}")]
    SymbolOutOfRange { index: usize, alphabet_size: usize },

    #[error("Invalid input size: expected {expected} samples, got {actual}")]
    InvalidInputSize { expected: usize, actual: usize },

    #[error("FFT error: {0}")]
    FftError(String),

    /// No sync block was found at any bit phase: no signal in the recording.
    #[error("No valid frame start could be located")]
    SyncNotFound,

    #[error("Payload of {len} bytes exceeds packet capacity of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Compression failed: {0}")]
    Compression(String),

    /// Signal was found but the reassembled bytes do not decompress.
    #[error("Corrupted file: {0}")]
    Decompression(String),

    #[error("Corrupted message: {0}")]
    CorruptedMessage(String),

    #[error("Invalid bit string: unexpected character {0:?}")]
    InvalidBitString(char),
}

pub type Result<T> = std::result::Result<T, ModemError>;
