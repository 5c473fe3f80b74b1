//! Error types for credchain

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Invalid block linkage at index {0}")]
    InvalidBlockLinkage(usize),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Ledger format error: {0}")]
    FormatError(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            LedgerError::FormatError(err.to_string())
        } else {
            LedgerError::SerializationError(err.to_string())
        }
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_json_maps_to_format_error() {
        let err = serde_json::from_str::<Vec<u8>>("[1, 2").unwrap_err();
        assert!(matches!(LedgerError::from(err), LedgerError::FormatError(_)));
    }

    #[test]
    fn test_io_error_message_is_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = LedgerError::from(io);
        assert_eq!(err.to_string(), "IO error: denied");
    }
}
