//! Error types for the name registry

use std::fmt;

/// Reasons a transaction fails to prove it was authorized by its address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingCredentials,
    InvalidPublicKey,
    InvalidSignatureLength(usize),
    InvalidSignature,
    AddressMismatch,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "missing public key or signature"),
            AuthError::InvalidPublicKey => write!(f, "invalid public key"),
            AuthError::InvalidSignatureLength(len) => {
                write!(f, "invalid signature length: expected 64 bytes, got {}", len)
            }
            AuthError::InvalidSignature => write!(f, "invalid signature"),
            AuthError::AddressMismatch => write!(f, "address doesn't match public key"),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    Auth(AuthError),
    InvalidNonce { expected: u64, got: u64 },
    NameAlreadyRegistered(String),
    StaleOrKnown { height: u64, latest: u64 },
    PrevHashMismatch { expected: String, got: String },
    InvalidHeight { expected: u64, got: u64 },
    CorruptBlock { expected: String, got: String },
    InvalidTransactionInBlock { index: usize, source: Box<ChainError> },
    NotFound(String),
    DecodeError(String),
    NetworkError(String),
    ConfigError(String),
    IoError(String),
}

impl ChainError {
    /// True for rejections caused by a block this node already has or has moved past.
    pub fn is_stale(&self) -> bool {
        matches!(self, ChainError::StaleOrKnown { .. })
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::Auth(e) => write!(f, "{}", e),
            ChainError::InvalidNonce { expected, got } => {
                write!(f, "invalid nonce: expected {}, got {}", expected, got)
            }
            ChainError::NameAlreadyRegistered(name) => {
                write!(f, "name already registered: {}", name)
            }
            ChainError::StaleOrKnown { height, latest } => write!(
                f,
                "block already known or stale: height {} <= latest {}",
                height, latest
            ),
            ChainError::PrevHashMismatch { expected, got } => write!(
                f,
                "invalid previous hash: expected {}, got {}",
                expected, got
            ),
            ChainError::InvalidHeight { expected, got } => {
                write!(f, "invalid block height: expected {}, got {}", expected, got)
            }
            ChainError::CorruptBlock { expected, got } => write!(
                f,
                "corrupt block: recomputed hash {} does not match {}",
                expected, got
            ),
            ChainError::InvalidTransactionInBlock { index, source } => {
                write!(f, "invalid transaction in block at index {}: {}", index, source)
            }
            ChainError::NotFound(what) => write!(f, "not found: {}", what),
            ChainError::DecodeError(msg) => write!(f, "decode error: {}", msg),
            ChainError::NetworkError(msg) => write!(f, "network error: {}", msg),
            ChainError::ConfigError(msg) => write!(f, "config error: {}", msg),
            ChainError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChainError::Auth(e) => Some(e),
            ChainError::InvalidTransactionInBlock { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<AuthError> for ChainError {
    fn from(err: AuthError) -> Self {
        ChainError::Auth(err)
    }
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::DecodeError(err.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::NetworkError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_deployed_nodes() {
        assert_eq!(
            ChainError::from(AuthError::AddressMismatch).to_string(),
            "address doesn't match public key"
        );
        assert!(ChainError::InvalidNonce { expected: 1, got: 0 }
            .to_string()
            .starts_with("invalid nonce"));
        assert!(ChainError::NameAlreadyRegistered("bob".to_string())
            .to_string()
            .starts_with("name already registered"));
    }

    #[test]
    fn test_nested_source_is_exposed() {
        use std::error::Error;

        let err = ChainError::InvalidTransactionInBlock {
            index: 2,
            source: Box::new(ChainError::Auth(AuthError::InvalidSignature)),
        };
        assert!(err.to_string().contains("index 2"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("invalid signature".to_string()));
    }
}
