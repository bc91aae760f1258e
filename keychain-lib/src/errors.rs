//! Error types for keychain operations.

use crate::catalog::{classify, ErrorCode};

/// Failure reported by a [`CredentialStore`](crate::platform::CredentialStore).
///
/// Adapters over native APIs build this with [`PlatformError::from_message`] so
/// the free-text message is classified once, at the edge. Fakes set the code
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct PlatformError {
    /// Classified failure reason.
    pub code: ErrorCode,
    /// Raw message as reported by the platform.
    pub message: String,
}

impl PlatformError {
    /// Create an error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an error from a raw platform message, classifying it.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: classify(&message),
            message,
        }
    }

    /// Create an error carrying the catalog message for `code`.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.platform_message().unwrap_or("unrecognized error"))
    }

    /// "Item not found".
    pub fn not_found(key: &str) -> Self {
        Self::new(
            ErrorCode::ItemNotFound,
            format!(
                "{} (key: {})",
                ErrorCode::ItemNotFound.platform_message().unwrap_or_default(),
                key
            ),
        )
    }

    /// "No keychain is available".
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAvailable, reason)
    }
}

/// Result type for credential store calls.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors surfaced by the secure string store.
#[derive(Debug, thiserror::Error)]
pub enum KeychainError {
    /// The credential store failed.
    #[error("keychain {code}: {message}")]
    Platform {
        /// Classified failure reason.
        code: ErrorCode,
        /// Raw platform message.
        message: String,
    },

    /// A value could not be encoded before being written.
    #[error("failed to serialize object for key {key}: {source}")]
    Serialize {
        /// Key the object was destined for.
        key: String,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored entry is not valid encoded data.
    #[error("failed to parse object for key {key}: {source}")]
    Deserialize {
        /// Key that held the corrupt entry.
        key: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl KeychainError {
    /// The platform failure reason, if this error came from the store.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Platform { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the store rejected the caller's authentication.
    pub fn is_authentication_failure(&self) -> bool {
        self.code().is_some_and(|c| c.is_auth_failure())
    }
}

impl From<PlatformError> for KeychainError {
    fn from(err: PlatformError) -> Self {
        Self::Platform {
            code: err.code,
            message: err.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_message_classifies() {
        let err = PlatformError::from_message(
            "Error { code: -25300, msg: The specified item could not be found in the keychain. }",
        );
        // Trailing text after the native message defeats the exact match
        assert_eq!(err.code, ErrorCode::Unrecognized);

        let err = PlatformError::from_message("code: -25293, msg: I/O error.");
        assert_eq!(err.code, ErrorCode::Io);
        assert_eq!(err.message, "code: -25293, msg: I/O error.");
    }

    #[test]
    fn test_conversion_keeps_code() {
        let err: KeychainError = PlatformError::from_code(ErrorCode::AuthFailed).into();
        assert_eq!(err.code(), Some(ErrorCode::AuthFailed));
        assert!(err.is_authentication_failure());
        assert!(err.to_string().contains("KEYCHAIN_AUTH_FAILED"));
    }

    #[test]
    fn test_serialization_errors_have_no_code() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = KeychainError::Deserialize {
            key: "settings".into(),
            source,
        };
        assert_eq!(err.code(), None);
        assert!(!err.is_authentication_failure());
        assert!(err.to_string().contains("settings"));
    }
}
