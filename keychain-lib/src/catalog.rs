//! Catalog of platform keychain failure reasons.
//!
//! Native credential stores report failures as free text. This module owns the
//! closed set of reasons the store facade understands and the one function that
//! turns a raw platform message into an [`ErrorCode`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker some platform bridges put in front of the native message.
const MESSAGE_MARKER: &str = "msg: ";

/// Known keychain failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Failed to allocate memory.
    Allocate,
    /// Wrong credentials, or the authentication prompt raced a dismissal.
    AuthFailed,
    /// Bad parameter or invalid state for operation.
    BadRequest,
    /// Operation cancelled.
    Cancel,
    /// Stored data could not be decoded.
    Decode,
    /// Item already exists.
    DuplicateItem,
    /// Generic error while authenticating.
    ErrorAuthenticating,
    /// Face unlock dismissed by the user.
    FaceUnlockCanceled,
    /// User interaction is not allowed (device locked, app in background).
    InteractionNotAllowed,
    /// I/O error.
    Io,
    /// Item could not be found.
    ItemNotFound,
    /// User not authenticated.
    NotAuthenticated,
    /// Backing file already open with write permission.
    WritePermission,
    /// One or more parameters were invalid.
    Param,
    /// Function or operation not implemented.
    Unimplemented,
    /// User canceled the operation.
    UserCanceled,
    /// A required entitlement is missing.
    MissingEntitlements,
    /// No keychain is available.
    NotAvailable,
    /// Message did not match any catalog entry.
    Unrecognized,
}

impl ErrorCode {
    /// Every recognizable code, in catalog order. `Unrecognized` is not listed.
    pub const KNOWN: [ErrorCode; 18] = [
        Self::Allocate,
        Self::AuthFailed,
        Self::BadRequest,
        Self::Cancel,
        Self::Decode,
        Self::DuplicateItem,
        Self::ErrorAuthenticating,
        Self::FaceUnlockCanceled,
        Self::InteractionNotAllowed,
        Self::Io,
        Self::ItemNotFound,
        Self::NotAuthenticated,
        Self::WritePermission,
        Self::Param,
        Self::Unimplemented,
        Self::UserCanceled,
        Self::MissingEntitlements,
        Self::NotAvailable,
    ];

    /// The platform message associated with this code.
    ///
    /// `Unrecognized` has no platform message and returns `None`.
    pub fn platform_message(&self) -> Option<&'static str> {
        let msg = match self {
            Self::Allocate => "Failed to allocate memory.",
            Self::AuthFailed => "The user name or passphrase you entered is not correct.",
            Self::BadRequest => "Bad parameter or invalid state for operation.",
            Self::Cancel => "Cancel",
            Self::Decode => "Unable to decode the provided data.",
            Self::DuplicateItem => "The specified item already exists in the keychain.",
            Self::ErrorAuthenticating => "Error authenticating",
            Self::FaceUnlockCanceled => "Face Unlock canceled by user",
            Self::InteractionNotAllowed => "User interaction is not allowed.",
            Self::Io => "I/O error.",
            Self::ItemNotFound => "The specified item could not be found in the keychain.",
            Self::NotAuthenticated => "Wrapped error: User not authenticated",
            Self::WritePermission => "File already open with with write permission.",
            Self::Param => "One or more parameters passed to a function where not valid.",
            Self::Unimplemented => "Function or operation not implemented.",
            Self::UserCanceled => "User canceled the operation.",
            Self::MissingEntitlements => {
                "Internal error when a required entitlement isn't present."
            }
            Self::NotAvailable => {
                "No keychain is available. You may need to restart your computer."
            }
            Self::Unrecognized => return None,
        };
        Some(msg)
    }

    /// Stable identifier, used in logs and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allocate => "KEYCHAIN_ALLOCATE",
            Self::AuthFailed => "KEYCHAIN_AUTH_FAILED",
            Self::BadRequest => "KEYCHAIN_BAD_REQ",
            Self::Cancel => "KEYCHAIN_CANCEL",
            Self::Decode => "KEYCHAIN_DECODE",
            Self::DuplicateItem => "KEYCHAIN_DUPLICATE_ITEM",
            Self::ErrorAuthenticating => "KEYCHAIN_ERROR_AUTHENTICATING",
            Self::FaceUnlockCanceled => "KEYCHAIN_FACE_UNLOCK_CANCEL",
            Self::InteractionNotAllowed => "KEYCHAIN_INTERACTION_NOT_ALLOWED",
            Self::Io => "KEYCHAIN_IO",
            Self::ItemNotFound => "KEYCHAIN_ITEM_NOT_FOUND",
            Self::NotAuthenticated => "KEYCHAIN_NOT_AUTHENTICATED",
            Self::WritePermission => "KEYCHAIN_OP_WR",
            Self::Param => "KEYCHAIN_PARAM",
            Self::Unimplemented => "KEYCHAIN_UNIMPLEMENTED",
            Self::UserCanceled => "KEYCHAIN_USER_CANCELED",
            Self::MissingEntitlements => "KEYCHAIN_MISSING_ENTITLEMENTS",
            Self::NotAvailable => "KEYCHAIN_NOT_AVAILABLE",
            Self::Unrecognized => "KEYCHAIN_UNRECOGNIZED",
        }
    }

    /// True for the one failure a read is retried on.
    pub fn is_auth_failure(&self) -> bool {
        *self == Self::AuthFailed
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a raw platform error message into an [`ErrorCode`].
///
/// Bridges that wrap the native message as `"... msg: <native text>"` are
/// handled by matching only the text after the first marker.
pub fn classify(raw: &str) -> ErrorCode {
    let message = match raw.split_once(MESSAGE_MARKER) {
        Some((_, native)) if !native.trim().is_empty() => native,
        _ => raw,
    };
    let message = message.trim();

    ErrorCode::KNOWN
        .into_iter()
        .find(|code| code.platform_message() == Some(message))
        .unwrap_or(ErrorCode::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_catalog_entry_round_trips() {
        for code in ErrorCode::KNOWN {
            let msg = code.platform_message().unwrap();
            assert_eq!(classify(msg), code, "message {:?}", msg);
        }
    }

    #[test]
    fn test_wrapped_messages() {
        for code in ErrorCode::KNOWN {
            let raw = format!(
                "code: -25293, msg: {}",
                code.platform_message().unwrap()
            );
            assert_eq!(classify(&raw), code);
        }
    }

    #[test]
    fn test_unrecognized_fallback() {
        assert_eq!(classify(""), ErrorCode::Unrecognized);
        assert_eq!(classify("something exploded"), ErrorCode::Unrecognized);
        assert_eq!(classify("msg: something exploded"), ErrorCode::Unrecognized);
        // Prefix match is not enough
        assert_eq!(
            classify("I/O error. while reading"),
            ErrorCode::Unrecognized
        );
    }

    #[test]
    fn test_empty_native_text_falls_back_to_whole_message() {
        assert_eq!(classify("msg: "), ErrorCode::Unrecognized);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(classify("  I/O error.\n"), ErrorCode::Io);
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut ids: Vec<_> = ErrorCode::KNOWN.iter().map(|c| c.as_str()).collect();
        ids.push(ErrorCode::Unrecognized.as_str());
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn test_only_auth_failed_is_retryable() {
        assert!(ErrorCode::AuthFailed.is_auth_failure());
        assert!(!ErrorCode::ErrorAuthenticating.is_auth_failure());
        assert!(!ErrorCode::NotAuthenticated.is_auth_failure());
        assert!(!ErrorCode::Unrecognized.is_auth_failure());
    }
}
