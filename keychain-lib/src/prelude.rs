//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use keychain_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - The facade: `SecureStringStore`, `ReadMode`, `StoreConfig`
//! - Error types: `KeychainError`, `ErrorCode`, `Result`
//! - Platform traits and the bundled backends
//! - Access control options and their constructors

// Facade
pub use crate::store::{AnonymizedEntry, ReadMode, SecureStringStore, ValueType};
pub use crate::config::StoreConfig;
pub use crate::retry::RetryPolicy;

// Error handling
pub use crate::catalog::ErrorCode;
pub use crate::errors::{KeychainError, PlatformError};
pub use crate::Result;

// Platform
pub use crate::platform::{
    AuthenticationProbe, CredentialStore, Credentials, DesktopCredentialStore,
    InMemoryCredentialStore, PlatformFamily,
};

// Access control
pub use crate::access::{
    probe_private_access_control_options, public_access_control_options, AccessControlOptions,
    AccessControlPolicy,
};

// Diagnostics
pub use crate::diagnostics::{DiagnosticsSink, TracingDiagnostics};
