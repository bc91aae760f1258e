//! Keychain library.
//!
//! A retrying string and JSON store over the platform's secure credential
//! store. The native store is injected as a [`CredentialStore`], so the same
//! facade runs against the OS keychain, an in-memory fake, or a host-provided
//! bridge.
//!
//! # Features
//!
//! - **Retry**: writes retry once on any failure, reads retry once on
//!   authentication failure
//! - **Error catalog**: platform messages are classified into [`ErrorCode`]
//! - **Access control**: public or biometric/passcode-gated entries, chosen by
//!   probing the device
//! - **Best-effort maintenance**: enumeration, existence checks, deletion and
//!   wipe never fail the caller
//!
//! # Example
//!
//! ```ignore
//! use keychain_lib::{DesktopCredentialStore, ReadMode, SecureStringStore, StoreConfig};
//! use keychain_lib::access::public_access_control_options;
//!
//! let config = StoreConfig::from_env()?;
//! let store = SecureStringStore::with_config(
//!     DesktopCredentialStore::new(config.service.clone()),
//!     config,
//! );
//!
//! store.save_object("settings", &settings, &public_access_control_options()).await?;
//! let settings: Option<Settings> = store.load_object("settings", None).await?;
//! ```

pub mod access;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod platform;
pub mod prelude;
pub mod retry;
pub mod store;

/// Test utilities for keychain testing.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use access::{AccessControlOptions, AccessControlPolicy};
pub use catalog::ErrorCode;
pub use config::StoreConfig;
pub use diagnostics::{DiagnosticsSink, TracingDiagnostics};
pub use errors::{KeychainError, PlatformError, PlatformResult};
pub use platform::{
    AuthenticationProbe, CredentialStore, Credentials, DesktopCredentialStore,
    InMemoryCredentialStore,
};
pub use retry::RetryPolicy;
pub use store::{AnonymizedEntry, ReadMode, SecureStringStore, ValueType};

/// Common result alias for keychain operations.
pub type Result<T> = std::result::Result<T, KeychainError>;
