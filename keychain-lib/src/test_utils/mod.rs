//! Test utilities for the keychain facade.
//!
//! This module provides testing infrastructure including:
//! - A credential store with scripted failures and call counters
//! - A diagnostics sink that records every report
//! - An authentication probe with fixed answers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keychain_lib::test_utils::{RecordingDiagnostics, ScriptedCredentialStore};
//! use keychain_lib::catalog::ErrorCode;
//!
//! let backend = ScriptedCredentialStore::new();
//! backend.fail_writes([ErrorCode::Io]);
//!
//! let store = SecureStringStore::new(backend).with_diagnostics(RecordingDiagnostics::new());
//! store.save_string("k", "v", &AccessControlOptions::public()).await?;
//! assert_eq!(store.backend().write_attempts(), 2);
//! ```

mod diagnostics;
mod probe;
mod scripted;

pub use diagnostics::{DiagnosticEvent, RecordingDiagnostics};
pub use probe::FixedProbe;
pub use scripted::ScriptedCredentialStore;
