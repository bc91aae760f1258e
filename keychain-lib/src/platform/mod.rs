//! Platform secure credential store abstraction.
//!
//! The store facade never talks to a native API directly. It is handed a
//! [`CredentialStore`] and, for policy selection, an [`AuthenticationProbe`]:
//! - In-memory storage (for testing)
//! - Desktop OS keychains (macOS Keychain, Linux Secret Service)
//!
//! Mobile hosts implement the same traits over their own keychain bridge.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keychain_lib::platform::{CredentialStore, InMemoryCredentialStore};
//! use keychain_lib::AccessControlOptions;
//!
//! let store = InMemoryCredentialStore::new();
//! store.write("seed", "seed", "secret", &AccessControlOptions::public()).await?;
//!
//! if let Some(creds) = store.read("seed", None).await? {
//!     // Use creds.secret...
//! }
//! ```

mod desktop;
mod memory;
mod traits;

pub use desktop::DesktopCredentialStore;
pub use memory::InMemoryCredentialStore;
pub use traits::{
    AuthenticationProbe, AuthenticationType, BiometryType, CredentialStore, Credentials,
    PlatformFamily,
};
