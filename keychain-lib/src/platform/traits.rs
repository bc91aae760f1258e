//! Interfaces to the platform secure credential store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::access::AccessControlOptions;
use crate::errors::PlatformResult;

/// A credential as returned by the platform store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Entry identifier (the caller's key).
    pub identifier: String,
    /// Stored secret.
    ///
    /// `None` when the platform declined to decrypt the entry, which some
    /// stores do for authentication-gated entries during bulk enumeration.
    pub secret: Option<String>,
}

impl Credentials {
    /// Create a credential with a secret.
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: Some(secret.into()),
        }
    }
}

// Secrets never reach logs through Debug.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Platform secure credential store.
///
/// Implementations perform the actual encrypted persistence and enforce the
/// access-control policy attached to each entry, including any biometric or
/// passcode prompt. They must be safe to call concurrently for different keys.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Write `secret` under `key`, replacing any previous entry.
    ///
    /// `username` is stored alongside the secret; the facade passes the key.
    async fn write(
        &self,
        key: &str,
        username: &str,
        secret: &str,
        options: &AccessControlOptions,
    ) -> PlatformResult<()>;

    /// Read the entry for `key`. `Ok(None)` when no entry exists.
    async fn read(
        &self,
        key: &str,
        options: Option<&AccessControlOptions>,
    ) -> PlatformResult<Option<Credentials>>;

    /// Delete the entry for `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> PlatformResult<()>;

    /// Enumerate every entry with its secret.
    async fn list_all(&self) -> PlatformResult<Vec<Credentials>>;

    /// Enumerate every key without decrypting values.
    async fn list_all_keys(&self) -> PlatformResult<Vec<String>>;

    /// Check whether an entry exists without reading it.
    async fn exists(&self, key: &str) -> PlatformResult<bool>;
}

/// Operating system family, which decides how authentication is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    /// iOS / macOS style keychains with a combined passcode-or-biometrics query.
    Apple,
    /// Android keystore, probed via supported biometry.
    Android,
    /// Desktop keyrings without biometric gating.
    Desktop,
}

/// Authentication kinds that can be asked about on Apple platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationType {
    /// Device passcode or any enrolled biometric.
    DevicePasscodeOrBiometrics,
}

/// Biometric sensors a device may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometryType {
    /// Touch ID.
    TouchId,
    /// Face ID.
    FaceId,
    /// Android fingerprint.
    Fingerprint,
    /// Android face unlock.
    Face,
    /// Android iris scanner.
    Iris,
}

/// Capability queries used to pick an access-control policy.
#[async_trait]
pub trait AuthenticationProbe: Send + Sync {
    /// Family of the running platform.
    fn platform_family(&self) -> PlatformFamily;

    /// Whether the given authentication kind can currently be required.
    async fn can_imply_authentication(&self, kind: AuthenticationType) -> PlatformResult<bool>;

    /// Biometric sensor available and enrolled, if any.
    async fn supported_biometry_type(&self) -> PlatformResult<Option<BiometryType>>;

    /// Whether the process runs on an emulator or simulator.
    async fn is_emulator(&self) -> PlatformResult<bool>;
}
