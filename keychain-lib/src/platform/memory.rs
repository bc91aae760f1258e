//! In-memory credential store.
//!
//! This implementation is for testing and development only.
//! In production, use a platform-backed implementation.
//!
//! # Thread Safety
//!
//! This store uses `RwLock` for thread-safe access. Lock poisoning
//! is handled gracefully by returning an error rather than panicking.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::traits::{
    AuthenticationProbe, AuthenticationType, BiometryType, CredentialStore, Credentials,
    PlatformFamily,
};
use crate::access::{AccessControlOptions, AccessControlPolicy};
use crate::catalog::ErrorCode;
use crate::errors::{PlatformError, PlatformResult};

/// In-memory entry.
#[derive(Clone)]
struct StoredEntry {
    username: String,
    secret: String,
    options: AccessControlOptions,
}

/// In-memory implementation of [`CredentialStore`].
///
/// **Warning**: Entries are not encrypted and are lost when the process
/// exits. Enumeration is ordered by key.
pub struct InMemoryCredentialStore {
    entries: RwLock<BTreeMap<String, StoredEntry>>,
}

/// Helper function to handle lock poisoning gracefully.
fn lock_error(context: &str) -> PlatformError {
    PlatformError::new(
        ErrorCode::Io,
        format!("InMemoryCredentialStore: lock poisoned during {}", context),
    )
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get the number of stored entries.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Check if the store is empty.
    ///
    /// Returns true if the lock is poisoned.
    pub fn is_empty(&self) -> bool {
        self.entries.read().map(|e| e.is_empty()).unwrap_or(true)
    }

    /// Policy the entry for `key` was written with.
    pub fn policy_of(&self, key: &str) -> Option<AccessControlPolicy> {
        self.entries
            .read()
            .ok()?
            .get(key)
            .map(|entry| entry.options.policy())
    }

    /// Username the entry for `key` was written with.
    pub fn username_of(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()?
            .get(key)
            .map(|entry| entry.username.clone())
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn write(
        &self,
        key: &str,
        username: &str,
        secret: &str,
        options: &AccessControlOptions,
    ) -> PlatformResult<()> {
        let mut entries = self.entries.write().map_err(|_| lock_error("write"))?;
        entries.insert(
            key.to_string(),
            StoredEntry {
                username: username.to_string(),
                secret: secret.to_string(),
                options: options.clone(),
            },
        );
        Ok(())
    }

    async fn read(
        &self,
        key: &str,
        _options: Option<&AccessControlOptions>,
    ) -> PlatformResult<Option<Credentials>> {
        let entries = self.entries.read().map_err(|_| lock_error("read"))?;
        Ok(entries
            .get(key)
            .map(|entry| Credentials::new(key, entry.secret.clone())))
    }

    async fn delete(&self, key: &str) -> PlatformResult<()> {
        let mut entries = self.entries.write().map_err(|_| lock_error("delete"))?;
        entries.remove(key);
        Ok(())
    }

    async fn list_all(&self) -> PlatformResult<Vec<Credentials>> {
        let entries = self.entries.read().map_err(|_| lock_error("list_all"))?;
        Ok(entries
            .iter()
            .map(|(key, entry)| Credentials::new(key.clone(), entry.secret.clone()))
            .collect())
    }

    async fn list_all_keys(&self) -> PlatformResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| lock_error("list_all_keys"))?;
        Ok(entries.keys().cloned().collect())
    }

    async fn exists(&self, key: &str) -> PlatformResult<bool> {
        let entries = self.entries.read().map_err(|_| lock_error("exists"))?;
        Ok(entries.contains_key(key))
    }
}

/// Memory has no authentication hardware.
#[async_trait]
impl AuthenticationProbe for InMemoryCredentialStore {
    fn platform_family(&self) -> PlatformFamily {
        PlatformFamily::Desktop
    }

    async fn can_imply_authentication(&self, _kind: AuthenticationType) -> PlatformResult<bool> {
        Ok(false)
    }

    async fn supported_biometry_type(&self) -> PlatformResult<Option<BiometryType>> {
        Ok(None)
    }

    async fn is_emulator(&self) -> PlatformResult<bool> {
        Ok(false)
    }
}
