//! Credential store with scripted failures.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::access::AccessControlOptions;
use crate::catalog::ErrorCode;
use crate::errors::{PlatformError, PlatformResult};
use crate::platform::{CredentialStore, Credentials, InMemoryCredentialStore};

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory store that fails on demand.
///
/// Write and read failures are queued: each call pops the next code and fails
/// with it, and calls succeed normally once the queue is empty. Delete failures
/// are per key and permanent. Listing and existence failures stay in place
/// until cleared.
#[derive(Default)]
pub struct ScriptedCredentialStore {
    inner: InMemoryCredentialStore,
    write_failures: Mutex<VecDeque<ErrorCode>>,
    read_failures: Mutex<VecDeque<ErrorCode>>,
    failing_deletes: Mutex<HashSet<String>>,
    withheld_secrets: Mutex<HashSet<String>>,
    listing_failure: Mutex<Option<ErrorCode>>,
    exists_failure: Mutex<Option<ErrorCode>>,
    writes: AtomicU32,
    reads: AtomicU32,
    deletes: AtomicU32,
}

impl ScriptedCredentialStore {
    /// Create an empty store with no scripted failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// The backing store, for seeding and inspecting entries directly.
    pub fn inner(&self) -> &InMemoryCredentialStore {
        &self.inner
    }

    /// Fail the next writes with `codes`, in order.
    pub fn fail_writes(&self, codes: impl IntoIterator<Item = ErrorCode>) {
        guard(&self.write_failures).extend(codes);
    }

    /// Fail the next reads with `codes`, in order.
    pub fn fail_reads(&self, codes: impl IntoIterator<Item = ErrorCode>) {
        guard(&self.read_failures).extend(codes);
    }

    /// Fail every delete of `key`.
    pub fn fail_deletes_for(&self, key: &str) {
        guard(&self.failing_deletes).insert(key.to_string());
    }

    /// Report `key` without its secret when enumerating.
    pub fn withhold_secret(&self, key: &str) {
        guard(&self.withheld_secrets).insert(key.to_string());
    }

    /// Fail both listing calls with `code`, or stop failing them.
    pub fn fail_listing(&self, code: Option<ErrorCode>) {
        *guard(&self.listing_failure) = code;
    }

    /// Fail existence checks with `code`, or stop failing them.
    pub fn fail_exists(&self, code: Option<ErrorCode>) {
        *guard(&self.exists_failure) = code;
    }

    /// Number of write calls received.
    pub fn write_attempts(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of read calls received.
    pub fn read_attempts(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of delete calls received.
    pub fn delete_attempts(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    fn scripted(queue: &Mutex<VecDeque<ErrorCode>>) -> PlatformResult<()> {
        match guard(queue).pop_front() {
            Some(code) => Err(PlatformError::from_code(code)),
            None => Ok(()),
        }
    }

    fn listing(&self) -> PlatformResult<()> {
        match *guard(&self.listing_failure) {
            Some(code) => Err(PlatformError::from_code(code)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CredentialStore for ScriptedCredentialStore {
    async fn write(
        &self,
        key: &str,
        username: &str,
        secret: &str,
        options: &AccessControlOptions,
    ) -> PlatformResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.write_failures)?;
        self.inner.write(key, username, secret, options).await
    }

    async fn read(
        &self,
        key: &str,
        options: Option<&AccessControlOptions>,
    ) -> PlatformResult<Option<Credentials>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.read_failures)?;
        self.inner.read(key, options).await
    }

    async fn delete(&self, key: &str) -> PlatformResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if guard(&self.failing_deletes).contains(key) {
            return Err(PlatformError::from_code(ErrorCode::InteractionNotAllowed));
        }
        self.inner.delete(key).await
    }

    async fn list_all(&self) -> PlatformResult<Vec<Credentials>> {
        self.listing()?;
        let mut all = self.inner.list_all().await?;
        let withheld = guard(&self.withheld_secrets).clone();
        for creds in &mut all {
            if withheld.contains(&creds.identifier) {
                creds.secret = None;
            }
        }
        Ok(all)
    }

    async fn list_all_keys(&self) -> PlatformResult<Vec<String>> {
        self.listing()?;
        self.inner.list_all_keys().await
    }

    async fn exists(&self, key: &str) -> PlatformResult<bool> {
        if let Some(code) = *guard(&self.exists_failure) {
            return Err(PlatformError::from_code(code));
        }
        self.inner.exists(key).await
    }
}
