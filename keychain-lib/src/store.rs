//! Retrying facade over a platform credential store.
//!
//! [`SecureStringStore`] persists strings and JSON documents under caller-chosen
//! keys. Writes are retried once regardless of the failure; reads are retried
//! only when the platform reports an authentication failure. Enumeration,
//! existence checks and deletion are best-effort and never fail the caller.
//!
//! Only keys are logged. Values never reach a log line or a diagnostics report.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::access::{probe_private_access_control_options, AccessControlOptions};
use crate::config::StoreConfig;
use crate::diagnostics::{DiagnosticsSink, TracingDiagnostics};
use crate::errors::KeychainError;
use crate::platform::{AuthenticationProbe, CredentialStore, Credentials};
use crate::Result;

/// How a failed read is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Failures degrade to "absent".
    #[default]
    Lenient,
    /// Failures are returned as errors.
    Strict,
}

/// Runtime type of an enumerated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// The platform returned the secret.
    String,
    /// The platform withheld the secret.
    Undefined,
}

/// Privacy-preserving summary of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizedEntry {
    /// Length of the value in characters, 0 when withheld.
    pub length: usize,
    /// Whether the value was withheld.
    pub is_nil: bool,
    /// Type tag of the value.
    pub value_type: ValueType,
}

impl AnonymizedEntry {
    fn from_secret(secret: Option<&str>) -> Self {
        match secret {
            Some(value) => Self {
                length: value.chars().count(),
                is_nil: false,
                value_type: ValueType::String,
            },
            None => Self {
                length: 0,
                is_nil: true,
                value_type: ValueType::Undefined,
            },
        }
    }
}

fn ordinal(attempt: u32) -> &'static str {
    match attempt {
        1 => "first",
        2 => "second",
        3 => "third",
        _ => "later",
    }
}

/// Key/value facade over a [`CredentialStore`].
///
/// # Example
///
/// ```
/// use keychain_lib::{InMemoryCredentialStore, ReadMode, SecureStringStore};
/// use keychain_lib::access::public_access_control_options;
///
/// # async fn demo() -> keychain_lib::Result<()> {
/// let store = SecureStringStore::new(InMemoryCredentialStore::new());
/// store
///     .save_string("pin", "1234", &public_access_control_options())
///     .await?;
///
/// let pin = store.load_string("pin", None, ReadMode::Strict).await?;
/// assert_eq!(pin.as_deref(), Some("1234"));
/// # Ok(())
/// # }
/// ```
pub struct SecureStringStore<S, D = TracingDiagnostics> {
    backend: S,
    diagnostics: D,
    config: StoreConfig,
}

impl<S: CredentialStore> SecureStringStore<S, TracingDiagnostics> {
    /// Wrap `backend` with the default configuration.
    pub fn new(backend: S) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    /// Wrap `backend` with `config`.
    pub fn with_config(backend: S, config: StoreConfig) -> Self {
        Self {
            backend,
            diagnostics: TracingDiagnostics,
            config,
        }
    }
}

impl<S, D> SecureStringStore<S, D>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    /// Replace the diagnostics sink.
    pub fn with_diagnostics<D2: DiagnosticsSink>(self, diagnostics: D2) -> SecureStringStore<S, D2> {
        SecureStringStore {
            backend: self.backend,
            diagnostics,
            config: self.config,
        }
    }

    /// The wrapped credential store.
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// The active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The diagnostics sink.
    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Write `value` under `key`.
    ///
    /// A failed write is retried after the configured delay, whatever the
    /// failure. The last failure is returned once attempts run out. Nothing is
    /// rolled back.
    #[tracing::instrument(skip(self, value, options))]
    pub async fn save_string(
        &self,
        key: &str,
        value: &str,
        options: &AccessControlOptions,
    ) -> Result<()> {
        let this = self;
        let result = self
            .config
            .retry
            .run(
                move |attempt| async move {
                    let outcome = this.backend.write(key, key, value, options).await;
                    match &outcome {
                        Ok(()) if attempt == 1 => {
                            tracing::info!("Keychain: saved string for key: {}", key);
                            this.diagnostics
                                .breadcrumb(&format!("Keychain: saved string for key: {}", key));
                        }
                        Ok(()) => {
                            let line = format!(
                                "Keychain: saved string for key: {} on {} attempt",
                                key,
                                ordinal(attempt)
                            );
                            tracing::info!("{}", line);
                            this.diagnostics.breadcrumb(&line);
                        }
                        Err(err) => {
                            tracing::warn!(
                                "Keychain: failed to save string for key: {} error: {}",
                                key,
                                err
                            );
                            this.diagnostics.breadcrumb(&format!(
                                "Keychain: failed to save string for key: {} code: {}",
                                key, err.code
                            ));
                            this.diagnostics.capture_message(&format!(
                                "Keychain write {} attempt failed",
                                ordinal(attempt)
                            ));
                        }
                    }
                    outcome
                },
                |_, _| true,
            )
            .await;

        result.map_err(|err| {
            tracing::error!("Keychain: giving up on saving key: {}", key);
            KeychainError::from(err)
        })
    }

    /// Read the string stored under `key`.
    ///
    /// Returns `Ok(None)` when the entry does not exist. An authentication
    /// failure is retried after the configured delay; any other failure is
    /// final at once. Final failures yield `Ok(None)` in
    /// [`ReadMode::Lenient`] and the error in [`ReadMode::Strict`].
    #[tracing::instrument(skip(self, options))]
    pub async fn load_string(
        &self,
        key: &str,
        options: Option<&AccessControlOptions>,
        mode: ReadMode,
    ) -> Result<Option<String>> {
        let this = self;
        let max_attempts = self.config.retry.max_attempts;
        let result = self
            .config
            .retry
            .run(
                move |attempt| async move {
                    let outcome = this.backend.read(key, options).await;
                    if let Err(err) = &outcome {
                        let retrying = err.code.is_auth_failure() && attempt < max_attempts;
                        if attempt > 1 || retrying {
                            this.diagnostics.capture_message(&format!(
                                "Keychain read {} attempt failed",
                                ordinal(attempt)
                            ));
                        }
                    }
                    outcome
                },
                |_, err| err.code.is_auth_failure(),
            )
            .await;

        match result {
            Ok(Some(credentials)) => {
                tracing::debug!("Keychain: loaded string for key: {}", key);
                Ok(credentials.secret)
            }
            Ok(None) => {
                tracing::info!("Keychain: string does not exist for key: {}", key);
                self.diagnostics
                    .breadcrumb(&format!("Keychain: string does not exist for key: {}", key));
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(
                    "Keychain: failed to load string for key: {} error: {}",
                    key,
                    err
                );
                self.diagnostics.breadcrumb(&format!(
                    "Keychain: failed to load string for key: {} code: {}",
                    key, err.code
                ));
                self.diagnostics.capture_error(&err);
                match mode {
                    ReadMode::Lenient => Ok(None),
                    ReadMode::Strict => Err(err.into()),
                }
            }
        }
    }

    /// Encode `value` as JSON and write it under `key`.
    pub async fn save_object<T>(
        &self,
        key: &str,
        value: &T,
        options: &AccessControlOptions,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(value).map_err(|source| KeychainError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.save_string(key, &json, options).await
    }

    /// Read and decode the JSON document stored under `key`.
    ///
    /// Store failures and malformed documents are returned as errors. Absent
    /// and empty entries yield `Ok(None)`.
    pub async fn load_object<T>(
        &self,
        key: &str,
        options: Option<&AccessControlOptions>,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let json = match self.load_string(key, options, ReadMode::Strict).await? {
            Some(json) if !json.is_empty() => json,
            _ => return Ok(None),
        };

        match serde_json::from_str(&json) {
            Ok(value) => {
                tracing::debug!("Keychain: parsed object for key: {}", key);
                Ok(Some(value))
            }
            Err(source) => {
                let err = KeychainError::Deserialize {
                    key: key.to_string(),
                    source,
                };
                tracing::error!("Keychain: {}", err);
                self.diagnostics.capture_error(&err);
                Err(err)
            }
        }
    }

    /// Delete the entry for `key`. Failures are logged and swallowed.
    pub async fn remove(&self, key: &str) {
        match self.backend.delete(key).await {
            Ok(()) => tracing::debug!("Keychain: removed value for key: {}", key),
            Err(err) => {
                tracing::warn!(
                    "Keychain: failed to remove value for key: {} error: {}",
                    key,
                    err
                );
                self.diagnostics.capture_error(&err);
            }
        }
    }

    /// Every entry with its value, or `None` if enumeration failed.
    pub async fn load_all_keys(&self) -> Option<Vec<Credentials>> {
        match self.backend.list_all().await {
            Ok(all) => Some(all),
            Err(err) => {
                tracing::warn!("Keychain: failed to loadAllKeys error: {}", err);
                self.diagnostics
                    .breadcrumb(&format!("Keychain: failed to loadAllKeys code: {}", err.code));
                self.diagnostics.capture_error(&err);
                None
            }
        }
    }

    /// Every key without decrypting values, or `None` if enumeration failed.
    pub async fn load_all_keys_only(&self) -> Option<Vec<String>> {
        match self.backend.list_all_keys().await {
            Ok(keys) => Some(keys),
            Err(err) => {
                tracing::warn!("Keychain: failed to loadAllKeysOnly error: {}", err);
                self.diagnostics.capture_error(&err);
                None
            }
        }
    }

    /// Length, nullness and type of every value, keyed by entry.
    ///
    /// Empty when enumeration fails.
    pub async fn all_keys_anonymized(&self) -> BTreeMap<String, AnonymizedEntry> {
        self.load_all_keys()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|creds| {
                let entry = AnonymizedEntry::from_secret(creds.secret.as_deref());
                (creds.identifier, entry)
            })
            .collect()
    }

    /// Whether `key` exists. Failures read as `false`.
    pub async fn has_key(&self, key: &str) -> bool {
        match self.backend.exists(key).await {
            Ok(exists) => exists,
            Err(err) => {
                tracing::warn!(
                    "Keychain: failed to check if key {} exists - error: {}",
                    key,
                    err
                );
                self.diagnostics.breadcrumb(&format!(
                    "Keychain: failed to check if key {} exists code: {}",
                    key, err.code
                ));
                self.diagnostics.capture_error(&err);
                false
            }
        }
    }

    /// Delete every entry.
    ///
    /// Deletes run concurrently and the call returns once all of them have
    /// settled. Failures are reported once, in aggregate.
    pub async fn wipe_keychain(&self) {
        let Some(entries) = self.load_all_keys().await else {
            tracing::warn!("Keychain: nothing to wipe, enumeration failed");
            return;
        };

        let deletes = entries
            .iter()
            .map(|creds| self.backend.delete(&creds.identifier));
        let results = futures::future::join_all(deletes).await;

        let failures: Vec<_> = results.into_iter().filter_map(|r| r.err()).collect();
        match failures.first() {
            None => tracing::info!("Keychain: wiped {} entries", entries.len()),
            Some(first) => {
                let failed = failures.len();
                tracing::error!(
                    "Keychain: error while wiping keychain, {} of {} deletes failed",
                    failed,
                    entries.len()
                );
                self.diagnostics.capture_error(first);
            }
        }
    }

    /// Strongest access control `probe` confirms for this device.
    ///
    /// Emulators only downgrade the result when the configuration marks this
    /// as a development build.
    pub async fn private_access_control_options<P>(&self, probe: &P) -> AccessControlOptions
    where
        P: AuthenticationProbe + ?Sized,
    {
        probe_private_access_control_options(probe, self.config.development_build).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessControlPolicy, Accessible};
    use crate::catalog::ErrorCode;
    use crate::retry::RetryPolicy;
    use crate::test_utils::{FixedProbe, RecordingDiagnostics, ScriptedCredentialStore};
    use std::time::Duration;

    fn store() -> SecureStringStore<ScriptedCredentialStore, RecordingDiagnostics> {
        let config = StoreConfig::default().with_retry(RetryPolicy::immediate());
        SecureStringStore::with_config(ScriptedCredentialStore::new(), config)
            .with_diagnostics(RecordingDiagnostics::new())
    }

    fn public() -> AccessControlOptions {
        AccessControlOptions::public()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = store();
        store.save_string("k", "value", &public()).await.unwrap();

        let loaded = store.load_string("k", None, ReadMode::Strict).await.unwrap();
        assert_eq!(loaded.as_deref(), Some("value"));
        assert_eq!(store.backend().inner().username_of("k").as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_write_retried_once_then_succeeds() {
        let store = store();
        store.backend().fail_writes([ErrorCode::Io]);

        store.save_string("k", "v", &public()).await.unwrap();

        assert_eq!(store.backend().write_attempts(), 2);
        assert_eq!(
            store.diagnostics().messages(),
            vec!["Keychain write first attempt failed"]
        );
    }

    #[tokio::test]
    async fn test_write_attempts_leave_breadcrumbs() {
        let store = store();
        store.backend().fail_writes([ErrorCode::Io]);

        store.save_string("k", "secret-value", &public()).await.unwrap();

        let crumbs = store.diagnostics().breadcrumbs();
        assert_eq!(crumbs.len(), 2);
        assert!(crumbs[0].starts_with("Keychain: failed to save string for key: k"));
        assert_eq!(crumbs[1], "Keychain: saved string for key: k on second attempt");
        assert!(!store.diagnostics().mentions("secret-value"));
    }

    #[tokio::test]
    async fn test_read_outcomes_leave_breadcrumbs() {
        let store = store();
        store.load_string("absent", None, ReadMode::Lenient).await.unwrap();
        store.backend().fail_reads([ErrorCode::InteractionNotAllowed]);
        store.load_string("locked", None, ReadMode::Lenient).await.unwrap();

        let crumbs = store.diagnostics().breadcrumbs();
        assert_eq!(crumbs[0], "Keychain: string does not exist for key: absent");
        assert!(crumbs[1].starts_with("Keychain: failed to load string for key: locked"));
    }

    #[tokio::test]
    async fn test_write_fails_after_two_attempts() {
        let store = store();
        store
            .backend()
            .fail_writes([ErrorCode::Io, ErrorCode::DuplicateItem]);

        let err = store.save_string("k", "v", &public()).await.unwrap_err();

        assert_eq!(store.backend().write_attempts(), 2);
        assert_eq!(err.code(), Some(ErrorCode::DuplicateItem));
        assert_eq!(
            store.diagnostics().messages(),
            vec![
                "Keychain write first attempt failed",
                "Keychain write second attempt failed"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_absent() {
        let store = store();
        let loaded = store
            .load_string("missing", None, ReadMode::Strict)
            .await
            .unwrap();
        assert_eq!(loaded, None);
        assert!(store.diagnostics().errors().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_retried_once() {
        let store = store();
        store.save_string("k", "v", &public()).await.unwrap();
        store.backend().fail_reads([ErrorCode::AuthFailed]);

        let loaded = store.load_string("k", None, ReadMode::Strict).await.unwrap();

        assert_eq!(loaded.as_deref(), Some("v"));
        assert_eq!(store.backend().read_attempts(), 2);
        assert_eq!(
            store.diagnostics().messages(),
            vec!["Keychain read first attempt failed"]
        );
    }

    #[tokio::test]
    async fn test_single_attempt_read_reports_no_retry() {
        let config = StoreConfig::default().with_retry(RetryPolicy::new(1, Duration::ZERO));
        let store = SecureStringStore::with_config(ScriptedCredentialStore::new(), config)
            .with_diagnostics(RecordingDiagnostics::new());
        store.backend().fail_reads([ErrorCode::AuthFailed]);

        let loaded = store.load_string("k", None, ReadMode::Lenient).await.unwrap();

        assert_eq!(loaded, None);
        assert_eq!(store.backend().read_attempts(), 1);
        assert!(store.diagnostics().messages().is_empty());
        assert_eq!(store.diagnostics().errors().len(), 1);
    }

    #[tokio::test]
    async fn test_other_read_failures_not_retried() {
        let store = store();
        store.backend().fail_reads([ErrorCode::InteractionNotAllowed]);

        let err = store
            .load_string("k", None, ReadMode::Strict)
            .await
            .unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::InteractionNotAllowed));
        assert_eq!(store.backend().read_attempts(), 1);
        assert!(store.diagnostics().messages().is_empty());
        assert_eq!(store.diagnostics().errors().len(), 1);
    }

    #[tokio::test]
    async fn test_lenient_read_degrades_to_absent() {
        let store = store();
        store
            .backend()
            .fail_reads([ErrorCode::AuthFailed, ErrorCode::AuthFailed]);

        let loaded = store.load_string("k", None, ReadMode::Lenient).await.unwrap();

        assert_eq!(loaded, None);
        assert_eq!(store.backend().read_attempts(), 2);
        assert_eq!(
            store.diagnostics().messages(),
            vec![
                "Keychain read first attempt failed",
                "Keychain read second attempt failed"
            ]
        );
    }

    #[tokio::test]
    async fn test_object_round_trip() {
        let store = store();
        let value = serde_json::json!({"accounts": [{"index": 0, "label": "main"}]});
        store.save_object("wallets", &value, &public()).await.unwrap();

        let loaded: Option<serde_json::Value> = store.load_object("wallets", None).await.unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn test_object_rejects_malformed_entry() {
        let store = store();
        store.save_string("k", "not json", &public()).await.unwrap();

        let err = store
            .load_object::<serde_json::Value>("k", None)
            .await
            .unwrap_err();
        assert!(matches!(err, KeychainError::Deserialize { .. }));
        assert_eq!(store.diagnostics().errors().len(), 1);
    }

    #[tokio::test]
    async fn test_object_empty_entry_is_absent() {
        let store = store();
        store.save_string("k", "", &public()).await.unwrap();

        let loaded: Option<serde_json::Value> = store.load_object("k", None).await.unwrap();
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_object_propagates_store_failure() {
        let store = store();
        store.backend().fail_reads([ErrorCode::Decode]);

        let err = store
            .load_object::<serde_json::Value>("k", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Decode));
    }

    #[tokio::test]
    async fn test_remove_swallows_failures() {
        let store = store();
        store.save_string("k", "v", &public()).await.unwrap();
        store.backend().fail_deletes_for("k");

        store.remove("k").await;

        assert!(store.has_key("k").await);
        assert_eq!(store.diagnostics().errors().len(), 1);
    }

    #[tokio::test]
    async fn test_enumeration_failures_are_absent() {
        let store = store();
        store.backend().fail_listing(Some(ErrorCode::NotAvailable));

        assert_eq!(store.load_all_keys().await, None);
        assert_eq!(store.load_all_keys_only().await, None);
        assert!(store.all_keys_anonymized().await.is_empty());
    }

    #[tokio::test]
    async fn test_anonymized_report() {
        let store = store();
        store.save_string("a", "héllo", &public()).await.unwrap();
        store.save_string("b", "secret", &public()).await.unwrap();
        store.backend().withhold_secret("b");

        let report = store.all_keys_anonymized().await;

        assert_eq!(
            report["a"],
            AnonymizedEntry {
                length: 5,
                is_nil: false,
                value_type: ValueType::String
            }
        );
        assert!(report["b"].is_nil);
        assert_eq!(report["b"].value_type, ValueType::Undefined);

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("héllo"));
        assert!(json.contains("\"undefined\""));
    }

    #[tokio::test]
    async fn test_has_key_failure_is_false() {
        let store = store();
        store.save_string("k", "v", &public()).await.unwrap();
        assert!(store.has_key("k").await);

        store.backend().fail_exists(Some(ErrorCode::Io));
        assert!(!store.has_key("k").await);
    }

    #[tokio::test]
    async fn test_wipe_tolerates_partial_failure() {
        let store = store();
        for key in ["a", "b", "c"] {
            store.save_string(key, "v", &public()).await.unwrap();
        }
        store.backend().fail_deletes_for("b");

        store.wipe_keychain().await;

        assert_eq!(store.load_all_keys_only().await, Some(vec!["b".to_string()]));
        assert_eq!(store.backend().delete_attempts(), 3);
        assert_eq!(store.diagnostics().errors().len(), 1);
    }

    #[tokio::test]
    async fn test_values_never_reach_diagnostics() {
        let store = store();
        store.backend().fail_writes([ErrorCode::Io, ErrorCode::Io]);
        let _ = store.save_string("k", "hunter2", &public()).await;
        store.backend().fail_reads([ErrorCode::AuthFailed, ErrorCode::AuthFailed]);
        let _ = store.load_string("k", None, ReadMode::Lenient).await;

        assert!(!store.diagnostics().mentions("hunter2"));
    }

    #[tokio::test]
    async fn test_private_options_follow_development_flag() {
        let probe = FixedProbe::apple(true).on_emulator();

        let dev = SecureStringStore::with_config(
            ScriptedCredentialStore::new(),
            StoreConfig::default().with_development_build(true),
        );
        assert_eq!(
            dev.private_access_control_options(&probe).await,
            AccessControlOptions::default()
        );

        let release = SecureStringStore::with_config(
            ScriptedCredentialStore::new(),
            StoreConfig::default().with_development_build(false),
        );
        let options = release.private_access_control_options(&probe).await;
        assert_eq!(options.policy(), AccessControlPolicy::Authenticated);
        assert_eq!(
            options.accessible,
            Some(Accessible::WhenUnlockedThisDeviceOnly)
        );
    }
}
