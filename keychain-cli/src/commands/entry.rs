//! Single-entry commands - set, get, rm, has

use anyhow::{Context, Result};
use keychain_lib::{
    AuthenticationProbe, CredentialStore, DiagnosticsSink, ReadMode, SecureStringStore,
};
use serde_json::Value;

use crate::ui;

#[tracing::instrument(skip(store, value))]
pub async fn set<S, D>(
    store: &SecureStringStore<S, D>,
    key: &str,
    value: &str,
    private: bool,
) -> Result<()>
where
    S: CredentialStore + AuthenticationProbe,
    D: DiagnosticsSink,
{
    let options = super::options_for(store, private).await;
    tracing::debug!("Writing with {:?} policy", options.policy());

    store
        .save_string(key, value, &options)
        .await
        .with_context(|| format!("Failed to save '{}'", key))?;

    ui::notice(ui::Notice::Done, &format!("Saved '{}'", key));
    Ok(())
}

#[tracing::instrument(skip(store))]
pub async fn get<S, D>(store: &SecureStringStore<S, D>, key: &str, strict: bool) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    let mode = if strict {
        ReadMode::Strict
    } else {
        ReadMode::Lenient
    };

    match store.load_string(key, None, mode).await? {
        Some(value) => println!("{}", value),
        None => ui::missing("value", key),
    }
    Ok(())
}

#[tracing::instrument(skip(store, json))]
pub async fn set_object<S, D>(
    store: &SecureStringStore<S, D>,
    key: &str,
    json: &str,
    private: bool,
) -> Result<()>
where
    S: CredentialStore + AuthenticationProbe,
    D: DiagnosticsSink,
{
    let value: Value = serde_json::from_str(json).context("Value is not valid JSON")?;
    let options = super::options_for(store, private).await;

    store
        .save_object(key, &value, &options)
        .await
        .with_context(|| format!("Failed to save '{}'", key))?;

    ui::notice(ui::Notice::Done, &format!("Saved object '{}'", key));
    Ok(())
}

#[tracing::instrument(skip(store))]
pub async fn get_object<S, D>(store: &SecureStringStore<S, D>, key: &str) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    match store.load_object::<Value>(key, None).await? {
        Some(value) => ui::json(&value),
        None => ui::missing("object", key),
    }
    Ok(())
}

pub async fn remove<S, D>(store: &SecureStringStore<S, D>, key: &str) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    store.remove(key).await;
    if store.has_key(key).await {
        ui::notice(ui::Notice::Partial, &format!("'{}' could not be removed", key));
    } else {
        ui::notice(ui::Notice::Done, &format!("Removed '{}'", key));
    }
    Ok(())
}

pub async fn has<S, D>(store: &SecureStringStore<S, D>, key: &str) -> Result<bool>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    let exists = store.has_key(key).await;
    if exists {
        ui::notice(ui::Notice::Done, &format!("'{}' exists", key));
    } else {
        ui::notice(ui::Notice::Empty, &format!("'{}' not found", key));
    }
    Ok(exists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keychain_lib::catalog::ErrorCode;
    use keychain_lib::test_utils::ScriptedCredentialStore;
    use keychain_lib::{AccessControlPolicy, InMemoryCredentialStore, RetryPolicy, StoreConfig};

    fn store() -> SecureStringStore<InMemoryCredentialStore> {
        let config = StoreConfig::default().with_retry(RetryPolicy::immediate());
        SecureStringStore::with_config(InMemoryCredentialStore::new(), config)
    }

    #[tokio::test]
    async fn test_set_then_has() {
        let store = store();
        set(&store, "token", "abc", false).await.unwrap();

        assert!(has(&store, "token").await.unwrap());
        assert_eq!(
            store.backend().policy_of("token"),
            Some(AccessControlPolicy::Public)
        );
    }

    #[tokio::test]
    async fn test_private_falls_back_without_authentication() {
        let store = store();
        set(&store, "token", "abc", true).await.unwrap();

        // The in-memory backend reports no biometry
        assert_eq!(
            store.backend().policy_of("token"),
            Some(AccessControlPolicy::Public)
        );
    }

    #[tokio::test]
    async fn test_set_object_rejects_invalid_json() {
        let store = store();
        let err = set_object(&store, "obj", "{not json", false).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
        assert!(!store.has_key("obj").await);
    }

    #[tokio::test]
    async fn test_get_object_reports_corrupt_entry() {
        let store = store();
        set(&store, "obj", "plain text", false).await.unwrap();
        assert!(get_object(&store, "obj").await.is_err());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        set(&store, "k", "v", false).await.unwrap();
        remove(&store, "k").await.unwrap();
        assert!(!has(&store, "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_strict_get_surfaces_failure() {
        let config = StoreConfig::default().with_retry(RetryPolicy::immediate());
        let store = SecureStringStore::with_config(ScriptedCredentialStore::new(), config);

        store.backend().fail_reads([ErrorCode::InteractionNotAllowed]);
        assert!(get(&store, "k", false).await.is_ok());

        store.backend().fail_reads([ErrorCode::InteractionNotAllowed]);
        assert!(get(&store, "k", true).await.is_err());
    }
}
