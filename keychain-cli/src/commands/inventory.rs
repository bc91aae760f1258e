//! Inventory commands - keys, list, anonymized

use anyhow::{bail, Result};
use keychain_lib::{CredentialStore, DiagnosticsSink, SecureStringStore};

use crate::ui;

pub async fn keys<S, D>(store: &SecureStringStore<S, D>) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    let Some(keys) = store.load_all_keys_only().await else {
        bail!("Could not enumerate the keychain");
    };

    if keys.is_empty() {
        ui::notice(ui::Notice::Empty, "Keychain is empty");
        return Ok(());
    }

    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

pub async fn list<S, D>(store: &SecureStringStore<S, D>) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    let Some(entries) = store.load_all_keys().await else {
        bail!("Could not enumerate the keychain");
    };

    if entries.is_empty() {
        ui::notice(ui::Notice::Empty, "Keychain is empty");
        return Ok(());
    }

    ui::entries(&entries);
    Ok(())
}

pub async fn anonymized<S, D>(store: &SecureStringStore<S, D>) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    let report = store.all_keys_anonymized().await;
    ui::json(&serde_json::to_value(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keychain_lib::catalog::ErrorCode;
    use keychain_lib::test_utils::ScriptedCredentialStore;
    use keychain_lib::{AccessControlOptions, RetryPolicy, StoreConfig};

    fn store() -> SecureStringStore<ScriptedCredentialStore> {
        let config = StoreConfig::default().with_retry(RetryPolicy::immediate());
        SecureStringStore::with_config(ScriptedCredentialStore::new(), config)
    }

    #[tokio::test]
    async fn test_empty_keychain() {
        let store = store();
        keys(&store).await.unwrap();
        list(&store).await.unwrap();
        anonymized(&store).await.unwrap();
    }

    #[tokio::test]
    async fn test_listing_with_entries() {
        let store = store();
        store
            .save_string("a", "1", &AccessControlOptions::public())
            .await
            .unwrap();
        store.backend().withhold_secret("a");

        keys(&store).await.unwrap();
        list(&store).await.unwrap();
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_reported() {
        let store = store();
        store.backend().fail_listing(Some(ErrorCode::NotAvailable));

        assert!(keys(&store).await.is_err());
        assert!(list(&store).await.is_err());
        // The report degrades to empty instead
        assert!(anonymized(&store).await.is_ok());
    }
}
