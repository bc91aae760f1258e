//! Desktop credential store over the operating system keychain.
//!
//! - **macOS**: Keychain Services generic passwords (via security-framework crate)
//! - **Linux**: Secret Service API (via secret-service crate)
//!
//! Other targets compile, but every call fails with
//! [`ErrorCode::NotAvailable`](crate::catalog::ErrorCode::NotAvailable).
//!
//! Desktop keyrings protect entries with the login session rather than a live
//! biometric prompt, so access-control options are accepted but not enforced
//! here, and the store reports no authentication capability.

use async_trait::async_trait;

use super::traits::{
    AuthenticationProbe, AuthenticationType, BiometryType, CredentialStore, Credentials,
    PlatformFamily,
};
use crate::access::{AccessControlOptions, AccessControlPolicy};
use crate::errors::PlatformResult;
#[cfg(any(target_os = "macos", target_os = "linux"))]
use crate::{catalog::ErrorCode, errors::PlatformError};

/// Operating system keychain, namespaced by a service name.
pub struct DesktopCredentialStore {
    service: String,
}

impl DesktopCredentialStore {
    /// Create a store whose entries live under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The service namespace.
    pub fn service(&self) -> &str {
        &self.service
    }
}

#[cfg(any(target_os = "macos", target_os = "linux"))]
fn decode_secret(key: &str, bytes: Vec<u8>) -> PlatformResult<String> {
    String::from_utf8(bytes).map_err(|_| {
        PlatformError::new(
            ErrorCode::Decode,
            format!("entry {} is not valid UTF-8", key),
        )
    })
}

/// Turn one per-entry read made during enumeration into a listed entry.
///
/// An entry that vanished since the key listing is skipped. An entry the
/// platform refuses to decrypt is listed with its secret withheld.
#[cfg_attr(not(any(target_os = "macos", target_os = "linux")), allow(dead_code))]
fn listed_entry(
    key: String,
    read: PlatformResult<Option<Credentials>>,
) -> Option<Credentials> {
    match read {
        Ok(found) => found,
        Err(err) => {
            tracing::debug!("Keychain: withholding secret for key: {} ({})", key, err.code);
            Some(Credentials {
                identifier: key,
                secret: None,
            })
        }
    }
}

// ============================================================================
// macOS Keychain implementation
// ============================================================================

#[cfg(target_os = "macos")]
mod native {
    use security_framework::base::Error as SecError;
    use security_framework::item::{ItemClass, ItemSearchOptions, Limit};
    use security_framework::passwords::{
        delete_generic_password, get_generic_password, set_generic_password,
    };

    use super::{decode_secret, listed_entry, Credentials, DesktopCredentialStore, PlatformResult};
    use crate::errors::PlatformError;

    /// errSecItemNotFound
    const ITEM_NOT_FOUND: i32 = -25300;

    fn platform_error(err: SecError) -> PlatformError {
        // Security.framework reports the catalog messages verbatim
        PlatformError::from_message(err.to_string())
    }

    impl DesktopCredentialStore {
        pub(super) async fn native_write(&self, key: &str, secret: &str) -> PlatformResult<()> {
            set_generic_password(&self.service, key, secret.as_bytes()).map_err(platform_error)
        }

        pub(super) async fn native_read(&self, key: &str) -> PlatformResult<Option<Credentials>> {
            match get_generic_password(&self.service, key) {
                Ok(bytes) => Ok(Some(Credentials::new(key, decode_secret(key, bytes)?))),
                Err(e) if e.code() == ITEM_NOT_FOUND => Ok(None),
                Err(e) => Err(platform_error(e)),
            }
        }

        pub(super) async fn native_delete(&self, key: &str) -> PlatformResult<()> {
            match delete_generic_password(&self.service, key) {
                Ok(()) => Ok(()),
                Err(e) if e.code() == ITEM_NOT_FOUND => Ok(()),
                Err(e) => Err(platform_error(e)),
            }
        }

        pub(super) async fn native_exists(&self, key: &str) -> PlatformResult<bool> {
            // Attributes only, so the item is never decrypted
            match ItemSearchOptions::new()
                .class(ItemClass::generic_password())
                .service(&self.service)
                .account(key)
                .load_attributes(true)
                .limit(Limit::Max(1))
                .search()
            {
                Ok(results) => Ok(!results.is_empty()),
                Err(e) if e.code() == ITEM_NOT_FOUND => Ok(false),
                Err(e) => Err(platform_error(e)),
            }
        }

        pub(super) async fn native_list_keys(&self) -> PlatformResult<Vec<String>> {
            let results = match ItemSearchOptions::new()
                .class(ItemClass::generic_password())
                .service(&self.service)
                .load_attributes(true)
                .limit(Limit::All)
                .search()
            {
                Ok(results) => results,
                Err(e) if e.code() == ITEM_NOT_FOUND => return Ok(Vec::new()),
                Err(e) => return Err(platform_error(e)),
            };

            let mut keys: Vec<String> = results
                .iter()
                .filter_map(|result| result.simplify_dict())
                .filter_map(|mut attrs| attrs.remove("acct"))
                .collect();
            keys.sort();
            keys.dedup();
            Ok(keys)
        }

        pub(super) async fn native_list_all(&self) -> PlatformResult<Vec<Credentials>> {
            let mut all = Vec::new();
            for key in self.native_list_keys().await? {
                let read = self.native_read(&key).await;
                all.extend(listed_entry(key, read));
            }
            Ok(all)
        }
    }
}

// ============================================================================
// Linux Secret Service implementation
// ============================================================================

#[cfg(target_os = "linux")]
mod native {
    use std::collections::HashMap;

    use secret_service::{EncryptionType, SecretService};

    use super::{decode_secret, listed_entry, Credentials, DesktopCredentialStore, PlatformResult};
    use crate::catalog::ErrorCode;
    use crate::errors::PlatformError;

    const ATTR_APPLICATION: &str = "application";
    const ATTR_KEY: &str = "key_id";

    fn platform_error(context: &str, err: secret_service::Error) -> PlatformError {
        let mut error = PlatformError::from_message(err.to_string());
        error.message = format!("{}: {}", context, error.message);
        error
    }

    /// Connect and bind the unlocked default collection to `$collection`.
    macro_rules! open_collection {
        ($ss:ident, $collection:ident) => {
            let $ss = SecretService::connect(EncryptionType::Dh)
                .await
                .map_err(|e| {
                    PlatformError::new(
                        ErrorCode::NotAvailable,
                        format!("Secret Service connection failed: {}", e),
                    )
                })?;
            let $collection = $ss
                .get_default_collection()
                .await
                .map_err(|e| platform_error("Failed to get default collection", e))?;
            if $collection.is_locked().await.unwrap_or(true) {
                $collection.unlock().await.map_err(|e| {
                    PlatformError::new(
                        ErrorCode::NotAuthenticated,
                        format!("Failed to unlock collection: {}", e),
                    )
                })?;
            }
        };
    }

    impl DesktopCredentialStore {
        fn attributes<'a>(&'a self, key: Option<&'a str>) -> HashMap<&'a str, &'a str> {
            let mut attributes = HashMap::new();
            attributes.insert(ATTR_APPLICATION, self.service.as_str());
            if let Some(key) = key {
                attributes.insert(ATTR_KEY, key);
            }
            attributes
        }

        pub(super) async fn native_write(&self, key: &str, secret: &str) -> PlatformResult<()> {
            open_collection!(ss, collection);
            let label = format!("{}.{}", self.service, key);

            collection
                .create_item(
                    &label,
                    self.attributes(Some(key)),
                    secret.as_bytes(),
                    true, // replace if exists
                    "text/plain",
                )
                .await
                .map_err(|e| platform_error("Failed to store secret", e))?;
            Ok(())
        }

        pub(super) async fn native_read(&self, key: &str) -> PlatformResult<Option<Credentials>> {
            open_collection!(ss, collection);

            let items = collection
                .search_items(self.attributes(Some(key)))
                .await
                .map_err(|e| platform_error("Failed to search secrets", e))?;

            let Some(item) = items.first() else {
                return Ok(None);
            };

            if item.is_locked().await.unwrap_or(true) {
                item.unlock().await.map_err(|e| {
                    PlatformError::new(
                        ErrorCode::NotAuthenticated,
                        format!("Failed to unlock item: {}", e),
                    )
                })?;
            }

            let secret = item
                .get_secret()
                .await
                .map_err(|e| platform_error("Failed to retrieve secret", e))?;
            Ok(Some(Credentials::new(key, decode_secret(key, secret)?)))
        }

        pub(super) async fn native_exists(&self, key: &str) -> PlatformResult<bool> {
            open_collection!(ss, collection);

            let items = collection
                .search_items(self.attributes(Some(key)))
                .await
                .map_err(|e| platform_error("Failed to search secrets", e))?;
            Ok(!items.is_empty())
        }

        pub(super) async fn native_delete(&self, key: &str) -> PlatformResult<()> {
            open_collection!(ss, collection);

            let items = collection
                .search_items(self.attributes(Some(key)))
                .await
                .map_err(|e| platform_error("Failed to search secrets", e))?;

            for item in items {
                item.delete()
                    .await
                    .map_err(|e| platform_error("Failed to delete secret", e))?;
            }
            Ok(())
        }

        pub(super) async fn native_list_keys(&self) -> PlatformResult<Vec<String>> {
            open_collection!(ss, collection);

            let items = collection
                .search_items(self.attributes(None))
                .await
                .map_err(|e| platform_error("Failed to search secrets", e))?;

            let mut keys = Vec::with_capacity(items.len());
            for item in items {
                let mut attrs = item
                    .get_attributes()
                    .await
                    .map_err(|e| platform_error("Failed to read attributes", e))?;
                if let Some(key) = attrs.remove(ATTR_KEY) {
                    keys.push(key);
                }
            }
            keys.sort();
            keys.dedup();
            Ok(keys)
        }

        pub(super) async fn native_list_all(&self) -> PlatformResult<Vec<Credentials>> {
            open_collection!(ss, collection);

            let items = collection
                .search_items(self.attributes(None))
                .await
                .map_err(|e| platform_error("Failed to search secrets", e))?;

            let mut all = Vec::with_capacity(items.len());
            for item in items {
                let mut attrs = item
                    .get_attributes()
                    .await
                    .map_err(|e| platform_error("Failed to read attributes", e))?;
                let Some(key) = attrs.remove(ATTR_KEY) else {
                    continue;
                };
                let read = item
                    .get_secret()
                    .await
                    .map_err(|e| platform_error("Failed to retrieve secret", e))
                    .and_then(|bytes| decode_secret(&key, bytes))
                    .map(|secret| Some(Credentials::new(key.as_str(), secret)));
                all.extend(listed_entry(key, read));
            }
            all.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            Ok(all)
        }
    }
}

// ============================================================================
// Unsupported targets
// ============================================================================

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
mod native {
    use super::{Credentials, DesktopCredentialStore, PlatformResult};
    use crate::errors::PlatformError;

    fn unsupported<T>() -> PlatformResult<T> {
        Err(PlatformError::unavailable(
            "no native keychain support on this target",
        ))
    }

    impl DesktopCredentialStore {
        pub(super) async fn native_write(&self, _key: &str, _secret: &str) -> PlatformResult<()> {
            unsupported()
        }

        pub(super) async fn native_read(&self, _key: &str) -> PlatformResult<Option<Credentials>> {
            unsupported()
        }

        pub(super) async fn native_exists(&self, _key: &str) -> PlatformResult<bool> {
            unsupported()
        }

        pub(super) async fn native_delete(&self, _key: &str) -> PlatformResult<()> {
            unsupported()
        }

        pub(super) async fn native_list_keys(&self) -> PlatformResult<Vec<String>> {
            unsupported()
        }

        pub(super) async fn native_list_all(&self) -> PlatformResult<Vec<Credentials>> {
            unsupported()
        }
    }
}

#[async_trait]
impl CredentialStore for DesktopCredentialStore {
    async fn write(
        &self,
        key: &str,
        _username: &str,
        secret: &str,
        options: &AccessControlOptions,
    ) -> PlatformResult<()> {
        if options.policy() == AccessControlPolicy::Authenticated {
            tracing::debug!(
                "Keychain: desktop store protects {} with the login session only",
                key
            );
        }
        self.native_write(key, secret).await
    }

    async fn read(
        &self,
        key: &str,
        _options: Option<&AccessControlOptions>,
    ) -> PlatformResult<Option<Credentials>> {
        self.native_read(key).await
    }

    async fn delete(&self, key: &str) -> PlatformResult<()> {
        self.native_delete(key).await
    }

    async fn list_all(&self) -> PlatformResult<Vec<Credentials>> {
        self.native_list_all().await
    }

    async fn list_all_keys(&self) -> PlatformResult<Vec<String>> {
        self.native_list_keys().await
    }

    async fn exists(&self, key: &str) -> PlatformResult<bool> {
        self.native_exists(key).await
    }
}

#[async_trait]
impl AuthenticationProbe for DesktopCredentialStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::probe_private_access_control_options;
    use crate::catalog::ErrorCode;
    use crate::errors::PlatformError;

    #[test]
    fn test_desktop_store_creation() {
        let store = DesktopCredentialStore::new("com.example.app");
        assert_eq!(store.service(), "com.example.app");
    }

    #[tokio::test]
    async fn test_desktop_never_offers_authenticated_policy() {
        let store = DesktopCredentialStore::new("com.example.app");
        let opts = probe_private_access_control_options(&store, true).await;
        assert_eq!(opts, AccessControlOptions::default());
    }

    #[cfg(any(target_os = "macos", target_os = "linux"))]
    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode_secret("k", vec![0xff, 0xfe]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Decode);
        assert_eq!(decode_secret("k", b"ok".to_vec()).unwrap(), "ok");
    }

    #[test]
    fn test_listing_withholds_unreadable_entries() {
        let denied = PlatformError::from_code(ErrorCode::InteractionNotAllowed);
        let listed = listed_entry("locked".to_string(), Err(denied)).unwrap();
        assert_eq!(listed.identifier, "locked");
        assert_eq!(listed.secret, None);

        let readable = Ok(Some(Credentials::new("open", "v")));
        assert_eq!(
            listed_entry("open".to_string(), readable),
            Some(Credentials::new("open", "v"))
        );

        assert_eq!(listed_entry("gone".to_string(), Ok(None)), None);
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    #[tokio::test]
    async fn test_unsupported_target_reports_unavailable() {
        let store = DesktopCredentialStore::new("com.example.app");
        let err = store.exists("k").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAvailable);
    }

    #[cfg(any(target_os = "macos", target_os = "linux"))]
    #[tokio::test]
    #[ignore = "Requires an unlocked OS keychain"]
    async fn test_exists_and_listing_against_os_keychain() {
        let store = DesktopCredentialStore::new("keychain-lib.desktop-test");
        let public = AccessControlOptions::default();
        store.write("present", "present", "v", &public).await.unwrap();

        assert!(store.exists("present").await.unwrap());
        assert!(!store.exists("absent").await.unwrap());
        let all = store.list_all().await.unwrap();
        assert!(all.iter().any(|c| c.identifier == "present"));

        store.delete("present").await.unwrap();
        assert!(!store.exists("present").await.unwrap());
    }
}
