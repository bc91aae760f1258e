//! CLI command implementations

pub mod access;
pub mod entry;
pub mod inventory;
pub mod wipe;

use std::path::{Path, PathBuf};

use anyhow::Result;
use keychain_lib::access::public_access_control_options;
use keychain_lib::{
    AccessControlOptions, AuthenticationProbe, CredentialStore, DiagnosticsSink,
    SecureStringStore, StoreConfig,
};

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("keychain").join("config.json"))
}

/// Load configuration from `explicit`, falling back to the default file if it
/// exists, then apply environment overrides and the `--service` flag.
pub fn load_config(explicit: Option<&Path>, service: Option<&str>) -> Result<StoreConfig> {
    load_config_with(explicit, default_config_path().as_deref(), service, |name| {
        std::env::var(name).ok()
    })
}

fn load_config_with<F>(
    explicit: Option<&Path>,
    fallback: Option<&Path>,
    service: Option<&str>,
    lookup: F,
) -> Result<StoreConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match (explicit, fallback) {
        (Some(path), _) => StoreConfig::from_json_file(path)?,
        (None, Some(path)) if path.exists() => {
            tracing::debug!("Using config file {}", path.display());
            StoreConfig::from_json_file(path)?
        }
        _ => StoreConfig::default(),
    };

    let mut config = base.apply_vars(lookup)?;
    if let Some(service) = service {
        config = config.with_service(service);
        config.validate()?;
    }
    Ok(config)
}

/// Access control for a new entry
pub async fn options_for<S, D>(store: &SecureStringStore<S, D>, private: bool) -> AccessControlOptions
where
    S: CredentialStore + AuthenticationProbe,
    D: DiagnosticsSink,
{
    if private {
        store.private_access_control_options(store.backend()).await
    } else {
        public_access_control_options()
    }
}
