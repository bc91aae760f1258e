//! Access command - show the policy private entries would get

use anyhow::Result;
use keychain_lib::{AuthenticationProbe, CredentialStore, DiagnosticsSink, SecureStringStore};

use crate::ui;

pub async fn run<S, D>(store: &SecureStringStore<S, D>) -> Result<()>
where
    S: CredentialStore + AuthenticationProbe,
    D: DiagnosticsSink,
{
    let probe = store.backend();
    let options = store.private_access_control_options(probe).await;

    ui::fields(
        "Access Control",
        &[
            ("Platform", format!("{:?}", probe.platform_family())),
            ("Service", store.config().service.clone()),
            ("Development build", store.config().development_build.to_string()),
            ("Private policy", format!("{:?}", options.policy())),
            ("Options", serde_json::to_string(&options)?),
        ],
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keychain_lib::InMemoryCredentialStore;

    #[tokio::test]
    async fn test_reports_policy() {
        let store = SecureStringStore::new(InMemoryCredentialStore::new());
        run(&store).await.unwrap();
    }
}
