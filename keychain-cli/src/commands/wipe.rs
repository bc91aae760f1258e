//! Wipe command - delete every entry

use anyhow::Result;
use keychain_lib::{CredentialStore, DiagnosticsSink, SecureStringStore};

use crate::ui;

#[tracing::instrument(skip(store))]
pub async fn run<S, D>(store: &SecureStringStore<S, D>, yes: bool) -> Result<()>
where
    S: CredentialStore,
    D: DiagnosticsSink,
{
    let before = store.load_all_keys_only().await.map(|k| k.len());
    if before == Some(0) {
        ui::notice(ui::Notice::Empty, "Keychain is already empty");
        return Ok(());
    }

    if !yes {
        if !ui::confirm_wipe(before)? {
            ui::notice(ui::Notice::Empty, "Aborted");
            return Ok(());
        }
    }

    let spinner = ui::wipe_spinner();
    store.wipe_keychain().await;
    spinner.finish_and_clear();

    match store.load_all_keys_only().await {
        Some(left) if left.is_empty() => ui::notice(ui::Notice::Done, "Keychain wiped"),
        Some(left) => {
            ui::notice(
                ui::Notice::Partial,
                &format!("{} entries could not be deleted:", left.len()),
            );
            for key in left {
                println!("  {}", key);
            }
        }
        None => ui::notice(
            ui::Notice::Partial,
            "Wipe finished, but the keychain could not be re-read",
        ),
    }
    Ok(())
}
