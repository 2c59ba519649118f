use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "docsecure";

/// Remembered passwords, held in the OS keychain keyed by username.
///
/// This is strictly a convenience for the login form and the `--login`
/// flow; the session itself never goes through the keychain.
pub struct CredentialStore;

impl CredentialStore {
    /// Remember the password for a username
    pub fn store(username: &str, password: &str) -> Result<()> {
        let entry =
            Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// The remembered password for a username, if there is one
    pub fn remembered_password(username: &str) -> Option<String> {
        let entry = Entry::new(SERVICE_NAME, username).ok()?;
        entry.get_password().ok()
    }

    /// Forget the remembered password for a username.
    /// Used when a remembered password turns out to be stale.
    pub fn forget(username: &str) -> Result<()> {
        let entry =
            Entry::new(SERVICE_NAME, username).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}
