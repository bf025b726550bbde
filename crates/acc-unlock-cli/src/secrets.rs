use color_eyre::Result;
use tracing::debug;

const SERVICE: &str = "acc-unlock";

/// Client secret stored in the OS keyring for `client_id`, if any.
pub fn stored_client_secret(client_id: &str) -> Option<String> {
    let entry = keyring::Entry::new(SERVICE, client_id).ok()?;
    match entry.get_password() {
        Ok(secret) => Some(secret),
        Err(err) => {
            debug!(client_id, "no client secret in keyring: {err}");
            None
        }
    }
}

/// Persist the client secret in the OS keyring, keyed by client id.
pub fn store_client_secret(client_id: &str, secret: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE, client_id)?;
    entry.set_password(secret)?;
    Ok(())
}
