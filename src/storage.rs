//! Store credentials kept in the OS credential store.
//!
//! On Windows this uses the Credential Manager (via the `keyring` crate), on
//! macOS the Keychain, and on Linux the Secret Service API. Environment
//! variables take precedence; see [`crate::config`].

use keyring::Entry;
use tracing::{info, warn};

const SERVICE_NAME: &str = "campus-bites";

pub const KEY_STORE_URL: &str = "supabase_url";
pub const KEY_ANON_KEY: &str = "supabase_anon_key";

const ALL_KEYS: &[&str] = &[KEY_STORE_URL, KEY_ANON_KEY];

/// Retrieve a single credential. Returns `None` when the entry does not exist
/// or the platform store is unavailable.
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) if !pw.trim().is_empty() => Some(pw),
        Ok(_) => None,
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential. Succeeds if the entry does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Persist the store URL and anon key.
pub fn save_store_credentials(store_url: &str, anon_key: &str) -> Result<(), String> {
    let store_url = store_url.trim();
    let anon_key = anon_key.trim();
    if store_url.is_empty() || anon_key.is_empty() {
        return Err("Both the store URL and the anon key are required".into());
    }
    set_credential(KEY_STORE_URL, store_url)?;
    set_credential(KEY_ANON_KEY, anon_key)?;
    info!("store credentials saved to keyring");
    Ok(())
}

/// Remove every credential this app stores.
pub fn factory_reset() -> Result<(), String> {
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    info!("keyring credentials cleared");
    Ok(())
}
