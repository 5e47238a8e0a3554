//! Thin wrapper around the OS keyring for credential storage.

const SERVICE: &str = "mission-focus";

/// Keyring entry holding the remote classifier API key.
pub const GEMINI_API_KEY: &str = "gemini_api_key";

/// Environment variable that takes precedence over the keyring entry.
pub const GEMINI_API_KEY_ENV: &str = "MISSION_FOCUS_GEMINI_KEY";

pub fn get(key: &str) -> Result<Option<String>, keyring::Error> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    match entry.get_password() {
        Ok(pw) => Ok(Some(pw)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn set(key: &str, value: &str) -> Result<(), keyring::Error> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    entry.set_password(value)
}

pub fn delete(key: &str) -> Result<(), keyring::Error> {
    let entry = keyring::Entry::new(SERVICE, key)?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Resolve the classifier API key: environment first, then keyring.
/// Blank values count as absent.
pub fn gemini_api_key() -> Result<Option<String>, keyring::Error> {
    if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV) {
        if !key.trim().is_empty() {
            return Ok(Some(key.trim().to_string()));
        }
    }
    Ok(get(GEMINI_API_KEY)?.filter(|k| !k.trim().is_empty()))
}
