// User key management for cross-device sync
// Format: "aquaflow-<uuid>"

use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const USER_KEY_FILE: &str = "user_key.txt";
const USER_KEY_PREFIX: &str = "aquaflow-";

/// Error type for user key operations
#[derive(Debug, thiserror::Error)]
pub enum UserKeyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user key format: {0}")]
    InvalidFormat(String),
}

/// Get or create the user key stored in `dir`.
///
/// The key partitions remote records; copying `user_key.txt` (or setting
/// `sync.user_key`) to another device shares the same day across both.
pub fn get_or_create_user_key_at(dir: &Path) -> Result<String, UserKeyError> {
    let key_path = dir.join(USER_KEY_FILE);

    if key_path.exists() {
        let content = fs::read_to_string(&key_path)?;
        let user_key = content.trim().to_string();
        return if is_valid_user_key(&user_key) {
            Ok(user_key)
        } else {
            Err(UserKeyError::InvalidFormat(user_key))
        };
    }

    let user_key = format!("{}{}", USER_KEY_PREFIX, Uuid::new_v4());

    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let mut file = fs::File::create(&key_path)?;
    writeln!(file, "{}", user_key)?;

    Ok(user_key)
}

/// A key is usable as a URL path segment and carries the expected prefix.
pub fn is_valid_user_key(key: &str) -> bool {
    key.len() > USER_KEY_PREFIX.len()
        && key.starts_with(USER_KEY_PREFIX)
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
