use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MAX_KEY_LENGTH: usize = 512;

/// A validated key-value storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: &str) -> Result<Self, StorageKeyError> {
        Self::validate(key)?;
        Ok(Self(key.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    fn validate(key: &str) -> Result<(), StorageKeyError> {
        if key.trim().is_empty() {
            return Err(StorageKeyError::Empty);
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(StorageKeyError::TooLong {
                len: key.len(),
                max: MAX_KEY_LENGTH,
            });
        }
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageKeyError::PathLike);
        }
        if key.chars().any(char::is_control) {
            return Err(StorageKeyError::ControlCharacter);
        }
        Ok(())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKeyError {
    #[error("key cannot be empty")]
    Empty,

    #[error("key is {len} bytes, maximum is {max}")]
    TooLong { len: usize, max: usize },

    #[error("key cannot look like a path")]
    PathLike,

    #[error("key cannot contain control characters")]
    ControlCharacter,
}

/// Flattens a key-value operation result into the string-typed error the
/// event payloads carry.
pub fn storage_result<T, E: fmt::Display>(result: Result<T, E>) -> Result<T, String> {
    result.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_key() {
        let key = StorageKey::new("ayushguard_user").unwrap();
        assert_eq!(key.as_str(), "ayushguard_user");
        assert_eq!(key.to_string(), "ayushguard_user");
    }

    #[test]
    fn test_rejects_blank_key() {
        assert_eq!(StorageKey::new("   "), Err(StorageKeyError::Empty));
    }

    #[test]
    fn test_rejects_oversized_key() {
        let key = "k".repeat(MAX_KEY_LENGTH + 1);
        assert_eq!(
            StorageKey::new(&key),
            Err(StorageKeyError::TooLong {
                len: MAX_KEY_LENGTH + 1,
                max: MAX_KEY_LENGTH
            })
        );
    }

    #[test]
    fn test_rejects_path_like_keys() {
        assert_eq!(StorageKey::new("../session"), Err(StorageKeyError::PathLike));
        assert_eq!(StorageKey::new("/session"), Err(StorageKeyError::PathLike));
    }

    #[test]
    fn test_rejects_control_characters() {
        assert_eq!(
            StorageKey::new("user\0key"),
            Err(StorageKeyError::ControlCharacter)
        );
    }

    #[test]
    fn test_storage_result_stringifies_error() {
        let result: Result<(), &str> = Err("quota exceeded");
        assert_eq!(storage_result(result), Err("quota exceeded".to_string()));
    }
}
