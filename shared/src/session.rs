use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::api::LoginRequest;
use crate::MAX_IDENTITY_LENGTH;

/// The signed-in operator, as returned by the login exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Result<Self, SessionError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SessionError::EmptyIdentity);
        }
        if trimmed.len() > MAX_IDENTITY_LENGTH {
            return Err(SessionError::IdentityTooLong {
                len: trimmed.len(),
                max: MAX_IDENTITY_LENGTH,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Decodes the UTF-8 bytes kept in key-value storage.
    pub fn from_stored(bytes: Vec<u8>) -> Result<Self, SessionError> {
        let name = String::from_utf8(bytes).map_err(|_| SessionError::NotUtf8)?;
        Self::new(name)
    }

    #[must_use]
    pub fn to_stored(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("identity cannot be empty")]
    EmptyIdentity,

    #[error("identity is {len} bytes, maximum is {max}")]
    IdentityTooLong { len: usize, max: usize },

    #[error("stored identity is not valid UTF-8")]
    NotUtf8,

    #[error("username and password are required")]
    MissingCredentials,

    #[error("session storage failed: {0}")]
    Storage(String),
}

/// Login form input. The password is only exposed while the request body is
/// serialized.
#[derive(Debug)]
pub struct LoginCredentials {
    pub username: String,
    pub password: SecretString,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.username.trim().is_empty() || self.password.expose_secret().is_empty() {
            return Err(SessionError::MissingCredentials);
        }
        Ok(())
    }

    pub fn to_body(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&LoginRequest {
            username: self.username.trim(),
            password: self.password.expose_secret(),
        })
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    identity: Option<Identity>,
    submitting: bool,
    login_error: Option<String>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    #[must_use]
    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    /// Marks a login exchange as started. False if one is already running.
    pub fn begin_login(&mut self) -> bool {
        if self.submitting {
            return false;
        }
        self.submitting = true;
        self.login_error = None;
        true
    }

    pub fn reject_login(&mut self, message: impl Into<String>) {
        self.submitting = false;
        self.login_error = Some(message.into());
    }

    pub fn sign_in(&mut self, identity: Identity) {
        self.submitting = false;
        self.login_error = None;
        self.identity = Some(identity);
    }

    pub fn sign_out(&mut self) -> Option<Identity> {
        self.submitting = false;
        self.login_error = None;
        self.identity.take()
    }
}
