//! Headless core of the claims fraud-risk console.
//!
//! The core owns every decision the console makes: which region filter is
//! valid, when the three region-scoped datasets are fetched, how a failed
//! fetch is reported, when a search is routed to the backend. The shell only
//! renders [`ViewModel`] and executes the effects the core asks for.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod api;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod filter;
pub mod model;
pub mod report;
pub mod search;
pub mod session;
pub mod sync;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::ConsoleConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::{ActiveView, ViewModel};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 1_000;
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
pub const DEFAULT_ANOMALY_PAGE_SIZE: u32 = 50;
pub const MAX_ANOMALY_PAGE_SIZE: u32 = 1_000;
pub const DEFAULT_SESSION_KEY: &str = "ayushguard_user";
pub const MAX_IDENTITY_LENGTH: usize = 256;

/// Wire value of the "no restriction" region sentinel.
pub const ALL_REGIONS: &str = "All";

pub const CONNECTIVITY_ERROR_MESSAGE: &str = "Security Node Offline. Reconnecting...";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";
pub const LOGIN_TRANSPORT_MESSAGE: &str = "Connection to security server failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Authentication,
    Validation,
    Storage,
    Deserialization,
    InvalidState,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Authentication => "AUTH_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Storage => ErrorSeverity::Transient,
            Self::Deserialization | Self::InvalidState => ErrorSeverity::Fatal,
            Self::Authentication | Self::Validation | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Storage)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    /// The "reconnect" error a failed manual sync cycle surfaces.
    #[must_use]
    pub fn connectivity() -> Self {
        Self::new(ErrorKind::Network, CONNECTIVITY_ERROR_MESSAGE)
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable() && !matches!(self.severity, ErrorSeverity::Fatal)
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => CONNECTIVITY_ERROR_MESSAGE.into(),
            ErrorKind::Authentication | ErrorKind::Validation => self.message.clone(),
            ErrorKind::Storage => {
                "Unable to access the saved session on this device.".into()
            }
            ErrorKind::Deserialization => {
                "A data error occurred. Please contact support if this persists.".into()
            }
            ErrorKind::InvalidState | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again or contact support.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<capabilities::FetchError> for AppError {
    fn from(e: capabilities::FetchError) -> Self {
        let kind = match e {
            capabilities::FetchError::InvalidUrl { .. } => ErrorKind::InvalidState,
            capabilities::FetchError::Encode { .. } => ErrorKind::Deserialization,
            capabilities::FetchError::Transport { .. }
            | capabilities::FetchError::Status { .. }
            | capabilities::FetchError::EmptyBody => ErrorKind::Network,
        };
        let app = Self::new(kind, CONNECTIVITY_ERROR_MESSAGE).with_internal(e.to_string());
        match e {
            capabilities::FetchError::Status { status } => {
                app.with_context("http_status", status.to_string())
            }
            _ => app,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<session::SessionError> for AppError {
    fn from(e: session::SessionError) -> Self {
        let kind = match e {
            session::SessionError::Storage(_) => ErrorKind::Storage,
            session::SessionError::NotUtf8 => ErrorKind::Deserialization,
            session::SessionError::EmptyIdentity
            | session::SessionError::IdentityTooLong { .. }
            | session::SessionError::MissingCredentials => ErrorKind::Validation,
        };
        AppError::new(kind, e.to_string())
    }
}
