use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("invalid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("transport failure: {message}")]
    Transport { message: String },

    #[error("HTTP error {status}")]
    Status { status: u16 },

    #[error("response carried no body")]
    EmptyBody,

    #[error("request body could not be encoded: {message}")]
    Encode { message: String },
}

impl FetchError {
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Status { status } if *status >= 400 && *status < 500)
    }

    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { status } if *status >= 500)
    }
}

impl From<crate::config::ConfigError> for FetchError {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::InvalidUrl {
            reason: e.to_string(),
        }
    }
}

/// Reduces a shell HTTP response to its decoded body. Non-2xx statuses and
/// bodiless responses count as failures; undecodable JSON arrives from
/// `crux_http` as a transport error.
pub fn settle<T>(result: crux_http::Result<crux_http::Response<T>>) -> Result<T, FetchError> {
    let mut response = result.map_err(|e| FetchError::Transport {
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: u16::from(status),
        });
    }

    response.take_body().ok_or(FetchError::EmptyBody)
}

/// Correlation id attached to every outbound request.
#[must_use]
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let not_found = FetchError::Status { status: 404 };
        assert!(not_found.is_client_error());
        assert!(!not_found.is_server_error());
        assert_eq!(not_found.status(), Some(404));

        let unavailable = FetchError::Status { status: 503 };
        assert!(unavailable.is_server_error());
        assert!(!unavailable.is_client_error());

        assert_eq!(FetchError::EmptyBody.status(), None);
    }

    #[test]
    fn test_request_ids_are_unique_uuids() {
        let first = request_id();
        let second = request_id();
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::Status { status: 500 }.to_string(),
            "HTTP error 500"
        );
        assert_eq!(
            FetchError::Transport {
                message: "connection refused".into()
            }
            .to_string(),
            "transport failure: connection refused"
        );
    }
}
