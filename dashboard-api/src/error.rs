//! Error types for dashboard API calls.

use thiserror::Error;

/// Errors that can occur when talking to the dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The endpoint does not exist.
    #[error("endpoint '{0}' does not exist")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed, or no token is available.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DashboardError::Timeout
        } else if err.is_connect() {
            DashboardError::Connection(err.to_string())
        } else if err.is_decode() {
            DashboardError::Parse(err.to_string())
        } else {
            DashboardError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DashboardError::NotFound("https://dash.local/feeds".to_string()).to_string(),
            "endpoint 'https://dash.local/feeds' does not exist"
        );
        assert_eq!(DashboardError::Timeout.to_string(), "Request timed out");
        assert!(DashboardError::Auth("no token for key 'ops'".to_string())
            .to_string()
            .contains("ops"));
    }
}
