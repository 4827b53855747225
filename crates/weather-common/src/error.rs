//! Error types shared by the weather pipeline crates.

use thiserror::Error;

/// Result type alias using WeatherError.
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Primary error type for source and store operations.
#[derive(Debug, Error)]
pub enum WeatherError {
    // === Remote API Errors ===
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("API returned {status} for {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    #[error("Request timeout")]
    Timeout,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    // === Request Errors ===
    #[error("Station {0} has neither a WMO id nor usable coordinates")]
    MissingLocation(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Storage Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl WeatherError {
    /// Whether the error came from talking to the remote service.
    ///
    /// Remote failures are expected to clear up by the next scheduled run.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WeatherError::Http(_) | WeatherError::Timeout | WeatherError::Api { .. }
        )
    }

    /// Whether the remote answered with a body we could not make sense of.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, WeatherError::Decode(_))
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::Decode(format!("JSON error: {}", err))
    }
}
