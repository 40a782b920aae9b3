use thiserror::Error;

/// Failures produced by the fetch/cache layer.
///
/// `Clone` because one failed batched provider call has to occupy every
/// unresolved slot of a bulk result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// The provider answered with a non-success status.
    #[error("provider returned status {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider response could not be turned into weather data.
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// The request failed before any HTTP status was received.
    #[error("network error: {0}")]
    Network(String),

    /// The provider call exceeded the configured deadline.
    #[error("provider request timed out")]
    Timeout,

    /// The operation was cancelled before this fetch completed.
    #[error("fetch was cancelled")]
    Cancelled,
}

impl WeatherError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout
        } else {
            WeatherError::Network(err.to_string())
        }
    }
}
