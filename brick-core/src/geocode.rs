//! Reverse-geocoding seam.
//!
//! Implementations turn a [`Coordinate`] into a [`PlaceName`]. The trait keeps
//! transport causes typed; the HTTP client in `brick-data` and the resolver in
//! `brick-location` decide where those causes collapse into "no place".

use async_trait::async_trait;
use thiserror::Error;

use crate::{ApiKey, Coordinate, PlaceName};

/// Language requested when callers do not choose one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Credentials and presentation options for a reverse-geocoding request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    /// Provider API key.
    pub api_key: ApiKey,
    /// Language of the returned place names (e.g. `"en"`).
    pub language: String,
}

impl GeocodeQuery {
    /// Build a query using [`DEFAULT_LANGUAGE`].
    #[must_use]
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    /// Override the result language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Errors from [`ReverseGeocoder::reverse`].
///
/// Endpoints are recorded without their query string so API keys never end
/// up in error messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The request could not be delivered.
    #[error("network error contacting {endpoint}: {message}")]
    Network {
        /// Endpoint without query parameters.
        endpoint: String,
        /// Transport error description.
        message: String,
    },
    /// The provider did not answer in time.
    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint without query parameters.
        endpoint: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The provider answered with a non-success status.
    #[error("request to {endpoint} failed with status {status}")]
    Http {
        /// Endpoint without query parameters.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not the expected JSON shape.
    #[error("failed to parse geocoding response: {message}")]
    Parse {
        /// Decoder error description.
        message: String,
    },
}

/// Resolve coordinates into human-readable place names.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Return the place name for `coordinate`.
    ///
    /// `Ok(None)` means the provider answered but had no city or county for
    /// the position.
    async fn reverse(
        &self,
        coordinate: Coordinate,
        query: &GeocodeQuery,
    ) -> Result<Option<PlaceName>, GeocodeError>;
}
