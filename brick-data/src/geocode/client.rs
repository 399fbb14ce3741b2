//! `ReverseGeocoder` over Geoapify's reverse-geocoding endpoint.

use std::time::Duration;

use async_trait::async_trait;
use brick_core::{ApiKey, Coordinate, GeocodeError, GeocodeQuery, PlaceName, ReverseGeocoder};
use log::warn;
use reqwest::{Client, header::ACCEPT};
use url::Url;

use super::geoapify::FeatureCollection;
use crate::{DEFAULT_USER_AGENT, ProviderBuildError};

/// Production Geoapify host.
pub const DEFAULT_GEOAPIFY_BASE_URL: &str = "https://api.geoapify.com";

const REVERSE_PATH: &str = "v1/geocode/reverse";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration for [`HttpReverseGeocoder`].
#[derive(Debug, Clone)]
pub struct HttpReverseGeocoderConfig {
    /// Base URL of the service (e.g. `"https://api.geoapify.com"`).
    pub base_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpReverseGeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOAPIFY_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpReverseGeocoderConfig {
    /// Create a configuration targeting `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Reverse geocoder issuing `GET {base}/v1/geocode/reverse` requests.
#[derive(Debug, Clone)]
pub struct HttpReverseGeocoder {
    client: Client,
    config: HttpReverseGeocoderConfig,
    endpoint: Url,
}

impl HttpReverseGeocoder {
    /// Create a geocoder for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpReverseGeocoderConfig::new(base_url))
    }

    /// Create a geocoder with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn with_config(config: HttpReverseGeocoderConfig) -> Result<Self, ProviderBuildError> {
        let raw = format!("{}/{REVERSE_PATH}", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|source| ProviderBuildError::BaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Resolve `coordinate` to a place name, collapsing every failure to
    /// `None`.
    ///
    /// Failures are logged at `warn` without the API key.
    pub async fn resolve(
        &self,
        coordinate: Coordinate,
        api_key: &ApiKey,
        language: &str,
    ) -> Option<PlaceName> {
        let query = GeocodeQuery::new(api_key.clone()).with_language(language);
        match self.reverse(coordinate, &query).await {
            Ok(place) => place,
            Err(err) => {
                warn!("reverse geocoding failed: {err}");
                None
            }
        }
    }

    /// Build the request URL carrying all six query parameters.
    pub(crate) fn build_request_url(&self, coordinate: Coordinate, query: &GeocodeQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("lat", &coordinate.latitude().to_string())
            .append_pair("lon", &coordinate.longitude().to_string())
            .append_pair("apiKey", query.api_key.expose())
            .append_pair("limit", "1")
            .append_pair("lang", &query.language)
            .append_pair("format", "geojson");
        url
    }

    async fn fetch(&self, url: Url) -> Result<FeatureCollection, GeocodeError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err))?;

        response
            .json()
            .await
            .map_err(|err| GeocodeError::Parse {
                message: err.without_url().to_string(),
            })
    }

    /// Convert a reqwest error to a `GeocodeError`, dropping the request URL
    /// so the API key stays out of the message.
    fn convert_reqwest_error(&self, error: reqwest::Error) -> GeocodeError {
        let endpoint = self.endpoint.to_string();
        if error.is_timeout() {
            return GeocodeError::Timeout {
                endpoint,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return GeocodeError::Http {
                endpoint,
                status: status.as_u16(),
            };
        }
        GeocodeError::Network {
            endpoint,
            message: error.without_url().to_string(),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for HttpReverseGeocoder {
    async fn reverse(
        &self,
        coordinate: Coordinate,
        query: &GeocodeQuery,
    ) -> Result<Option<PlaceName>, GeocodeError> {
        let url = self.build_request_url(coordinate, query);
        let body = self.fetch(url).await?;
        Ok(body.place_name())
    }
}
