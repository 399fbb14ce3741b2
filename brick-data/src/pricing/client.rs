//! HTTP client for BrickEconomy set valuations.

use std::time::Duration;

use brick_core::{ApiKey, ReferenceStore};
use log::{debug, warn};
use reqwest::{Client, header::ACCEPT};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::types::{SetResponse, SetValuation};
use crate::{DEFAULT_USER_AGENT, ProviderBuildError};

/// Production BrickEconomy API root.
pub const DEFAULT_PRICE_BASE_URL: &str = "https://www.brickeconomy.com/api/v1";

/// Currency requested when none is configured. Requests in this currency
/// carry no `currency` parameter.
pub const DEFAULT_CURRENCY: &str = "USD";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors returned by [`HttpPriceClient::fetch_set`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceLookupError {
    /// The request could not be delivered.
    #[error("network error contacting {endpoint}: {message}")]
    Network {
        /// Requested URL.
        endpoint: String,
        /// Transport error description.
        message: String,
    },
    /// The service did not answer in time.
    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        endpoint: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The service answered with a non-success status.
    #[error("request to {endpoint} failed with status {status}")]
    Http {
        /// Requested URL.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },
    /// The response body was not valid JSON of the expected shape.
    #[error("failed to parse price response: {message}")]
    Parse {
        /// Decoder error description.
        message: String,
    },
}

/// Configuration for [`HttpPriceClient`].
#[derive(Debug, Clone)]
pub struct HttpPriceClientConfig {
    /// API root (e.g. `"https://www.brickeconomy.com/api/v1"`).
    pub base_url: String,
    /// ISO 4217 currency code for returned values.
    pub currency: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpPriceClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PRICE_BASE_URL.to_owned(),
            currency: DEFAULT_CURRENCY.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpPriceClientConfig {
    /// Create a configuration targeting `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Request values in `currency`.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
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

/// Client for `GET {base}/set/{number}`.
///
/// The API key travels in the `x-apikey` header, never in the URL.
#[derive(Debug, Clone)]
pub struct HttpPriceClient {
    client: Client,
    config: HttpPriceClientConfig,
    base: Url,
    api_key: ApiKey,
}

impl HttpPriceClient {
    /// Create a client for the production service.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(api_key: ApiKey) -> Result<Self, ProviderBuildError> {
        Self::with_config(api_key, HttpPriceClientConfig::default())
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client fails
    /// to build.
    pub fn with_config(
        api_key: ApiKey,
        config: HttpPriceClientConfig,
    ) -> Result<Self, ProviderBuildError> {
        let invalid = |source| ProviderBuildError::BaseUrl {
            url: config.base_url.clone(),
            source,
        };
        let base = Url::parse(&config.base_url).map_err(invalid)?;
        if base.cannot_be_a_base() {
            return Err(invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        Ok(Self {
            client,
            config,
            base,
            api_key,
        })
    }

    /// Fetch the valuation of `set_number` (e.g. `"10236-1"`).
    ///
    /// Returns `Ok(None)` when the service answers without a `data` object.
    pub async fn fetch_set(
        &self,
        set_number: &str,
    ) -> Result<Option<SetValuation>, PriceLookupError> {
        let url = self.build_request_url(set_number);
        let endpoint = url.to_string();
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header("x-apikey", self.api_key.expose())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, &endpoint))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, &endpoint))?;

        let body: SetResponse = response
            .json()
            .await
            .map_err(|err| PriceLookupError::Parse {
                message: err.to_string(),
            })?;
        Ok(body.data)
    }

    pub(crate) fn build_request_url(&self, set_number: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("set").push(set_number);
        }
        if self.config.currency != DEFAULT_CURRENCY {
            url.query_pairs_mut()
                .append_pair("currency", &self.config.currency);
        }
        url
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, endpoint: &str) -> PriceLookupError {
        if error.is_timeout() {
            return PriceLookupError::Timeout {
                endpoint: endpoint.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return PriceLookupError::Http {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            };
        }
        PriceLookupError::Network {
            endpoint: endpoint.to_owned(),
            message: error.to_string(),
        }
    }
}

/// Outcome of [`refresh_prices`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRefresh {
    /// Valuation returned by the service, if any.
    pub valuation: Option<SetValuation>,
    /// Whether the reference store accepted the new prices.
    pub stored: bool,
}

/// Fetch the current valuation of `set_number` and write its new and used
/// values into `store`.
///
/// The store is left untouched when the service has no data for the set.
///
/// # Errors
///
/// Propagates the lookup failure; store write failures are reported through
/// [`PriceRefresh::stored`].
pub async fn refresh_prices<S>(
    store: &S,
    client: &HttpPriceClient,
    set_number: &str,
) -> Result<PriceRefresh, PriceLookupError>
where
    S: ReferenceStore + ?Sized,
{
    let Some(valuation) = client.fetch_set(set_number).await? else {
        debug!("price service has no data for {set_number}");
        return Ok(PriceRefresh {
            valuation: None,
            stored: false,
        });
    };
    let stored = store.update_prices(
        set_number,
        valuation.current_value_new,
        valuation.current_value_used,
    );
    if !stored {
        warn!("prices for {set_number} could not be stored");
    }
    Ok(PriceRefresh {
        valuation: Some(valuation),
        stored,
    })
}
