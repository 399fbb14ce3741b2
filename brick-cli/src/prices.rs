//! `prices` command: refresh one set's prices from the price service.

use std::io::Write;

use brick_core::ApiKey;
use brick_data::{
    HttpPriceClient, HttpPriceClientConfig, PriceRefresh,
    pricing::{DEFAULT_CURRENCY, DEFAULT_PRICE_BASE_URL},
    refresh_prices,
};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    ARG_BUNDLED, ARG_CURRENCY, ARG_DATABASE, ARG_MIN_SIZE, ARG_PRICE_API_KEY,
    ARG_PRICE_BASE_URL, ARG_SET_NUMBER, CliError, ENV_PRICE_API_KEY, ENV_SET_NUMBER,
    catalogue::{CatalogueConfig, open_catalogue},
    output::write_json,
};

/// Price key baked in at build time, used when no layer supplies one.
pub(crate) const BUILD_PRICE_API_KEY: Option<&str> = option_env!("BRICK_PRICE_API_KEY");

/// CLI arguments for the `prices` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the current valuation of a set and store its new \
                 and used values in the local catalogue. The store is left \
                 untouched when the service has no data for the set.",
    about = "Refresh a set's prices from the price service"
)]
#[ortho_config(prefix = "BRICK")]
pub(crate) struct PricesArgs {
    /// Primary set number, e.g. 75192-1.
    #[arg(value_name = ARG_SET_NUMBER)]
    #[serde(default)]
    pub(crate) set_number: Option<String>,
    /// API key for the price service.
    #[arg(long = ARG_PRICE_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) price_api_key: Option<String>,
    /// Root URL of the price service API.
    #[arg(long = ARG_PRICE_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) price_base_url: Option<String>,
    /// ISO currency code for the valuation.
    #[arg(long = ARG_CURRENCY, value_name = "code")]
    #[serde(default)]
    pub(crate) currency: Option<String>,
    /// Path to the bundled, read-only catalogue.
    #[arg(long = ARG_BUNDLED, value_name = "path")]
    #[serde(default)]
    pub(crate) bundled: Option<Utf8PathBuf>,
    /// Path of the writable catalogue copy.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Smallest size in bytes accepted as a complete copy.
    #[arg(long = ARG_MIN_SIZE, value_name = "bytes")]
    #[serde(default)]
    pub(crate) min_size: Option<u64>,
}

impl PricesArgs {
    fn into_config(self) -> Result<PricesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        PricesConfig::try_from(merged)
    }
}

/// Resolved `prices` configuration.
#[derive(Debug, Clone)]
pub(crate) struct PricesConfig {
    pub(crate) set_number: String,
    pub(crate) api_key: ApiKey,
    pub(crate) client: HttpPriceClientConfig,
    pub(crate) catalogue: CatalogueConfig,
}

impl TryFrom<PricesArgs> for PricesConfig {
    type Error = CliError;

    fn try_from(args: PricesArgs) -> Result<Self, Self::Error> {
        let set_number = args.set_number.ok_or(CliError::MissingArgument {
            field: ARG_SET_NUMBER,
            env: ENV_SET_NUMBER,
        })?;
        let raw_key = args
            .price_api_key
            .or_else(|| BUILD_PRICE_API_KEY.map(str::to_owned))
            .ok_or(CliError::MissingArgument {
                field: ARG_PRICE_API_KEY,
                env: ENV_PRICE_API_KEY,
            })?;
        let api_key = ApiKey::new(raw_key).map_err(|source| CliError::InvalidApiKey {
            field: ARG_PRICE_API_KEY,
            source,
        })?;

        let base_url = args
            .price_base_url
            .unwrap_or_else(|| DEFAULT_PRICE_BASE_URL.to_owned());
        let currency = args
            .currency
            .map_or_else(|| DEFAULT_CURRENCY.to_owned(), |code| code.to_ascii_uppercase());
        let client = HttpPriceClientConfig::new(base_url).with_currency(currency);

        Ok(Self {
            set_number,
            api_key,
            client,
            catalogue: CatalogueConfig::from_layers(args.bundled, args.database, args.min_size),
        })
    }
}

pub(crate) async fn run_prices(args: PricesArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    prices_with(args.into_config()?, writer).await
}

pub(crate) async fn prices_with(
    config: PricesConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let client = HttpPriceClient::with_config(config.api_key, config.client).map_err(|source| {
        CliError::BuildClient {
            service: "price",
            source,
        }
    })?;
    let (store, _) = open_catalogue(config.catalogue).await?;
    let refresh: PriceRefresh = refresh_prices(&store, &client, &config.set_number).await?;
    info!(set = %config.set_number, stored = refresh.stored, "price refresh finished");
    write_json(writer, &refresh)
}
