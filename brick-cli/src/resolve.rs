//! `resolve` command: name the city around a fixed coordinate.

use std::io::Write;

use async_trait::async_trait;
use brick_core::{
    Coordinate, LocationError, LocationSource, PLACEHOLDER_API_KEY, ReverseGeocoder,
    geocode::DEFAULT_LANGUAGE,
};
use brick_data::{
    HttpReverseGeocoder, HttpReverseGeocoderConfig, geocode::DEFAULT_GEOAPIFY_BASE_URL,
};
use brick_location::{LocationResolver, NO_CITY};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    ARG_GEOAPIFY_API_KEY, ARG_GEOCODER_BASE_URL, ARG_LANGUAGE, ARG_LAT, ARG_LON, CliError,
    ENV_LAT, ENV_LON, output::write_json,
};

/// Geocoding key baked in at build time.
pub(crate) const BUILD_GEOAPIFY_API_KEY: Option<&str> = option_env!("BRICK_GEOAPIFY_API_KEY");

/// Location source that always reports the same coordinate.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedLocationSource(pub(crate) Coordinate);

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError> {
        Ok(Some(self.0))
    }
}

/// CLI arguments for the `resolve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Resolve the city around a coordinate with the reverse \
                 geocoding service. Prints \"none\" as the city when the \
                 service has no answer.",
    about = "Resolve the city around a coordinate"
)]
#[ortho_config(prefix = "BRICK")]
pub(crate) struct ResolveArgs {
    /// Latitude in degrees.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude in degrees.
    #[arg(long = ARG_LON, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// API key for the reverse geocoding service.
    #[arg(long = ARG_GEOAPIFY_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) geoapify_api_key: Option<String>,
    /// Root URL of the reverse geocoding service.
    #[arg(long = ARG_GEOCODER_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) geocoder_base_url: Option<String>,
    /// Language of the returned place name.
    #[arg(long = ARG_LANGUAGE, value_name = "code")]
    #[serde(default)]
    pub(crate) language: Option<String>,
}

impl ResolveArgs {
    fn into_config(self) -> Result<ResolveConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ResolveConfig::try_from(merged)
    }
}

/// Resolved `resolve` configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolveConfig {
    pub(crate) coordinate: Coordinate,
    pub(crate) api_key: String,
    pub(crate) geocoder_base_url: String,
    pub(crate) language: String,
}

impl TryFrom<ResolveArgs> for ResolveConfig {
    type Error = CliError;

    fn try_from(args: ResolveArgs) -> Result<Self, Self::Error> {
        let lat = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_LAT,
            env: ENV_LAT,
        })?;
        let lon = args.lon.ok_or(CliError::MissingArgument {
            field: ARG_LON,
            env: ENV_LON,
        })?;
        let api_key = args
            .geoapify_api_key
            .or_else(|| BUILD_GEOAPIFY_API_KEY.map(str::to_owned))
            .unwrap_or_else(|| PLACEHOLDER_API_KEY.to_owned());
        Ok(Self {
            coordinate: Coordinate::new(lat, lon)?,
            api_key,
            geocoder_base_url: args
                .geocoder_base_url
                .unwrap_or_else(|| DEFAULT_GEOAPIFY_BASE_URL.to_owned()),
            language: args.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned()),
        })
    }
}

/// City resolved for one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ResolveOutcome {
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    pub(crate) city: String,
    pub(crate) resolved: bool,
}

pub(crate) async fn run_resolve(args: ResolveArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let geocoder =
        HttpReverseGeocoder::with_config(HttpReverseGeocoderConfig::new(&config.geocoder_base_url))
            .map_err(|source| CliError::BuildClient {
                service: "reverse geocoding",
                source,
            })?;
    resolve_with(config, geocoder, writer).await
}

pub(crate) async fn resolve_with<G: ReverseGeocoder>(
    config: ResolveConfig,
    geocoder: G,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    if config.api_key == PLACEHOLDER_API_KEY {
        warn!("no geocoding key configured; set --{ARG_GEOAPIFY_API_KEY}");
    }
    let resolver = LocationResolver::new(FixedLocationSource(config.coordinate), geocoder);
    resolver.initialize(&config.api_key);
    resolver.update_permission(true);
    let city = resolver
        .resolve_city_assuming_permission(&config.api_key, &config.language)
        .await;
    write_json(
        writer,
        &ResolveOutcome {
            latitude: config.coordinate.latitude(),
            longitude: config.coordinate.longitude(),
            resolved: city != NO_CITY,
            city,
        },
    )
}
