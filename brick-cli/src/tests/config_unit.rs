//! Configuration merging and validation for every subcommand.

use super::*;
use crate::{
    catalogue::{
        CatalogueConfig, DEFAULT_BUNDLED_PATH, DEFAULT_DATABASE_PATH, LookupConfig, SearchConfig,
        lookup_config_from_layers,
    },
    prices::{BUILD_PRICE_API_KEY, PricesConfig},
    resolve::{BUILD_GEOAPIFY_API_KEY, ResolveConfig},
    scan::{DEFAULT_DEBOUNCE, ScanConfig},
};
use brick_core::{ApiKeyError, DEFAULT_MIN_PLAUSIBLE_SIZE, PLACEHOLDER_API_KEY};
use camino::Utf8PathBuf;
use ortho_config::MergeComposer;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

fn expect_missing(err: CliError, expected_field: &str, expected_env: &str) {
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, expected_field);
            assert_eq!(env, expected_env);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn catalogue_defaults_to_the_bundled_layout() {
    let config = CatalogueConfig::from_layers(None, None, None);

    assert_eq!(config.bundled, Utf8PathBuf::from(DEFAULT_BUNDLED_PATH));
    assert_eq!(config.database, Utf8PathBuf::from(DEFAULT_DATABASE_PATH));
    assert_eq!(config.min_size, DEFAULT_MIN_PLAUSIBLE_SIZE);
}

#[rstest]
fn lookup_without_code_errors() {
    let err = LookupConfig::try_from(catalogue::LookupArgs::default())
        .expect_err("missing code should error");
    expect_missing(err, ARG_CODE, ENV_CODE);
}

#[rstest]
fn search_without_pattern_errors() {
    let err = SearchConfig::try_from(catalogue::SearchArgs::default())
        .expect_err("missing pattern should error");
    expect_missing(err, ARG_PATTERN, ENV_PATTERN);
}

#[rstest]
fn lookup_layers_honour_precedence() {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "code": "from-file",
            "database": "file/lego_sets.db",
            "min_size": 2048,
        }),
        None,
    );
    composer.push_environment(json!({
        "code": "from-env",
        "database": "env/lego_sets.db",
    }));
    composer.push_cli(json!({ "code": "673419266192" }));

    let config = lookup_config_from_layers(composer.layers()).expect("merged config");

    assert_eq!(config.code, "673419266192");
    assert_eq!(config.catalogue.database, Utf8PathBuf::from("env/lego_sets.db"));
    assert_eq!(config.catalogue.bundled, Utf8PathBuf::from(DEFAULT_BUNDLED_PATH));
    assert_eq!(config.catalogue.min_size, 2048);
}

#[rstest]
fn invalid_layer_maps_to_configuration_error() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "min_size": "large" }));

    let err = lookup_config_from_layers(composer.layers())
        .expect_err("invalid config layer should error");
    assert!(matches!(err, CliError::Configuration(_)), "unexpected {err:?}");
}

#[rstest]
fn prices_without_set_number_errors() {
    let err = PricesConfig::try_from(prices::PricesArgs {
        price_api_key: Some("key".into()),
        ..prices::PricesArgs::default()
    })
    .expect_err("missing set number should error");
    expect_missing(err, ARG_SET_NUMBER, ENV_SET_NUMBER);
}

#[rstest]
fn prices_without_any_key_errors() {
    if BUILD_PRICE_API_KEY.is_some() {
        return;
    }
    let err = PricesConfig::try_from(prices::PricesArgs {
        set_number: Some("75192-1".into()),
        ..prices::PricesArgs::default()
    })
    .expect_err("missing key should error");
    expect_missing(err, ARG_PRICE_API_KEY, ENV_PRICE_API_KEY);
}

#[rstest]
fn prices_reject_blank_key() {
    let err = PricesConfig::try_from(prices::PricesArgs {
        set_number: Some("75192-1".into()),
        price_api_key: Some("   ".into()),
        ..prices::PricesArgs::default()
    })
    .expect_err("blank key should error");
    match err {
        CliError::InvalidApiKey { field, source } => {
            assert_eq!(field, ARG_PRICE_API_KEY);
            assert_eq!(source, ApiKeyError::Blank);
        }
        other => panic!("expected InvalidApiKey, found {other:?}"),
    }
}

#[rstest]
#[case::default_currency(None, "USD")]
#[case::lowercase_currency(Some("eur"), "EUR")]
fn prices_normalise_currency(#[case] currency: Option<&str>, #[case] expected: &str) {
    let config = PricesConfig::try_from(prices::PricesArgs {
        set_number: Some("75192-1".into()),
        price_api_key: Some("key".into()),
        currency: currency.map(str::to_owned),
        price_base_url: Some("http://127.0.0.1:9/api/v1".into()),
        ..prices::PricesArgs::default()
    })
    .expect("config should build");

    assert_eq!(config.client.currency, expected);
    assert_eq!(config.client.base_url, "http://127.0.0.1:9/api/v1");
    assert_eq!(config.api_key.expose(), "key");
}

#[rstest]
#[case::missing_lat(None, Some(-89.4), ARG_LAT, ENV_LAT)]
#[case::missing_lon(Some(43.07), None, ARG_LON, ENV_LON)]
fn resolve_requires_both_axes(
    #[case] lat: Option<f64>,
    #[case] lon: Option<f64>,
    #[case] field: &str,
    #[case] env: &str,
) {
    let err = ResolveConfig::try_from(resolve::ResolveArgs {
        lat,
        lon,
        ..resolve::ResolveArgs::default()
    })
    .expect_err("missing axis should error");
    expect_missing(err, field, env);
}

#[rstest]
fn resolve_rejects_out_of_range_coordinates() {
    let err = ResolveConfig::try_from(resolve::ResolveArgs {
        lat: Some(91.0),
        lon: Some(0.0),
        ..resolve::ResolveArgs::default()
    })
    .expect_err("latitude above 90 should error");
    assert!(matches!(err, CliError::InvalidCoordinate(_)), "unexpected {err:?}");
}

#[rstest]
fn resolve_falls_back_to_the_placeholder_key() {
    let config = ResolveConfig::try_from(resolve::ResolveArgs {
        lat: Some(43.0731),
        lon: Some(-89.4012),
        ..resolve::ResolveArgs::default()
    })
    .expect("config should build");

    let expected = BUILD_GEOAPIFY_API_KEY.unwrap_or(PLACEHOLDER_API_KEY);
    assert_eq!(config.api_key, expected);
    assert_eq!(config.language, "en");
    assert_eq!(config.geocoder_base_url, "https://api.geoapify.com");
}

#[rstest]
#[case::default_window(None, DEFAULT_DEBOUNCE)]
#[case::explicit_window(Some(250), Duration::from_millis(250))]
fn scan_debounce_window(#[case] debounce_ms: Option<u64>, #[case] expected: Duration) {
    let config = ScanConfig::from(scan::ScanArgs {
        debounce_ms,
        ..scan::ScanArgs::default()
    });
    assert_eq!(config.debounce, expected);
}

#[rstest]
#[case(0, true, Level::ERROR)]
#[case(0, false, Level::WARN)]
#[case(1, false, Level::INFO)]
#[case(2, false, Level::DEBUG)]
#[case(5, false, Level::TRACE)]
fn verbosity_maps_to_levels(#[case] verbose: u8, #[case] quiet: bool, #[case] expected: Level) {
    assert_eq!(verbosity_level(verbose, quiet), expected);
}

#[rstest]
fn cli_parses_nested_subcommand_flags() {
    let cli = Cli::try_parse_from(["brick", "-vv", "resolve", "--lat", "43.07", "--lon", "-89.4"])
        .expect("arguments should parse");

    assert_eq!(cli.verbose, 2);
    match cli.command {
        Command::Resolve(args) => {
            assert_eq!(args.lat, Some(43.07));
            assert_eq!(args.lon, Some(-89.4));
        }
        other => panic!("expected resolve, found {other:?}"),
    }
}
