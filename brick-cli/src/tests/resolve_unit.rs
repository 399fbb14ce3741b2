//! The `resolve` command over stub geocoders.

use super::helpers::json_output;
use super::*;
use crate::resolve::{ResolveConfig, resolve_with};
use brick_core::{Coordinate, GeocodeError, test_support::StubGeocoder};
use rstest::{fixture, rstest};

#[fixture]
fn config() -> ResolveConfig {
    ResolveConfig {
        coordinate: Coordinate::new(43.0731, -89.4012).expect("valid coordinate"),
        api_key: "geo-secret".to_owned(),
        geocoder_base_url: "http://127.0.0.1:9".to_owned(),
        language: "en".to_owned(),
    }
}

#[rstest]
#[tokio::test]
async fn prints_the_resolved_city(config: ResolveConfig) {
    let mut buffer = Vec::new();

    resolve_with(config, StubGeocoder::with_place("Madison"), &mut buffer)
        .await
        .expect("resolve");

    let output = json_output(&buffer);
    assert_eq!(output["city"], "Madison");
    assert_eq!(output["resolved"], true);
    assert_eq!(output["latitude"], 43.0731);
}

#[rstest]
#[tokio::test]
async fn geocoder_failure_prints_the_sentinel(config: ResolveConfig) {
    let geocoder = StubGeocoder::with_error(GeocodeError::Http {
        endpoint: "http://127.0.0.1:9/v1/geocode/reverse".into(),
        status: 401,
    });
    let mut buffer = Vec::new();

    resolve_with(config, geocoder, &mut buffer)
        .await
        .expect("failures still print a result");

    let output = json_output(&buffer);
    assert_eq!(output["city"], brick_location::NO_CITY);
    assert_eq!(output["resolved"], false);
}

#[rstest]
#[tokio::test]
async fn blank_key_skips_the_geocoder(mut config: ResolveConfig) {
    config.api_key = "  ".to_owned();
    let mut buffer = Vec::new();

    resolve_with(config, StubGeocoder::with_place("Madison"), &mut buffer)
        .await
        .expect("resolve");

    assert_eq!(json_output(&buffer)["city"], "none");
}
