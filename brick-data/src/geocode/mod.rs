//! HTTP reverse geocoding against a Geoapify-compatible service.
//!
//! [`HttpReverseGeocoder`] implements [`brick_core::ReverseGeocoder`] and adds
//! an infallible [`HttpReverseGeocoder::resolve`] for callers that only need
//! "a place name or nothing".
//!
//! # Example
//!
//! ```no_run
//! use brick_core::{ApiKey, Coordinate};
//! use brick_data::geocode::{HttpReverseGeocoder, HttpReverseGeocoderConfig};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpReverseGeocoderConfig::default().with_timeout(Duration::from_secs(5));
//! let geocoder = HttpReverseGeocoder::with_config(config)?;
//!
//! let madison = Coordinate::new(43.0731, -89.4012)?;
//! let key = ApiKey::new("my-geoapify-key")?;
//! if let Some(city) = geocoder.resolve(madison, &key, "en").await {
//!     println!("You are in {city}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod geoapify;

pub use client::{DEFAULT_GEOAPIFY_BASE_URL, HttpReverseGeocoder, HttpReverseGeocoderConfig};
